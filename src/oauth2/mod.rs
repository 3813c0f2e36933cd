//! OAuth2 authorization-code-flow middleware
//!
//! One generic engine drives the whole flow; Google, GitHub, and
//! Facebook are [`Provider`] parameterizations of it (endpoints, scope
//! delimiter, profile shape). Install the middleware on both the login
//! route and the callback route:
//!
//! - a request whose path does not match the configured redirect URL's
//!   path is a *login-initiation* request and is answered with a 302 to
//!   the provider's authorization endpoint;
//! - a request matching that path is a *callback*: the middleware
//!   exchanges the `code` for tokens, fetches the user's profile, and
//!   attaches a [`FlowResult`] to the request extensions — on success
//!   and on failure alike — before handing the request to the inner
//!   service. Downstream handlers read it with `web::ReqData<T>` and
//!   must check `errors` before trusting token or profile fields.
//!
//! ```rust,ignore
//! use actix_web::{web, App, HttpResponse};
//! use doorman::{Google, GoogleResult, OAuth2, OAuth2Options};
//!
//! let google = OAuth2::<Google>::new(OAuth2Options {
//!     client_id: "oauth_id".into(),
//!     client_secret: "oauth_secret".into(),
//!     redirect_url: Some("http://host:port/auth/callback/google".into()),
//!     scopes: vec!["email".into(), "profile".into()],
//!     ..OAuth2Options::default()
//! })?;
//!
//! App::new().service(
//!     web::scope("/auth")
//!         .wrap(google)
//!         .route("/callback/google", web::get().to(
//!             |result: web::ReqData<GoogleResult>| async move {
//!                 if !result.is_ok() {
//!                     return HttpResponse::InternalServerError().body("OAuth failure");
//!                 }
//!                 HttpResponse::Ok().body(format!("hello {}", result.profile.email))
//!             },
//!         )),
//! );
//! ```
//!
//! Security note: the `state` authorization parameter is always sent
//! empty and is never validated on the callback, so this middleware on
//! its own does not protect the flow against login CSRF. Applications
//! that need that protection must carry and verify their own state
//! (e.g. in a session cookie) around the flow.

pub mod config;
pub mod flow;
pub mod providers;

pub use config::{redirect_relative, ConfigError, OAuth2Options, RedirectFn};
pub use flow::{FlowError, FlowResult};
pub use providers::{
    Endpoints, Facebook, FacebookProfile, FacebookResult, Github, GithubProfile, GithubResult,
    Google, GoogleProfile, GoogleResult, Provider,
};

use std::marker::PhantomData;
use std::rc::Rc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, Method};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpResponse};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use log::{debug, info};
use serde::Deserialize;

use config::OAuth2Config;

/// Authorization-code-flow middleware for provider `P`.
///
/// Constructed once per installation; the configuration and the HTTP
/// client are shared read-only across all requests it handles.
pub struct OAuth2<P: Provider> {
    inner: Rc<Inner>,
    _provider: PhantomData<P>,
}

struct Inner {
    config: OAuth2Config,
    client: reqwest::Client,
}

impl<P: Provider> OAuth2<P> {
    /// Validate `options` and build the middleware.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if no redirect target is configured or
    /// if a static redirect URL or endpoint override does not parse.
    pub fn new(options: OAuth2Options) -> Result<Self, ConfigError> {
        let config = OAuth2Config::from_options::<P>(options)?;
        Ok(Self {
            inner: Rc::new(Inner {
                config,
                client: reqwest::Client::new(),
            }),
            _provider: PhantomData,
        })
    }
}

impl<P: Provider> Clone for OAuth2<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            _provider: PhantomData,
        }
    }
}

impl<S, B, P> Transform<S, ServiceRequest> for OAuth2<P>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
    P: Provider,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = OAuth2Middleware<S, P>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OAuth2Middleware {
            service: Rc::new(service),
            inner: Rc::clone(&self.inner),
            _provider: PhantomData,
        }))
    }
}

pub struct OAuth2Middleware<S, P> {
    service: Rc<S>,
    inner: Rc<Inner>,
    _provider: PhantomData<P>,
}

impl<S, B, P> Service<ServiceRequest> for OAuth2Middleware<S, P>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
    P: Provider,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let inner = Rc::clone(&self.inner);

        Box::pin(async move {
            let redirect = inner.config.resolve_redirect(req.request());

            if redirect.path.as_deref() != Some(req.path()) {
                let location = inner.config.authorize_url(&redirect.url);
                debug!(
                    "{}: login request on {}, redirecting to provider",
                    P::NAME,
                    req.path()
                );
                let response = HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .finish();
                return Ok(req.into_response(response).map_into_right_body());
            }

            let code = callback_code(&mut req).await;
            let result =
                flow::run_callback::<P>(&inner.client, &inner.config, &redirect.url, code).await;
            if result.is_ok() {
                info!("{} authentication callback succeeded", P::NAME);
            }
            // Attached on every callback path, errors included
            req.extensions_mut().insert(result);

            service
                .call(req)
                .await
                .map(|res| res.map_into_left_body())
        })
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

/// Pull the authorization code from the callback query string, falling
/// back to a POSTed form body.
async fn callback_code(req: &mut ServiceRequest) -> Option<String> {
    if let Ok(query) = web::Query::<CallbackParams>::from_query(req.query_string()) {
        if query.code.is_some() {
            return query.into_inner().code;
        }
    }

    if req.method() == Method::POST {
        let (http_req, payload) = req.parts_mut();
        if let Ok(form) = web::Form::<CallbackParams>::from_request(http_req, payload).await {
            return form.into_inner().code;
        }
    }

    None
}
