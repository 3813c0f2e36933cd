//! HTTP Basic authentication middleware
//!
//! Parses the `Authorization: Basic` header and attaches
//! [`BasicCredentials`] to the request extensions for the downstream
//! handler to verify. A missing or malformed header terminates the
//! chain with `401 Unauthorized` and a `WWW-Authenticate` challenge;
//! the inner service is never invoked for such requests.
//!
//! Credentials are split on the first `:` only, so passwords containing
//! colons are preserved intact (RFC 7617).

use std::rc::Rc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use log::debug;

/// Username and password decoded from the `Authorization` header.
///
/// Ephemeral per-request data; owned by the request that produced it.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Basic authentication middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuth;

impl BasicAuth {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for BasicAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = BasicAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BasicAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct BasicAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for BasicAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        match parse_credentials(&req) {
            Some(credentials) => {
                req.extensions_mut().insert(credentials);
                Box::pin(async move {
                    service.call(req).await.map(|res| res.map_into_left_body())
                })
            }
            None => {
                debug!("basic auth credentials missing or malformed, responding 401");
                Box::pin(async move { Ok(unauthorized(req)) })
            }
        }
    }
}

fn parse_credentials(req: &ServiceRequest) -> Option<BasicCredentials> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Challenge response prompting the client for Basic credentials.
fn unauthorized<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::Unauthorized()
        .insert_header((
            header::WWW_AUTHENTICATE,
            "Basic realm=\"Authorization Required\"",
        ))
        .body("Not Authorized");
    req.into_response(response).map_into_right_body()
}
