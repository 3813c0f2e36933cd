//! Local form authentication middleware
//!
//! Reads a username and password from a submitted form and attaches
//! [`LocalCredentials`] to the request extensions. Unlike Basic auth
//! this middleware never short-circuits: missing or empty fields are
//! recorded as errors on the attached record and the chain continues,
//! leaving the accept/reject decision to the downstream handler.

use std::collections::HashMap;
use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use log::debug;
use thiserror::Error;

/// Which form fields carry the username and password.
#[derive(Debug, Clone)]
pub struct LocalAuthConfig {
    pub username_field: String,
    pub password_field: String,
}

impl Default for LocalAuthConfig {
    fn default() -> Self {
        Self {
            username_field: "username".to_string(),
            password_field: "password".to_string(),
        }
    }
}

/// Validation errors recorded on [`LocalCredentials`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("username field not found or empty")]
    MissingUsername,
    #[error("password field not found or empty")]
    MissingPassword,
}

/// Form credentials plus any validation errors, attached on every
/// request this middleware handles.
#[derive(Debug, Clone, Default)]
pub struct LocalCredentials {
    pub username: String,
    pub password: String,
    pub errors: Vec<CredentialError>,
}

impl LocalCredentials {
    /// Whether both fields were present and non-empty.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Local form authentication middleware.
#[derive(Debug, Clone, Default)]
pub struct LocalAuth {
    config: Rc<LocalAuthConfig>,
}

impl LocalAuth {
    #[must_use]
    pub fn new(config: LocalAuthConfig) -> Self {
        Self {
            config: Rc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LocalAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LocalAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LocalAuthMiddleware {
            service: Rc::new(service),
            config: Rc::clone(&self.config),
        }))
    }
}

pub struct LocalAuthMiddleware<S> {
    service: Rc<S>,
    config: Rc<LocalAuthConfig>,
}

impl<S, B> Service<ServiceRequest> for LocalAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let config = Rc::clone(&self.config);

        Box::pin(async move {
            let fields = read_form_fields(&mut req).await;
            let mut credentials = LocalCredentials::default();

            match fields.get(&config.username_field) {
                Some(value) if !value.is_empty() => credentials.username = value.clone(),
                _ => credentials.errors.push(CredentialError::MissingUsername),
            }
            match fields.get(&config.password_field) {
                Some(value) if !value.is_empty() => credentials.password = value.clone(),
                _ => credentials.errors.push(CredentialError::MissingPassword),
            }

            req.extensions_mut().insert(credentials);
            service.call(req).await
        })
    }
}

async fn read_form_fields(req: &mut ServiceRequest) -> HashMap<String, String> {
    let (http_req, payload) = req.parts_mut();
    match web::Form::<HashMap<String, String>>::from_request(http_req, payload).await {
        Ok(form) => form.into_inner(),
        Err(err) => {
            debug!("failed to read login form: {err}");
            HashMap::new()
        }
    }
}
