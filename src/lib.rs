#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Pluggable authentication middleware for actix-web.
//!
//! Three schemes, each installed with `.wrap(...)` and each attaching a
//! typed result to the request extensions for the downstream handler to
//! consume via `web::ReqData<T>`:
//!
//! - [`BasicAuth`] — decodes `Authorization: Basic` into
//!   [`BasicCredentials`], or answers `401` with a challenge and stops
//!   the chain.
//! - [`LocalAuth`] — reads configurable form fields into
//!   [`LocalCredentials`] (values plus validation errors) and always
//!   continues the chain.
//! - [`OAuth2`] — a generic OAuth2 authorization-code flow,
//!   parameterized by a [`Provider`] ([`Google`], [`Github`],
//!   [`Facebook`]). Login requests are redirected to the provider;
//!   callback requests are exchanged for tokens and a profile, and a
//!   [`FlowResult`] is attached whether the flow succeeded or not.
//!
//! See the [`oauth2`] module docs for the full flow, a usage example,
//! and the security note on the empty `state` parameter.

pub mod basic;
pub mod local;
pub mod oauth2;

pub use basic::{BasicAuth, BasicCredentials};
pub use local::{CredentialError, LocalAuth, LocalAuthConfig, LocalCredentials};
pub use oauth2::{
    redirect_relative, ConfigError, Facebook, FacebookProfile, FacebookResult, FlowError,
    FlowResult, Github, GithubProfile, GithubResult, Google, GoogleProfile, GoogleResult, OAuth2,
    OAuth2Options, Provider, RedirectFn,
};

/// Version of the doorman crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
