//! OAuth2 flow configuration
//!
//! [`OAuth2Options`] is what callers fill in; [`OAuth2Config`] is the
//! validated, per-installation form the middleware actually runs with.
//! The redirect target is either a fixed URL or a per-request function;
//! the function wins when both are set.

use std::sync::Arc;

use actix_web::HttpRequest;
use thiserror::Error;
use url::Url;

use super::providers::Provider;

/// Computes the effective redirect URL from the incoming request.
///
/// Invoked exactly once per request; it must be free of side effects on
/// the request and yield the same URL for the same request.
pub type RedirectFn = Arc<dyn Fn(&HttpRequest) -> String + Send + Sync>;

/// Configuration errors surfaced when installing an OAuth2 middleware.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The static redirect URL could not be parsed as an absolute URL.
    #[error("redirect URL {url:?} is not a valid absolute URL: {reason}")]
    InvalidRedirectUrl { url: String, reason: String },
    /// Neither a redirect URL nor a redirect function was configured.
    #[error("no redirect URL or redirect function configured")]
    MissingRedirect,
    /// The authorization endpoint could not be parsed.
    #[error("authorization endpoint {url:?} is not a valid URL: {reason}")]
    InvalidAuthUrl { url: String, reason: String },
}

/// User-facing options for one OAuth2 middleware installation.
///
/// `client_id`, `client_secret`, a redirect target, and `scopes` are the
/// fields applications normally set. The endpoint overrides exist for
/// tests and self-hosted deployments; left as `None` they fall back to
/// the provider's fixed endpoints.
#[derive(Clone, Default)]
pub struct OAuth2Options {
    pub client_id: String,
    pub client_secret: String,
    /// Fixed redirect URL registered with the provider.
    pub redirect_url: Option<String>,
    /// Per-request redirect computation; takes precedence over
    /// `redirect_url` when both are set.
    pub redirect_fn: Option<RedirectFn>,
    /// Requested scopes, joined with the provider's delimiter.
    pub scopes: Vec<String>,
    /// Optional `access_type` authorization parameter (e.g. "offline").
    pub access_type: Option<String>,
    /// Optional `approval_prompt` authorization parameter (e.g. "force").
    pub approval_prompt: Option<String>,
    /// Override for the provider's authorization endpoint.
    pub auth_url: Option<String>,
    /// Override for the provider's token endpoint.
    pub token_url: Option<String>,
    /// Override for the provider's profile endpoint.
    pub profile_url: Option<String>,
}

/// Redirect target resolved for one request.
pub(crate) struct ResolvedRedirect {
    pub url: String,
    /// Path component used for the callback comparison. `None` when a
    /// redirect function produced an unparsable URL; such a request is
    /// treated as login-initiation, never as a callback.
    pub path: Option<String>,
}

pub(crate) enum RedirectRule {
    Static { url: String, path: String },
    PerRequest(RedirectFn),
}

/// Immutable per-installation configuration, shared read-only across
/// every request the middleware handles.
pub(crate) struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect: RedirectRule,
    pub scope: String,
    pub auth_url: Url,
    pub token_url: String,
    pub profile_url: String,
    pub access_type: Option<String>,
    pub approval_prompt: Option<String>,
}

impl OAuth2Config {
    /// Validate options against provider `P` and resolve endpoints.
    pub fn from_options<P: Provider>(options: OAuth2Options) -> Result<Self, ConfigError> {
        let endpoints = P::endpoints();

        let auth_url_raw = options
            .auth_url
            .unwrap_or_else(|| endpoints.auth_url.to_string());
        let auth_url = Url::parse(&auth_url_raw).map_err(|err| ConfigError::InvalidAuthUrl {
            url: auth_url_raw.clone(),
            reason: err.to_string(),
        })?;

        let redirect = match (options.redirect_fn, options.redirect_url) {
            (Some(redirect_fn), _) => RedirectRule::PerRequest(redirect_fn),
            (None, Some(url)) => {
                let parsed =
                    Url::parse(&url).map_err(|err| ConfigError::InvalidRedirectUrl {
                        url: url.clone(),
                        reason: err.to_string(),
                    })?;
                RedirectRule::Static {
                    path: parsed.path().to_string(),
                    url,
                }
            }
            (None, None) => return Err(ConfigError::MissingRedirect),
        };

        Ok(Self {
            client_id: options.client_id,
            client_secret: options.client_secret,
            redirect,
            scope: options.scopes.join(P::SCOPE_DELIMITER),
            auth_url,
            token_url: options
                .token_url
                .unwrap_or_else(|| endpoints.token_url.to_string()),
            profile_url: options
                .profile_url
                .unwrap_or_else(|| endpoints.profile_url.to_string()),
            access_type: options.access_type,
            approval_prompt: options.approval_prompt,
        })
    }

    /// Resolve the effective redirect target for one request.
    pub fn resolve_redirect(&self, req: &HttpRequest) -> ResolvedRedirect {
        match &self.redirect {
            RedirectRule::Static { url, path } => ResolvedRedirect {
                url: url.clone(),
                path: Some(path.clone()),
            },
            RedirectRule::PerRequest(redirect_fn) => {
                let url = redirect_fn(req);
                match Url::parse(&url) {
                    Ok(parsed) => ResolvedRedirect {
                        path: Some(parsed.path().to_string()),
                        url,
                    },
                    Err(err) => {
                        log::error!("redirect function produced unparsable URL {url:?}: {err}");
                        ResolvedRedirect { url, path: None }
                    }
                }
            }
        }
    }

    /// Build the provider authorization URL for a login-initiation
    /// request. The `state` parameter is always present and always
    /// empty; see the module docs for the security implications.
    pub fn authorize_url(&self, redirect_url: &str) -> String {
        let mut url = self.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", redirect_url)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scope)
                .append_pair("state", "");
            if let Some(access_type) = &self.access_type {
                pairs.append_pair("access_type", access_type);
            }
            if let Some(approval_prompt) = &self.approval_prompt {
                pairs.append_pair("approval_prompt", approval_prompt);
            }
        }
        url.to_string()
    }
}

/// Build a redirect function from a path relative to the incoming
/// request's scheme and host.
///
/// Useful when the absolute callback URL is not known at configuration
/// time. Scheme and host come from actix's connection info, which
/// honors `X-Forwarded-Proto` and `X-Forwarded-Host` from a reverse
/// proxy, so a TLS-terminating proxy yields `https` callback URLs.
#[must_use]
pub fn redirect_relative(path: &str) -> RedirectFn {
    let path = path.to_string();
    Arc::new(move |req: &HttpRequest| {
        let info = req.connection_info();
        format!("{}://{}{}", info.scheme(), info.host(), path)
    })
}
