//! Token exchange and profile fetch
//!
//! The callback half of the authorization-code flow: exchange the code
//! for tokens, then fetch the user's profile with the fresh access
//! token. Each step either succeeds and advances or records exactly one
//! error and stops; the partially populated [`FlowResult`] is returned
//! on every path so the middleware can always attach it.

use std::fmt;

use log::{debug, warn};
use reqwest::header;
use serde::Deserialize;
use thiserror::Error;

use super::config::OAuth2Config;
use super::providers::Provider;

/// Errors recorded while driving one callback request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    /// The callback request carried no `code` parameter.
    #[error("callback request carried no authorization code")]
    MissingCode,
    /// The token-endpoint request failed at the transport level.
    #[error("token endpoint request failed: {0}")]
    TokenRequest(String),
    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {status}: {body}")]
    TokenStatus { status: u16, body: String },
    /// The token response body could not be decoded.
    #[error("failed to decode token response: {0}")]
    TokenDecode(String),
    /// The profile request failed at the transport level.
    #[error("profile request failed: {0}")]
    ProfileRequest(String),
    /// The profile endpoint answered with a non-success status.
    #[error("profile endpoint returned status {0}")]
    ProfileStatus(u16),
    /// The profile response body could not be read.
    #[error("failed to read profile response: {0}")]
    ProfileRead(String),
    /// The profile response body could not be decoded.
    #[error("failed to decode profile: {0}")]
    ProfileDecode(String),
}

/// Outcome of one callback request for provider `P`.
///
/// When `errors` is non-empty the token and profile fields are not
/// reliable and must be ignored by downstream handlers. The result is
/// created fresh per callback, attached to the request extensions
/// exactly once, and does not outlive the request.
pub struct FlowResult<P: Provider> {
    pub access_token: String,
    /// Empty when the provider does not issue refresh tokens.
    pub refresh_token: String,
    pub profile: P::Profile,
    pub errors: Vec<FlowError>,
}

impl<P: Provider> FlowResult<P> {
    /// Whether the flow completed without recording any error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<P: Provider> Default for FlowResult<P> {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            profile: P::Profile::default(),
            errors: Vec::new(),
        }
    }
}

impl<P: Provider> Clone for FlowResult<P> {
    fn clone(&self) -> Self {
        Self {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            profile: self.profile.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<P: Provider> fmt::Debug for FlowResult<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowResult")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("profile", &self.profile)
            .field("errors", &self.errors)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Drive the callback sequence: token exchange, then profile fetch.
///
/// Exactly one token-endpoint call is made, and at most one
/// profile-endpoint call; a token-exchange failure short-circuits the
/// profile fetch.
pub(crate) async fn run_callback<P: Provider>(
    client: &reqwest::Client,
    config: &OAuth2Config,
    redirect_url: &str,
    code: Option<String>,
) -> FlowResult<P> {
    let mut result = FlowResult::default();

    let Some(code) = code else {
        warn!("{} callback carried no authorization code", P::NAME);
        result.errors.push(FlowError::MissingCode);
        return result;
    };

    match exchange_code(client, config, redirect_url, &code).await {
        Ok(token) => {
            result.access_token = token.access_token;
            result.refresh_token = token.refresh_token.unwrap_or_default();
        }
        Err(err) => {
            warn!("{} token exchange failed: {err}", P::NAME);
            result.errors.push(err);
            return result;
        }
    }

    match fetch_profile::<P>(client, config, &result.access_token).await {
        Ok(profile) => result.profile = profile,
        Err(err) => {
            warn!("{} profile fetch failed: {err}", P::NAME);
            result.errors.push(err);
        }
    }

    result
}

async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuth2Config,
    redirect_url: &str,
    code: &str,
) -> Result<TokenResponse, FlowError> {
    debug!("exchanging authorization code at {}", config.token_url);

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_url),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    // GitHub answers with form-encoded data unless JSON is requested
    let response = client
        .post(&config.token_url)
        .header(header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|err| FlowError::TokenRequest(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(FlowError::TokenStatus {
            status: status.as_u16(),
            body,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|err| FlowError::TokenRequest(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| FlowError::TokenDecode(err.to_string()))
}

async fn fetch_profile<P: Provider>(
    client: &reqwest::Client,
    config: &OAuth2Config,
    access_token: &str,
) -> Result<P::Profile, FlowError> {
    debug!("fetching {} profile from {}", P::NAME, config.profile_url);

    let response = client
        .get(&config.profile_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|err| FlowError::ProfileRequest(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FlowError::ProfileStatus(status.as_u16()));
    }

    let data = response
        .bytes()
        .await
        .map_err(|err| FlowError::ProfileRead(err.to_string()))?;
    P::decode_profile(&data)
}
