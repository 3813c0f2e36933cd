//! Provider parameterizations for the authorization-code flow
//!
//! Each provider is a unit type carrying its endpoints, scope delimiter,
//! and profile shape. The flow engine in this module's parent is generic
//! over [`Provider`], so adding a provider means adding a configuration
//! value and a profile record, not another code path.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::flow::{FlowError, FlowResult};

/// Fixed endpoint URLs for one identity provider.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub profile_url: &'static str,
}

/// Compile-time description of an OAuth2 identity provider.
///
/// Implementations supply the provider's endpoints, the delimiter used
/// when joining requested scopes, and the shape of the JSON profile
/// served by the provider's user-info endpoint. Profile decoding
/// defaults to `serde_json` and only needs overriding for providers
/// that do not serve plain JSON.
pub trait Provider: 'static {
    /// Identity record deserialized from the provider's profile response.
    type Profile: DeserializeOwned + Default + Clone + std::fmt::Debug;

    /// Provider name used in log output.
    const NAME: &'static str;

    /// Delimiter used to join the configured scopes into one string.
    const SCOPE_DELIMITER: &'static str = " ";

    /// Default endpoints for this provider.
    fn endpoints() -> Endpoints;

    /// Decode a profile record from the raw profile response body.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ProfileDecode` if the body is not a valid
    /// profile document.
    fn decode_profile(data: &[u8]) -> Result<Self::Profile, FlowError> {
        serde_json::from_slice(data).map_err(|err| FlowError::ProfileDecode(err.to_string()))
    }
}

/// Google OAuth2 provider.
#[derive(Debug, Clone, Copy)]
pub struct Google;

/// GitHub OAuth2 provider.
#[derive(Debug, Clone, Copy)]
pub struct Github;

/// Facebook OAuth2 provider.
#[derive(Debug, Clone, Copy)]
pub struct Facebook;

impl Provider for Google {
    type Profile = GoogleProfile;

    const NAME: &'static str = "google";

    fn endpoints() -> Endpoints {
        Endpoints {
            auth_url: "https://accounts.google.com/o/oauth2/auth",
            token_url: "https://accounts.google.com/o/oauth2/token",
            profile_url: "https://www.googleapis.com/oauth2/v1/userinfo",
        }
    }
}

impl Provider for Github {
    type Profile = GithubProfile;

    const NAME: &'static str = "github";
    // GitHub expects comma-separated scopes
    const SCOPE_DELIMITER: &'static str = ",";

    fn endpoints() -> Endpoints {
        Endpoints {
            auth_url: "https://github.com/login/oauth/authorize",
            token_url: "https://github.com/login/oauth/access_token",
            profile_url: "https://api.github.com/user",
        }
    }
}

impl Provider for Facebook {
    type Profile = FacebookProfile;

    const NAME: &'static str = "facebook";

    fn endpoints() -> Endpoints {
        Endpoints {
            auth_url: "https://www.facebook.com/dialog/oauth",
            token_url: "https://graph.facebook.com/oauth/access_token",
            profile_url: "https://graph.facebook.com/me",
        }
    }
}

/// Identity fields from a user's Google profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub email: String,
}

/// Identity fields from a user's GitHub profile.
///
/// GitHub serves JSON `null` for `name` and `email` when the user has
/// not made them public, hence the `Option` fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubProfile {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity fields from a user's Facebook profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacebookProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub email: String,
}

/// Outcome of one Google callback request.
pub type GoogleResult = FlowResult<Google>;

/// Outcome of one GitHub callback request.
pub type GithubResult = FlowResult<Github>;

/// Outcome of one Facebook callback request.
pub type FacebookResult = FlowResult<Facebook>;
