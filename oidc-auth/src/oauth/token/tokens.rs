//! OAuth token types.

use std::fmt;

use serde::Deserialize;

/// Token type assumed when the provider leaves `token_type` out.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Access token lifetime assumed when the provider leaves `expires_in` out.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Normalized result of a successful token endpoint call.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Access token for the userinfo endpoint and resource servers.
    pub access_token: String,
    /// Token type, `Bearer` unless the provider says otherwise.
    pub token_type: String,
    /// Lifetime of the access token, as asserted by the provider.
    pub expires_in_seconds: i64,
    /// Refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    /// OpenID Connect ID token, if the provider issued one.
    pub id_token: Option<String>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Raw successful token endpoint response body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Raw error response body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expires_in_seconds: response
                .expires_in
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            refresh_token: response.refresh_token,
            id_token: response.id_token,
        }
    }
}
