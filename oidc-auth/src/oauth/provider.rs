//! Identity provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pkce::PkceVerifier;
use super::token::TokenSet;
use crate::error::Error;

/// Authorization request with URL and the values the caller must keep until
/// the callback arrives.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// PKCE verifier to be stored for later code exchange.
    pub code_verifier: String,
    /// The `S256` challenge derived from `code_verifier`, already part of `url`.
    pub code_challenge: String,
    /// CSRF state parameter for validation.
    pub state: String,
}

/// Claims returned by the provider's userinfo endpoint.
///
/// `sub` is the identity anchor. It is decoded leniently (an absent `sub`
/// becomes an empty string) so callers decide how to treat it, see
/// [`UserIdentity::has_subject`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Any other claims the provider returned, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserIdentity {
    pub fn has_subject(&self) -> bool {
        !self.sub.trim().is_empty()
    }
}

/// Trait for OpenID Connect identity providers.
///
/// Implementations handle the relying party side of the authorization code flow:
/// - Authorization URL generation with PKCE and state
/// - Authorization code exchange for tokens
/// - Token refresh
/// - User info retrieval
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Generate an authorization request with a fresh PKCE verifier and state.
    async fn authorization_request(&self) -> Result<AuthorizationRequest, Error>;

    /// Exchange an authorization code for tokens.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the callback
    /// * `code_verifier` - PKCE verifier generated with the authorization request
    ///
    /// The callback's `state` has already been checked by the caller and is not
    /// validated again here.
    async fn exchange_code(&self, code: &str, code_verifier: &PkceVerifier)
        -> Result<TokenSet, Error>;

    /// Refresh an access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, Error>;

    /// Get user information using an access token.
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserIdentity, Error>;
}
