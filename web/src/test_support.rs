//! Fixtures shared by the crate's unit tests.

use crate::AppState;
use async_trait::async_trait;
use clap::Parser;
use domain::session::{SessionCodec, SessionRecord};
use domain::{IdentityProvider, UserIdentity};
use oidc_auth::oauth::token::TokenSet;
use oidc_auth::oauth::{AuthorizationRequest, PkceVerifier};
use oidc_auth::error::{configuration_error, ConfigurationErrorKind};
use oidc_auth::Error as OidcAuthError;
use secrecy::SecretString;
use serde_json::Map;
use service::config::Config;
use std::sync::Arc;

pub(crate) const AUTHORIZE_URL: &str =
    "https://idp.example.com/authorize?client_id=test-client&state=stub-state";
pub(crate) const STUB_STATE: &str = "stub-state";
pub(crate) const STUB_VERIFIER: &str = "stub-verifier";

/// Identity provider that answers without any network traffic.
#[derive(Default)]
pub(crate) struct StubProvider {
    pub(crate) unconfigured: bool,
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn authorization_request(&self) -> Result<AuthorizationRequest, OidcAuthError> {
        if self.unconfigured {
            return Err(configuration_error(
                ConfigurationErrorKind::MissingSetting,
                "OIDC_ISSUER",
            ));
        }
        Ok(AuthorizationRequest {
            url: AUTHORIZE_URL.to_string(),
            code_verifier: STUB_VERIFIER.to_string(),
            code_challenge: "stub-challenge".to_string(),
            state: STUB_STATE.to_string(),
        })
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: &PkceVerifier,
    ) -> Result<TokenSet, OidcAuthError> {
        Ok(TokenSet {
            access_token: "stub-access-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in_seconds: 3600,
            refresh_token: None,
            id_token: None,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenSet, OidcAuthError> {
        self.exchange_code("", &PkceVerifier::generate()).await
    }

    async fn fetch_user_info(&self, _access_token: &str) -> Result<UserIdentity, OidcAuthError> {
        Ok(user())
    }
}

pub(crate) fn user() -> UserIdentity {
    UserIdentity {
        sub: "stub-user".to_string(),
        name: Some("Stub User".to_string()),
        email: Some("stub@example.com".to_string()),
        preferred_username: None,
        extra: Map::new(),
    }
}

fn codec() -> SessionCodec {
    SessionCodec::new(&SecretString::new("web-test-session-secret".to_string()))
}

pub(crate) fn test_config() -> Config {
    Config::parse_from(["oidc_relying_party_rs"])
}

pub(crate) fn state_from(config: Config, provider: StubProvider) -> AppState {
    AppState::new(config, Arc::new(provider), codec())
}

pub(crate) fn state_with(provider: StubProvider) -> AppState {
    state_from(test_config(), provider)
}

pub(crate) fn test_state() -> AppState {
    state_with(StubProvider::default())
}

/// A session token signed with the same key as [`test_state`].
pub(crate) fn session_for(issued_at: i64, expires_at: i64) -> String {
    let record = SessionRecord {
        user: user(),
        access_token: "stub-access-token".to_string(),
        id_token: None,
        expires_at,
    };
    codec().encode_at(&record, issued_at).unwrap()
}
