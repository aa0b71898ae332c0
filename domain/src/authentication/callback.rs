//! The authorization callback as an explicit state machine.
//!
//! ```text
//! Received -> StateValidated -> CodeExchanged -> UserInfoFetched -> SessionCreated
//!     \             \                 \                 \
//!      `-------------`-----------------`-----------------`--> Failed(reason)
//! ```
//!
//! Whatever the outcome, the stored [`AuthorizationContext`] is cleared before
//! [`complete_login`] returns.
//!
//! [`AuthorizationContext`]: super::AuthorizationContext

use super::context::AuthorizationContextStore;
use crate::error::{Error, InternalErrorKind};
use crate::session::{SessionCodec, SessionRecord};
use chrono::Utc;
use log::*;
use oidc_auth::oauth::{IdentityProvider, PkceVerifier};
use serde::Deserialize;
use std::fmt;
use subtle::ConstantTimeEq;

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStage {
    Received,
    StateValidated,
    CodeExchanged,
    UserInfoFetched,
    SessionCreated,
}

/// Why a callback ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// `code` or `state` absent from the query.
    MissingParameters,
    /// No stored state/verifier pair, e.g. direct navigation to the callback.
    MissingContext,
    /// Returned `state` differs from the stored one.
    InvalidState,
    TokenExchangeFailed,
    UserInfoFailed,
    SessionEncodingFailed,
}

impl FailureReason {
    /// Opaque code shown to the user agent. Upstream failures all share one
    /// code so the response never reveals which step failed.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::MissingParameters => "missing_parameters",
            FailureReason::MissingContext => "missing_cookies",
            FailureReason::InvalidState => "invalid_state",
            FailureReason::TokenExchangeFailed
            | FailureReason::UserInfoFailed
            | FailureReason::SessionEncodingFailed => "authentication_failed",
        }
    }
}

/// Terminal failure of the callback state machine.
#[derive(Debug)]
pub struct CallbackError {
    /// Last stage reached before failing.
    pub stage: CallbackStage,
    pub reason: FailureReason,
    pub source: Option<Error>,
}

impl CallbackError {
    fn new(stage: CallbackStage, reason: FailureReason) -> Self {
        Self {
            stage,
            reason,
            source: None,
        }
    }

    fn caused_by(stage: CallbackStage, reason: FailureReason, source: impl Into<Error>) -> Self {
        Self {
            stage,
            reason,
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Callback failed at {:?}: {:?}", self.stage, self.reason)
    }
}

impl std::error::Error for CallbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub token: String,
    pub record: SessionRecord,
}

/// Runs the callback state machine and clears the stored context afterwards.
pub async fn complete_login(
    provider: &dyn IdentityProvider,
    store: &dyn AuthorizationContextStore,
    codec: &SessionCodec,
    params: CallbackParams,
) -> Result<EstablishedSession, CallbackError> {
    let outcome = run(provider, store, codec, params).await;

    if let Err(e) = store.clear().await {
        error!("Failed to clear authorization context: {:?}", e);
    }

    match &outcome {
        Ok(session) => info!("Session created for subject {}", session.record.user.sub),
        Err(e) => warn!("{}; cause: {:?}", e, e.source),
    }
    outcome
}

async fn run(
    provider: &dyn IdentityProvider,
    store: &dyn AuthorizationContextStore,
    codec: &SessionCodec,
    params: CallbackParams,
) -> Result<EstablishedSession, CallbackError> {
    let mut stage = CallbackStage::Received;

    let (Some(code), Some(returned_state)) = (non_empty(params.code), non_empty(params.state))
    else {
        return Err(CallbackError::new(stage, FailureReason::MissingParameters));
    };

    let context = store
        .retrieve()
        .await
        .map_err(|e| CallbackError::caused_by(stage, FailureReason::MissingContext, e))?
        .ok_or_else(|| CallbackError::new(stage, FailureReason::MissingContext))?;

    if !states_match(&context.state, &returned_state) {
        return Err(CallbackError::new(stage, FailureReason::InvalidState));
    }
    stage = CallbackStage::StateValidated;

    let tokens = provider
        .exchange_code(&code, &PkceVerifier::from_string(context.code_verifier))
        .await
        .map_err(|e| CallbackError::caused_by(stage, FailureReason::TokenExchangeFailed, e))?;
    stage = CallbackStage::CodeExchanged;

    let user = provider
        .fetch_user_info(&tokens.access_token)
        .await
        .map_err(|e| CallbackError::caused_by(stage, FailureReason::UserInfoFailed, e))?;
    if !user.has_subject() {
        return Err(CallbackError::caused_by(
            stage,
            FailureReason::UserInfoFailed,
            Error::internal(
                InternalErrorKind::Other("missing subject".to_string()),
                "Userinfo response has no sub claim",
            ),
        ));
    }
    stage = CallbackStage::UserInfoFetched;

    let now = Utc::now().timestamp();
    let record = SessionRecord::new(user, &tokens, now);
    let token = codec
        .encode_at(&record, now)
        .map_err(|e| CallbackError::caused_by(stage, FailureReason::SessionEncodingFailed, e))?;
    stage = CallbackStage::SessionCreated;
    debug!("Callback reached {:?}", stage);

    Ok(EstablishedSession { token, record })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn states_match(stored: &str, returned: &str) -> bool {
    stored.as_bytes().ct_eq(returned.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::context::{AuthorizationContext, MemoryContextStore};
    use crate::session::SessionVerification;
    use async_trait::async_trait;
    use oidc_auth::error::{oauth_error, Error as OidcAuthError, OAuthErrorKind};
    use oidc_auth::oauth::token::TokenSet;
    use oidc_auth::oauth::{AuthorizationRequest, UserIdentity};
    use secrecy::SecretString;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider double that records how often each endpoint was hit.
    #[derive(Default)]
    struct CountingProvider {
        exchanges: AtomicUsize,
        userinfo_calls: AtomicUsize,
        received_verifier: Mutex<Option<String>>,
        fail_exchange: bool,
        fail_userinfo: bool,
        subject: Option<String>,
    }

    impl CountingProvider {
        fn healthy() -> Self {
            Self {
                subject: Some("mock-user-123".to_string()),
                ..Default::default()
            }
        }

        fn exchanges(&self) -> usize {
            self.exchanges.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn authorization_request(&self) -> Result<AuthorizationRequest, OidcAuthError> {
            unreachable!("callback never creates authorization requests")
        }

        async fn exchange_code(
            &self,
            _code: &str,
            code_verifier: &PkceVerifier,
        ) -> Result<TokenSet, OidcAuthError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            *self.received_verifier.lock().unwrap() = Some(code_verifier.as_str().to_string());
            if self.fail_exchange {
                return Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, "invalid_grant"));
            }
            Ok(TokenSet {
                access_token: "mock-access-token-xyz".to_string(),
                token_type: "Bearer".to_string(),
                expires_in_seconds: 3600,
                refresh_token: None,
                id_token: Some("id.token.value".to_string()),
            })
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenSet, OidcAuthError> {
            unreachable!("callback never refreshes")
        }

        async fn fetch_user_info(&self, _access_token: &str) -> Result<UserIdentity, OidcAuthError> {
            self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_userinfo {
                return Err(oauth_error(OAuthErrorKind::UserInfoFailed, "401"));
            }
            Ok(UserIdentity {
                sub: self.subject.clone().unwrap_or_default(),
                name: Some("Mock User".to_string()),
                email: Some("mockuser@example.com".to_string()),
                preferred_username: None,
                extra: Map::new(),
            })
        }
    }

    fn codec() -> SessionCodec {
        SessionCodec::new(&SecretString::new("callback-test-secret".to_string()))
    }

    fn stored_context() -> MemoryContextStore {
        MemoryContextStore::with_context(AuthorizationContext {
            state: "expected-state".to_string(),
            code_verifier: "stored-verifier".to_string(),
        })
    }

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_successful_callback_mints_verifiable_session() {
        let provider = CountingProvider::healthy();
        let store = stored_context();
        let codec = codec();
        let before = Utc::now().timestamp();

        let session = complete_login(
            &provider,
            &store,
            &codec,
            params(Some("mock-auth-code-123"), Some("expected-state")),
        )
        .await
        .unwrap();

        assert_eq!(session.record.user.sub, "mock-user-123");
        assert_eq!(session.record.access_token, "mock-access-token-xyz");
        assert!(session.record.expires_at >= before + 3600);
        assert!(session.record.expires_at <= Utc::now().timestamp() + 3600);
        assert_eq!(
            codec.decode(&session.token),
            SessionVerification::Valid(session.record.clone())
        );
        assert_eq!(
            provider.received_verifier.lock().unwrap().as_deref(),
            Some("stored-verifier")
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_state_mismatch_aborts_before_exchange() {
        let provider = CountingProvider::healthy();
        let store = stored_context();

        let error = complete_login(
            &provider,
            &store,
            &codec(),
            params(Some("code"), Some("attacker-state")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.reason, FailureReason::InvalidState);
        assert_eq!(error.stage, CallbackStage::Received);
        assert_eq!(provider.exchanges(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_context_is_rejected_without_exchange() {
        let provider = CountingProvider::healthy();
        let store = MemoryContextStore::new();

        let error = complete_login(
            &provider,
            &store,
            &codec(),
            params(Some("code"), Some("expected-state")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.reason, FailureReason::MissingContext);
        assert_eq!(error.reason.code(), "missing_cookies");
        assert_eq!(provider.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_missing_parameters_are_rejected_and_context_cleared() {
        for (code, state) in [(None, Some("expected-state")), (Some("code"), None), (Some(""), Some(""))] {
            let provider = CountingProvider::healthy();
            let store = stored_context();

            let error = complete_login(&provider, &store, &codec(), params(code, state))
                .await
                .unwrap_err();

            assert_eq!(error.reason.code(), "missing_parameters");
            assert_eq!(provider.exchanges(), 0);
            assert!(store.is_empty());
        }
    }

    #[tokio::test]
    async fn test_exchange_failure_stops_before_userinfo() {
        let provider = CountingProvider {
            fail_exchange: true,
            ..CountingProvider::healthy()
        };
        let store = stored_context();

        let error = complete_login(
            &provider,
            &store,
            &codec(),
            params(Some("code"), Some("expected-state")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.stage, CallbackStage::StateValidated);
        assert_eq!(error.reason, FailureReason::TokenExchangeFailed);
        assert_eq!(error.reason.code(), "authentication_failed");
        assert_eq!(provider.exchanges(), 1);
        assert_eq!(provider.userinfo_calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_userinfo_failure_reports_generic_code() {
        let provider = CountingProvider {
            fail_userinfo: true,
            ..CountingProvider::healthy()
        };

        let error = complete_login(
            &provider,
            &stored_context(),
            &codec(),
            params(Some("code"), Some("expected-state")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.stage, CallbackStage::CodeExchanged);
        assert_eq!(error.reason, FailureReason::UserInfoFailed);
        assert_eq!(error.reason.code(), "authentication_failed");
    }

    #[tokio::test]
    async fn test_identity_without_subject_is_rejected() {
        let provider = CountingProvider {
            subject: None,
            ..Default::default()
        };

        let error = complete_login(
            &provider,
            &stored_context(),
            &codec(),
            params(Some("code"), Some("expected-state")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.reason, FailureReason::UserInfoFailed);
    }

    #[test]
    fn test_state_comparison_is_exact() {
        assert!(states_match("abc", "abc"));
        assert!(!states_match("abc", "abcd"));
        assert!(!states_match("abc", "ABC"));
        assert!(!states_match("", "abc"));
    }
}
