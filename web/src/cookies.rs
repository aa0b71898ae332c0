//! Cookie layout for the session and for the transient login context.

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use domain::authentication::{AuthorizationContext, AuthorizationContextStore};
use domain::error::Error as DomainError;
use domain::session::SessionRecord;
use service::config::{
    AUTHORIZATION_CONTEXT_MAX_AGE_SECS, CODE_VERIFIER_COOKIE_NAME, SESSION_COOKIE_NAME,
    STATE_COOKIE_NAME,
};
use std::sync::{Mutex, PoisonError};
use time::Duration;

fn build_cookie(name: &'static str, value: String, secure: bool, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// A cookie that only names `name` on path `/`, used to expire it.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Session cookie living exactly as long as the session itself.
pub(crate) fn session_cookie(token: String, record: &SessionRecord, now: i64, secure: bool) -> Cookie<'static> {
    build_cookie(SESSION_COOKIE_NAME, token, secure, record.remaining_seconds(now))
}

pub(crate) fn remove_session(jar: CookieJar) -> CookieJar {
    jar.remove(removal_cookie(SESSION_COOKIE_NAME))
}

pub(crate) fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE_NAME).map(|cookie| cookie.value())
}

/// [`AuthorizationContextStore`] backed by the request's cookies.
///
/// Reads come from the incoming jar; writes accumulate in it and reach the
/// user agent once the handler returns [`CookieContextStore::into_jar`] as part
/// of its response.
pub(crate) struct CookieContextStore {
    jar: Mutex<CookieJar>,
    secure: bool,
}

impl CookieContextStore {
    pub(crate) fn new(jar: CookieJar, secure: bool) -> Self {
        Self {
            jar: Mutex::new(jar),
            secure,
        }
    }

    pub(crate) fn into_jar(self) -> CookieJar {
        self.jar.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(CookieJar) -> CookieJar) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        *jar = f(jar.clone());
    }
}

#[async_trait]
impl AuthorizationContextStore for CookieContextStore {
    async fn store(&self, context: AuthorizationContext) -> Result<(), DomainError> {
        let secure = self.secure;
        self.update(|jar| {
            jar.add(build_cookie(
                STATE_COOKIE_NAME,
                context.state,
                secure,
                AUTHORIZATION_CONTEXT_MAX_AGE_SECS,
            ))
            .add(build_cookie(
                CODE_VERIFIER_COOKIE_NAME,
                context.code_verifier,
                secure,
                AUTHORIZATION_CONTEXT_MAX_AGE_SECS,
            ))
        });
        Ok(())
    }

    async fn retrieve(&self) -> Result<Option<AuthorizationContext>, DomainError> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        let context = match (jar.get(STATE_COOKIE_NAME), jar.get(CODE_VERIFIER_COOKIE_NAME)) {
            (Some(state), Some(code_verifier)) => Some(AuthorizationContext {
                state: state.value().to_string(),
                code_verifier: code_verifier.value().to_string(),
            }),
            _ => None,
        };
        Ok(context)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.update(|jar| {
            jar.remove(removal_cookie(STATE_COOKIE_NAME))
                .remove(removal_cookie(CODE_VERIFIER_COOKIE_NAME))
        });
        Ok(())
    }
}
