use crate::{cookies, AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use log::*;
use std::sync::Arc;

pub(crate) const LOGIN_PATH: &str = "/api/auth/login";

/// Ordered list of path prefixes that require a session.
///
/// Matching is a plain string prefix: `/products` covers `/products`,
/// `/products/p-1001` and `/products.csv` alike.
#[derive(Clone, Debug)]
pub struct ProtectedPaths(Arc<[String]>);

impl ProtectedPaths {
    pub fn new(prefixes: Vec<String>) -> Self {
        let prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|prefix| prefix.trim_end_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();
        Self(prefixes.into())
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.0.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Redirects requests for protected paths to the login endpoint unless they
/// carry a valid session cookie. Everything else passes through untouched.
pub(crate) async fn require_session(
    State(app_state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !app_state.protected_paths().is_protected(path) {
        return next.run(request).await;
    }

    let Some(token) = cookies::session_token(&jar) else {
        debug!("No session cookie for protected path {path}, redirecting to login");
        return Redirect::temporary(LOGIN_PATH).into_response();
    };

    if app_state.session_codec().decode(token).is_valid() {
        next.run(request).await
    } else {
        debug!("Invalid or expired session for protected path {path}, redirecting to login");
        Redirect::temporary(LOGIN_PATH).into_response()
    }
}
