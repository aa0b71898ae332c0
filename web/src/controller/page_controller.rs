use crate::cookies;
use crate::extractors::current_session::CurrentSession;
use crate::AppState;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct HomeParams {
    /// Reason code set by a failed login callback.
    pub error: Option<String>,
}

/// GET /
///
/// Public landing view. Reports whether the request carries a valid session
/// and echoes the reason code of a failed login.
#[utoipa::path(
    get,
    path = "/",
    params(
        ("error" = Option<String>, Query, description = "Reason code of a failed login"),
    ),
    responses(
        (status = 200, description = "`{authenticated, user?, error?}`"),
    )
)]
pub async fn home(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<HomeParams>,
) -> Json<Value> {
    let session = cookies::session_token(&jar)
        .and_then(|token| app_state.session_codec().decode(token).into_record());

    let mut body = json!({ "authenticated": session.is_some() });
    if let Some(record) = session {
        body["user"] = json!(record.user);
    }
    if let Some(error) = params.error {
        body["error"] = json!(error);
    }
    Json(body)
}

/// GET /dashboard
///
/// The signed-in user's profile and session expiry.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Session user and expiry"),
        (status = 307, description = "No valid session, redirect to login"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn dashboard(CurrentSession(record): CurrentSession) -> Json<Value> {
    let now = Utc::now().timestamp();
    Json(json!({
        "user": record.user,
        "expiresAt": record.expires_at,
        "expiresIn": record.remaining_seconds(now),
    }))
}
