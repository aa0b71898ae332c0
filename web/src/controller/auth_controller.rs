//! Endpoints of the OpenID Connect login flow.
//!
//! None of these routes sit behind the route guard, otherwise an expired
//! session would redirect to login forever.

use crate::cookies::{self, CookieContextStore};
use crate::{AppState, Error};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use domain::authentication::{self, CallbackParams, EstablishedSession};
use log::*;
use serde_json::{json, Value};

pub(crate) const DASHBOARD_PATH: &str = "/dashboard";

/// GET /api/auth/login
///
/// Starts a login: stores `oidc_state` and `oidc_code_verifier` cookies for
/// ten minutes and redirects the user agent to the identity provider.
#[utoipa::path(
    get,
    path = "/api/auth/login",
    responses(
        (status = 307, description = "Redirect to the identity provider's authorization endpoint"),
        (status = 500, description = "Failed to initiate login"),
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), Error> {
    let store = CookieContextStore::new(jar, app_state.secure_cookies());
    let url = authentication::begin_login(app_state.provider(), &store).await?;

    Ok((store.into_jar(), Redirect::temporary(&url)))
}

/// GET /api/auth/callback
///
/// Completes a login. On success sets the session cookie and redirects to
/// the dashboard; on any failure redirects to `/?error=<reason>`. A query
/// string that does not parse counts as missing parameters.
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code issued by the identity provider"),
        ("state" = Option<String>, Query, description = "State value echoed back by the identity provider"),
    ),
    responses(
        (status = 307, description = "Redirect to the dashboard, or to `/?error=<reason>` on failure"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> (CookieJar, Redirect) {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!("Unparseable callback query: {rejection}");
            CallbackParams::default()
        }
    };
    let secure = app_state.secure_cookies();
    let store = CookieContextStore::new(jar, secure);
    let outcome = authentication::complete_login(
        app_state.provider(),
        &store,
        app_state.session_codec(),
        params,
    )
    .await;
    let jar = store.into_jar();

    match outcome {
        Ok(EstablishedSession { token, record }) => {
            let now = Utc::now().timestamp();
            (
                jar.add(cookies::session_cookie(token, &record, now, secure)),
                Redirect::temporary(DASHBOARD_PATH),
            )
        }
        Err(e) => (
            jar,
            Redirect::temporary(&format!("/?error={}", e.reason.code())),
        ),
    }
}

/// GET /api/auth/logout
///
/// Clears the session cookie and redirects home.
#[utoipa::path(
    get,
    path = "/api/auth/logout",
    responses(
        (status = 307, description = "Session cleared, redirect to `/`"),
    )
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (cookies::remove_session(jar), Redirect::temporary("/"))
}

/// POST /api/auth/logout
///
/// Clears the session cookie for script clients.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared, body is `{\"success\": true}`"),
    )
)]
pub async fn logout_acknowledged(jar: CookieJar) -> (CookieJar, Json<Value>) {
    (cookies::remove_session(jar), Json(json!({ "success": true })))
}
