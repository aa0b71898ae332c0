use crate::{cookies, error::Error, AppState};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use domain::session::SessionRecord;
use log::*;

/// The verified session behind the request's session cookie.
///
/// Handlers outside the guarded prefixes use this to validate the session
/// inline; extraction fails with `401 Unauthorized` when there is none.
pub(crate) struct CurrentSession(pub SessionRecord);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let record = cookies::session_token(&jar)
            .and_then(|token| state.session_codec().decode(token).into_record());

        match record {
            Some(record) => Ok(CurrentSession(record)),
            None => {
                trace!("Request to {} has no valid session", parts.uri.path());
                Err(Error::Unauthorized)
            }
        }
    }
}
