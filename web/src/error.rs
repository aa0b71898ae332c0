use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{DomainErrorKind, Error as DomainError};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Failures a handler reports as a JSON error body. Bodies are generic; the
/// detail only goes to the log.
#[derive(Debug)]
pub enum Error {
    /// No valid session on a route that needs one.
    Unauthorized,
    /// The login could not be started (provider unconfigured or unreachable).
    LoginFailed(DomainError),
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Unauthorized => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            Error::LoginFailed(domain_error) => {
                match domain_error.error_kind {
                    DomainErrorKind::Internal(_) => error!("Login error: {domain_error:?}"),
                    DomainErrorKind::External(_) => {
                        error!("Identity provider unavailable during login: {domain_error:?}")
                    }
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to initiate login" })),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Error::LoginFailed(err.into())
    }
}
