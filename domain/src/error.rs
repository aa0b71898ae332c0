//! Error types for the `domain` layer.
use oidc_auth::error::{Error as OidcAuthError, ErrorKind as OidcAuthErrorKind};
use service::config::ConfigError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. `web` depends on `domain` but not directly on `oidc-auth`, so
/// protocol failures are translated here and `web` maps the resulting kinds to
/// HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Missing or invalid settings, including an unreachable discovery document.
    Config,
    /// A session token could not be produced.
    Session,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// The identity provider rejected a request or answered with something unusable.
    Provider,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl Error {
    pub(crate) fn internal(kind: InternalErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(kind),
        }
    }
}

// This is where we translate errors from the `oidc-auth` layer to the `domain` layer.
impl From<OidcAuthError> for Error {
    fn from(err: OidcAuthError) -> Self {
        let error_kind = match &err.error_kind {
            OidcAuthErrorKind::Configuration(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            OidcAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            OidcAuthErrorKind::OAuth(_) => DomainErrorKind::External(ExternalErrorKind::Provider),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Session),
        }
    }
}
