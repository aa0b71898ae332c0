//! Error types for the `oidc-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for oidc-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in oidc-auth.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Configuration(ConfigurationErrorKind),
    OAuth(OAuthErrorKind),
    Http(HttpErrorKind),
}

/// Errors that prevent any protocol operation from starting.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationErrorKind {
    /// A required setting (issuer, client id/secret, redirect URI) is absent.
    MissingSetting,
    /// A setting is present but unusable, e.g. an issuer that is not a URL.
    InvalidSetting,
    /// The provider's discovery document could not be fetched or parsed.
    DiscoveryFailed,
}

/// Errors from OAuth / OpenID Connect operations against the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum OAuthErrorKind {
    TokenExchangeFailed,
    TokenRefreshFailed,
    UserInfoFailed,
    MissingEndpoint,
    InvalidResponse,
    IdTokenInvalid,
}

/// Errors from HTTP client operations.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl Error {
    /// Returns true for errors raised before any request reached the provider's
    /// token or userinfo endpoints.
    pub fn is_configuration(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Configuration(_))
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(kind: ConfigurationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration(kind),
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Wraps an underlying error (network, decoding) as an OAuth error of the given kind.
pub fn oauth_error_from<E>(kind: OAuthErrorKind, err: E) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::OAuth(kind),
    }
}
