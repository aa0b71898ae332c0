//! Token endpoint results and ID token verification.

pub mod id_token;
mod tokens;

pub use tokens::{TokenSet, DEFAULT_EXPIRES_IN_SECS, DEFAULT_TOKEN_TYPE};
pub(crate) use tokens::{TokenErrorResponse, TokenResponse};
