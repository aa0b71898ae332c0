//! Session lifecycle and the login flow built on top of `oidc-auth`.
//!
//! The types `web` needs from the protocol layer are re-exported here so that
//! `web` does not depend on `oidc-auth` directly.
pub use oidc_auth::oauth::{IdentityProvider, UserIdentity};
pub use oidc_auth::oauth::providers::OidcProvider;

pub mod authentication;
pub mod error;
pub mod session;
