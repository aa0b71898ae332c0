//! Identity provider implementations.

mod oidc;

pub use oidc::OidcProvider;
