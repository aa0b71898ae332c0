//! # oidc-auth
//!
//! Relying party side of OpenID Connect:
//! - Client settings validation
//! - Provider discovery with a process-wide cache
//! - Authorization requests with PKCE (`S256`) and CSRF state
//! - Authorization code exchange, token refresh and ID token verification
//! - Userinfo retrieval
//! - HTTP client building
//!
//! Nothing here keeps per-user state. Storing the verifier and state between
//! the redirect and the callback, and keeping the resulting session, belong to
//! the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oidc_auth::{
//!     discovery::ProviderConfigurationCache,
//!     http::HttpClientBuilder,
//!     oauth::{providers::OidcProvider, IdentityProvider},
//!     settings::ClientSettings,
//! };
//! ```

pub mod discovery;
pub mod error;
pub mod http;
pub mod oauth;
pub mod settings;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
