//! OpenID Connect authorization code flow with PKCE.

mod authorization;
mod pkce;
mod provider;
mod state;

pub mod providers;
pub mod token;

pub use authorization::{build_authorization_url, SCOPES};
pub use pkce::{PkceChallenge, PkceVerifier, CODE_CHALLENGE_METHOD};
pub use provider::{AuthorizationRequest, IdentityProvider, UserIdentity};
pub use state::generate_state;
