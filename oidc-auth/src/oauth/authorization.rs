//! Authorization request URL construction.

use url::Url;

use super::pkce::{PkceChallenge, CODE_CHALLENGE_METHOD};
use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::settings::ClientRegistration;

/// Scopes requested on every login.
pub const SCOPES: &str = "openid profile email";

/// Builds the provider authorization URL for the code flow with PKCE.
///
/// Query parameters already present on the endpoint are kept.
pub fn build_authorization_url(
    authorization_endpoint: &str,
    registration: &ClientRegistration,
    challenge: &PkceChallenge,
    state: &str,
) -> Result<Url, Error> {
    let mut url = Url::parse(authorization_endpoint).map_err(|e| {
        oauth_error(
            OAuthErrorKind::InvalidResponse,
            &format!("Invalid authorization_endpoint {authorization_endpoint}: {e}"),
        )
    })?;

    url.query_pairs_mut()
        .append_pair("client_id", &registration.client_id)
        .append_pair("redirect_uri", registration.redirect_uri.as_str())
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPES)
        .append_pair("code_challenge", challenge.as_str())
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .append_pair("state", state);

    Ok(url)
}
