//! Login start and callback completion for the OpenID Connect code flow.
//!
//! The identity provider is reached through [`IdentityProvider`]; the values
//! that tie a callback to its login attempt live in an
//! [`AuthorizationContextStore`] supplied by the caller.

use crate::error::Error;
use log::*;
use oidc_auth::discovery::ProviderConfigurationCache;
use oidc_auth::http::HttpClientBuilder;
use oidc_auth::oauth::providers::OidcProvider;
use oidc_auth::oauth::IdentityProvider;
use oidc_auth::settings::ClientSettings;
use service::config::Config;
use std::sync::Arc;
use std::time::Duration;

pub mod callback;
pub mod context;

pub use callback::{
    complete_login, CallbackError, CallbackParams, CallbackStage, EstablishedSession,
    FailureReason,
};
pub use context::{AuthorizationContext, AuthorizationContextStore, MemoryContextStore};

/// Build the OpenID Connect provider described by `config`.
///
/// Settings are not validated here. A missing issuer or client credential
/// surfaces as a configuration error from the first operation that needs it.
pub fn new_provider(config: &Config) -> Result<OidcProvider, Error> {
    let settings = ClientSettings::new(
        config.oidc_issuer(),
        config.oidc_client_id(),
        config.oidc_client_secret(),
        config.oidc_redirect_uri(),
    );

    let http_client = HttpClientBuilder::new()
        .with_timeout(Duration::from_secs(config.oidc_http_timeout_secs))
        .build()?;

    Ok(OidcProvider::new(Arc::new(ProviderConfigurationCache::new(
        settings,
        http_client,
    ))))
}

/// Start a login: create a PKCE-bound authorization request, keep its state
/// and verifier in `store`, and return the URL to send the user agent to.
pub async fn begin_login(
    provider: &dyn IdentityProvider,
    store: &dyn AuthorizationContextStore,
) -> Result<String, Error> {
    let request = provider.authorization_request().await.inspect_err(|e| {
        warn!("Failed to create authorization request: {:?}", e);
    })?;

    store
        .store(AuthorizationContext {
            state: request.state,
            code_verifier: request.code_verifier,
        })
        .await?;

    info!("Redirecting user agent to the identity provider");
    Ok(request.url)
}
