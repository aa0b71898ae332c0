//! Provider metadata discovery and its process-wide cache.
//!
//! The discovery document is fetched from
//! `{issuer}/.well-known/openid-configuration` the first time any component
//! needs provider metadata. The parsed document is kept for the lifetime of the
//! cache object and never refreshed. A failed fetch is not cached, so the next
//! caller starts over.

use std::sync::Arc;

use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::{configuration_error, ConfigurationErrorKind, Error};
use crate::settings::{ClientRegistration, ClientSettings};

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Provider metadata from the discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub response_types_supported: Vec<String>,
}

/// Single-slot cache of the provider's [`ProviderConfiguration`].
///
/// Construct one per process and share it (behind an `Arc`) with every
/// component that needs provider metadata.
pub struct ProviderConfigurationCache {
    settings: ClientSettings,
    http_client: reqwest::Client,
    slot: OnceCell<Arc<ProviderConfiguration>>,
}

impl ProviderConfigurationCache {
    pub fn new(settings: ClientSettings, http_client: reqwest::Client) -> Self {
        Self {
            settings,
            http_client,
            slot: OnceCell::new(),
        }
    }

    /// Validated client registration, re-checked on every call.
    pub fn registration(&self) -> Result<ClientRegistration, Error> {
        self.settings.registration()
    }

    /// The HTTP client used for every call to the provider.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Returns the cached provider metadata, fetching it on first use.
    ///
    /// Concurrent first callers wait on a single fetch; every caller receives
    /// the same, internally consistent document.
    pub async fn get_configuration(&self) -> Result<Arc<ProviderConfiguration>, Error> {
        let registration = self.registration()?;

        self.slot
            .get_or_try_init(|| async {
                let configuration = self.fetch(&registration).await?;
                info!(
                    "Discovered OIDC provider {} (authorization: {}, token: {})",
                    configuration.issuer,
                    configuration.authorization_endpoint,
                    configuration.token_endpoint
                );
                Ok::<_, Error>(Arc::new(configuration))
            })
            .await
            .map(Arc::clone)
    }

    #[cfg(test)]
    fn is_populated(&self) -> bool {
        self.slot.initialized()
    }

    async fn fetch(&self, registration: &ClientRegistration) -> Result<ProviderConfiguration, Error> {
        let url = format!("{}{}", registration.issuer_id(), DISCOVERY_PATH);
        debug!("Fetching OIDC discovery document from {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            error!("Failed to initialize OIDC configuration: {:?}", e);
            discovery_failed(&format!("Request to {url} failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            error!("OIDC discovery returned HTTP {}", status);
            return Err(discovery_failed(&format!(
                "Discovery endpoint returned {status}"
            )));
        }

        let configuration: ProviderConfiguration = response.json().await.map_err(|e| {
            error!("Failed to parse OIDC discovery document: {:?}", e);
            discovery_failed("Malformed discovery document")
        })?;

        if configuration.issuer.trim_end_matches('/') != registration.issuer_id() {
            error!(
                "OIDC discovery issuer mismatch: expected {}, got {}",
                registration.issuer_id(),
                configuration.issuer
            );
            return Err(discovery_failed("Discovery document issuer mismatch"));
        }

        Ok(configuration)
    }
}

fn discovery_failed(message: &str) -> Error {
    configuration_error(ConfigurationErrorKind::DiscoveryFailed, message)
}
