//! Client registration settings for the relying party.

use secrecy::SecretString;
use url::Url;

use crate::error::{configuration_error, ConfigurationErrorKind, Error};

/// Raw client settings as they come out of the environment.
///
/// Every value is optional here; absence is only reported when an operation
/// actually needs the provider, via [`ClientSettings::registration`].
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    issuer: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_uri: Option<String>,
}

/// Validated client registration: everything needed to talk to the provider.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub issuer: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: Url,
}

impl ClientSettings {
    pub fn new(
        issuer: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        Self {
            issuer: non_blank(issuer),
            client_id: non_blank(client_id),
            client_secret: non_blank(client_secret).map(SecretString::new),
            redirect_uri: non_blank(redirect_uri),
        }
    }

    /// Validates that every required setting is present and well formed.
    pub fn registration(&self) -> Result<ClientRegistration, Error> {
        let (Some(issuer), Some(client_id), Some(client_secret), Some(redirect_uri)) = (
            self.issuer.as_ref(),
            self.client_id.as_ref(),
            self.client_secret.as_ref(),
            self.redirect_uri.as_ref(),
        ) else {
            return Err(configuration_error(
                ConfigurationErrorKind::MissingSetting,
                "Missing required OIDC configuration",
            ));
        };

        Ok(ClientRegistration {
            issuer: parse_url("OIDC_ISSUER", issuer)?,
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            redirect_uri: parse_url("OIDC_REDIRECT_URI", redirect_uri)?,
        })
    }
}

impl ClientRegistration {
    /// Issuer identifier as a string without a trailing slash.
    pub fn issuer_id(&self) -> &str {
        self.issuer.as_str().trim_end_matches('/')
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_url(name: &str, value: &str) -> Result<Url, Error> {
    Url::parse(value).map_err(|e| {
        configuration_error(
            ConfigurationErrorKind::InvalidSetting,
            &format!("{name} is not a valid URL: {e}"),
        )
    })
}
