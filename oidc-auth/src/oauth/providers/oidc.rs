//! Generic OpenID Connect provider driven by the discovery document.

use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::discovery::{ProviderConfiguration, ProviderConfigurationCache};
use crate::error::{oauth_error, oauth_error_from, Error, OAuthErrorKind};
use crate::oauth::authorization::build_authorization_url;
use crate::oauth::pkce::PkceVerifier;
use crate::oauth::provider::{AuthorizationRequest, IdentityProvider, UserIdentity};
use crate::oauth::state::generate_state;
use crate::oauth::token::id_token;
use crate::oauth::token::{TokenErrorResponse, TokenResponse, TokenSet};
use crate::settings::ClientRegistration;

/// Authorization code grant, sent as `client_secret_post`.
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
    code_verifier: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenRefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// OpenID Connect provider.
///
/// All endpoints come from the issuer's discovery document, resolved once
/// through the shared [`ProviderConfigurationCache`].
#[derive(Clone)]
pub struct OidcProvider {
    cache: Arc<ProviderConfigurationCache>,
}

impl OidcProvider {
    pub fn new(cache: Arc<ProviderConfigurationCache>) -> Self {
        Self { cache }
    }

    /// Validated registration plus resolved provider metadata.
    async fn resolve(&self) -> Result<(ClientRegistration, Arc<ProviderConfiguration>), Error> {
        let registration = self.cache.registration()?;
        let configuration = self.cache.get_configuration().await?;
        Ok((registration, configuration))
    }

    /// POSTs a form to the token endpoint and normalizes the result.
    ///
    /// Any non-2xx answer becomes `failure_kind`; the provider's error payload is
    /// logged but not passed on.
    async fn request_tokens<T: Serialize + ?Sized>(
        &self,
        configuration: &ProviderConfiguration,
        registration: &ClientRegistration,
        form: &T,
        failure_kind: OAuthErrorKind,
    ) -> Result<TokenSet, Error> {
        let response = self
            .cache
            .http_client()
            .post(&configuration.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Token endpoint request failed: {:?}", e);
                oauth_error_from(failure_kind.clone(), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(error) => warn!(
                    "Token endpoint returned HTTP {}: {} ({})",
                    status,
                    error.error,
                    error.error_description.as_deref().unwrap_or("no description")
                ),
                Err(_) => warn!("Token endpoint returned HTTP {}: {}", status, body),
            }
            return Err(oauth_error(
                failure_kind,
                &format!("Token endpoint returned HTTP {status}"),
            ));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse token response: {:?}", e);
            oauth_error_from(OAuthErrorKind::InvalidResponse, e)
        })?;
        let tokens = TokenSet::from(token_response);

        if let Some(token) = tokens.id_token.as_deref() {
            id_token::verify(self.cache.http_client(), configuration, registration, token).await?;
        }

        Ok(tokens)
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn authorization_request(&self) -> Result<AuthorizationRequest, Error> {
        let (registration, configuration) = self.resolve().await?;

        let verifier = PkceVerifier::generate();
        let challenge = verifier.challenge();
        let state = generate_state();

        let url = build_authorization_url(
            &configuration.authorization_endpoint,
            &registration,
            &challenge,
            &state,
        )?;

        debug!("Created authorization request for issuer {}", registration.issuer_id());

        Ok(AuthorizationRequest {
            url: url.to_string(),
            code_verifier: verifier.as_str().to_string(),
            code_challenge: challenge.as_str().to_string(),
            state,
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &PkceVerifier,
    ) -> Result<TokenSet, Error> {
        let (registration, configuration) = self.resolve().await?;

        let request = TokenExchangeRequest {
            grant_type: "authorization_code",
            code,
            redirect_uri: registration.redirect_uri.as_str(),
            code_verifier: code_verifier.as_str(),
            client_id: &registration.client_id,
            client_secret: registration.client_secret.expose_secret(),
        };

        debug!("Exchanging authorization code for tokens");
        let tokens = self
            .request_tokens(
                &configuration,
                &registration,
                &request,
                OAuthErrorKind::TokenExchangeFailed,
            )
            .await?;
        info!("Successfully exchanged authorization code for tokens");
        Ok(tokens)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        let (registration, configuration) = self.resolve().await?;

        let request = TokenRefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
            client_id: &registration.client_id,
            client_secret: registration.client_secret.expose_secret(),
        };

        debug!("Refreshing access token");
        self.request_tokens(
            &configuration,
            &registration,
            &request,
            OAuthErrorKind::TokenRefreshFailed,
        )
        .await
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserIdentity, Error> {
        let configuration = self.cache.get_configuration().await?;
        let userinfo_endpoint = configuration.userinfo_endpoint.as_deref().ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::MissingEndpoint,
                "Provider metadata has no userinfo_endpoint",
            )
        })?;

        let response = self
            .cache
            .http_client()
            .get(userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Userinfo request failed: {:?}", e);
                oauth_error_from(OAuthErrorKind::UserInfoFailed, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Userinfo endpoint returned HTTP {}", status);
            return Err(oauth_error(
                OAuthErrorKind::UserInfoFailed,
                &format!("Userinfo endpoint returned HTTP {status}"),
            ));
        }

        response.json::<UserIdentity>().await.map_err(|e| {
            warn!("Failed to parse userinfo response: {:?}", e);
            oauth_error_from(OAuthErrorKind::InvalidResponse, e)
        })
    }
}
