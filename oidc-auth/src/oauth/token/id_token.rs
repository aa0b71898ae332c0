//! ID token verification against the provider's published signing keys.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::discovery::ProviderConfiguration;
use crate::error::{oauth_error, oauth_error_from, Error, OAuthErrorKind};
use crate::settings::ClientRegistration;

/// JSON Web Key Set as served from the provider's `jwks_uri`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// A single public key. Only RSA signing keys are usable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// Claims this client relies on from a verified ID token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl JsonWebKeySet {
    /// Finds the RSA signing key named by `kid`, or the only one when the token
    /// header carries no `kid`.
    pub fn find_signing_key(&self, kid: Option<&str>) -> Option<&JsonWebKey> {
        let mut candidates = self
            .keys
            .iter()
            .filter(|k| k.kty == "RSA" && k.key_use.as_deref() != Some("enc"));

        match kid {
            Some(kid) => candidates.find(|k| k.kid.as_deref() == Some(kid)),
            None => {
                let first = candidates.next();
                match candidates.next() {
                    Some(_) => None,
                    None => first,
                }
            }
        }
    }
}

impl JsonWebKey {
    fn decoding_key(&self) -> Result<DecodingKey, Error> {
        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            return Err(oauth_error(
                OAuthErrorKind::IdTokenInvalid,
                "Signing key is missing RSA parameters",
            ));
        };
        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| oauth_error_from(OAuthErrorKind::IdTokenInvalid, e))
    }
}

/// Verifies an ID token's RS256 signature, issuer, audience and expiry.
pub(crate) async fn verify(
    http_client: &reqwest::Client,
    configuration: &ProviderConfiguration,
    registration: &ClientRegistration,
    id_token: &str,
) -> Result<IdTokenClaims, Error> {
    let header =
        decode_header(id_token).map_err(|e| oauth_error_from(OAuthErrorKind::IdTokenInvalid, e))?;
    if header.alg != Algorithm::RS256 {
        warn!("Rejecting ID token signed with {:?}", header.alg);
        return Err(oauth_error(
            OAuthErrorKind::IdTokenInvalid,
            "Unsupported ID token signing algorithm",
        ));
    }

    let jwks_uri = configuration.jwks_uri.as_deref().ok_or_else(|| {
        oauth_error(
            OAuthErrorKind::MissingEndpoint,
            "Provider metadata has no jwks_uri",
        )
    })?;
    let key_set = fetch_key_set(http_client, jwks_uri).await?;

    let key = key_set
        .find_signing_key(header.kid.as_deref())
        .ok_or_else(|| {
            warn!("No JWKS key matches ID token kid {:?}", header.kid);
            oauth_error(OAuthErrorKind::IdTokenInvalid, "No matching signing key")
        })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[configuration.issuer.as_str()]);
    validation.set_audience(&[registration.client_id.as_str()]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let token_data = decode::<IdTokenClaims>(id_token, &key.decoding_key()?, &validation)
        .map_err(|e| {
            warn!("ID token verification failed: {:?}", e);
            oauth_error_from(OAuthErrorKind::IdTokenInvalid, e)
        })?;

    debug!("Verified ID token for subject {}", token_data.claims.sub);
    Ok(token_data.claims)
}

async fn fetch_key_set(http_client: &reqwest::Client, jwks_uri: &str) -> Result<JsonWebKeySet, Error> {
    let response = http_client
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| oauth_error_from(OAuthErrorKind::IdTokenInvalid, e))?;

    if !response.status().is_success() {
        warn!("JWKS endpoint returned HTTP {}", response.status());
        return Err(oauth_error(
            OAuthErrorKind::IdTokenInvalid,
            "Failed to fetch provider signing keys",
        ));
    }

    response
        .json::<JsonWebKeySet>()
        .await
        .map_err(|e| oauth_error_from(OAuthErrorKind::InvalidResponse, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_key(kid: Option<&str>) -> JsonWebKey {
        JsonWebKey {
            kty: "RSA".to_string(),
            kid: kid.map(str::to_string),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn test_find_signing_key_by_kid() {
        let set = JsonWebKeySet {
            keys: vec![rsa_key(Some("a")), rsa_key(Some("mock-oidc-key-1"))],
        };
        let key = set.find_signing_key(Some("mock-oidc-key-1")).unwrap();
        assert_eq!(key.kid.as_deref(), Some("mock-oidc-key-1"));
        assert!(set.find_signing_key(Some("unknown")).is_none());
    }

    #[test]
    fn test_find_signing_key_without_kid_needs_a_single_candidate() {
        let single = JsonWebKeySet {
            keys: vec![rsa_key(None)],
        };
        assert!(single.find_signing_key(None).is_some());

        let ambiguous = JsonWebKeySet {
            keys: vec![rsa_key(Some("a")), rsa_key(Some("b"))],
        };
        assert!(ambiguous.find_signing_key(None).is_none());
    }

    #[test]
    fn test_encryption_keys_are_ignored() {
        let mut key = rsa_key(Some("enc-key"));
        key.key_use = Some("enc".to_string());
        let set = JsonWebKeySet { keys: vec![key] };
        assert!(set.find_signing_key(Some("enc-key")).is_none());
    }

    #[test]
    fn test_jwks_document_round_trips_use_field() {
        let json = r#"{"keys":[{"kty":"RSA","kid":"k1","use":"sig","alg":"RS256","n":"xyz","e":"AQAB"}]}"#;
        let set: JsonWebKeySet = serde_json::from_str(json).unwrap();
        assert_eq!(set.keys[0].key_use.as_deref(), Some("sig"));
    }
}
