//! The fixture's RSA signing key and its public JWKS form.
//!
//! A fresh key pair is generated for every [`crate::MockProvider`]; nothing is
//! persisted, so tokens signed by a previous process no longer verify.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::Serialize;
use serde_json::{json, Value};

pub const KEY_ID: &str = "mock-oidc-key-1";

const KEY_BITS: usize = 2048;

pub(crate) struct SigningKey {
    encoding_key: EncodingKey,
    jwks: Value,
}

impl SigningKey {
    pub(crate) fn generate() -> anyhow::Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)?;
        let pem = private_key.to_pkcs1_pem(LineEnding::LF)?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())?;

        let jwks = json!({
            "keys": [{
                "kty": "RSA",
                "kid": KEY_ID,
                "alg": "RS256",
                "use": "sig",
                "n": URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
            }]
        });

        Ok(Self { encoding_key, jwks })
    }

    pub(crate) fn jwks(&self) -> &Value {
        &self.jwks
    }

    pub(crate) fn sign<T: Serialize>(&self, claims: &T) -> jsonwebtoken::errors::Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());
        encode(&header, claims, &self.encoding_key)
    }
}
