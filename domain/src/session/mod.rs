//! Stateless sessions held by the client as signed tokens.
//!
//! A [`SessionRecord`] is serialized into an HS256 JWT whose `exp` claim equals
//! the record's `expires_at`. Nothing is stored server side: [`SessionCodec::decode`]
//! verifies signature and expiry together and reports any failure as
//! [`SessionVerification::Invalid`], which callers treat exactly like "no session".
//!
//! # Example
//!
//! ```rust,ignore
//! use domain::session::{SessionCodec, SessionVerification};
//!
//! let codec = SessionCodec::from_config(&config)?;
//! let token = codec.encode(&record)?;
//! match codec.decode(&token) {
//!     SessionVerification::Valid(record) => println!("hello {}", record.user.sub),
//!     SessionVerification::Invalid => println!("please log in"),
//! }
//! ```

use crate::error::Error;
use chrono::Utc;
use claims::SessionClaims;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use oidc_auth::oauth::token::TokenSet;
use oidc_auth::oauth::UserIdentity;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use service::config::Config;
use std::fmt;

pub(crate) mod claims;

/// Everything a logged in user carries around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user: UserIdentity,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Unix seconds at which the provider's access token, and with it the
    /// session, expires.
    pub expires_at: i64,
}

impl SessionRecord {
    /// Builds a record from a fresh token set. Expiry is taken from the
    /// provider-asserted lifetime, counted from `now`.
    pub fn new(user: UserIdentity, tokens: &TokenSet, now: i64) -> Self {
        Self {
            user,
            access_token: tokens.access_token.clone(),
            id_token: tokens.id_token.clone(),
            expires_at: now.saturating_add(tokens.expires_in_seconds),
        }
    }

    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of verifying a session token.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionVerification {
    Valid(SessionRecord),
    Invalid,
}

impl SessionVerification {
    pub fn into_record(self) -> Option<SessionRecord> {
        match self {
            SessionVerification::Valid(record) => Some(record),
            SessionVerification::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SessionVerification::Valid(_))
    }
}

/// Signs and verifies session tokens with a symmetric secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionCodec {
    const ALGORITHM: Algorithm = Algorithm::HS256;

    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Self::ALGORITHM);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Builds a codec from the configured session secret.
    ///
    /// Fails when running in production without a configured secret.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret = config.session_secret()?;
        Ok(Self::new(&secret))
    }

    /// Signs `record`, stamping `iat` with the current time and `exp` with
    /// `record.expires_at`.
    pub fn encode(&self, record: &SessionRecord) -> Result<String, Error> {
        self.encode_at(record, Utc::now().timestamp())
    }

    /// Like [`SessionCodec::encode`] with an explicit issue time, so callers can
    /// derive `expires_at` and `iat` from the same clock reading.
    pub fn encode_at(&self, record: &SessionRecord, issued_at: i64) -> Result<String, Error> {
        let claims = SessionClaims::new(record.clone(), issued_at);
        let token = encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verifies signature and expiry. Never fails loudly: malformed, forged and
    /// expired tokens all come back as [`SessionVerification::Invalid`].
    pub fn decode(&self, token: &str) -> SessionVerification {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.record.is_expired(Utc::now().timestamp()) => {
                SessionVerification::Valid(data.claims.record)
            }
            Ok(data) => {
                debug!(
                    "Session for subject {} expired at {}",
                    data.claims.record.user.sub, data.claims.record.expires_at
                );
                SessionVerification::Invalid
            }
            Err(e) => {
                debug!("Rejected session token: {:?}", e.kind());
                SessionVerification::Invalid
            }
        }
    }
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("algorithm", &Self::ALGORITHM)
            .finish_non_exhaustive()
    }
}
