//! Claims carried by a signed session token.
//!
//! The token body is the session record itself plus the registered `iat` and
//! `exp` claims. `exp` always equals the record's `expiresAt` so the container
//! expires together with the provider-asserted access token lifetime.

use serde::{Deserialize, Serialize};

use super::SessionRecord;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SessionClaims {
    #[serde(flatten)]
    pub(crate) record: SessionRecord,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

impl SessionClaims {
    pub(crate) fn new(record: SessionRecord, issued_at: i64) -> Self {
        let exp = record.expires_at;
        Self {
            record,
            iat: issued_at,
            exp,
        }
    }
}
