//! CSRF `state` parameter generation for OAuth flows.
//!
//! The value is opaque to the provider and round-tripped through the
//! authorization redirect. Storing it until the callback is the caller's job.

use rand::{rngs::OsRng, RngCore};

/// Generate a cryptographically random state token (256 bits, hex encoded).
pub fn generate_state() -> String {
    let mut random_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut random_bytes);
    hex::encode(random_bytes)
}
