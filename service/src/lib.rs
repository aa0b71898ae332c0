//! Infrastructure shared by every layer of the relying party: runtime configuration
//! and process-wide logging.

pub mod config;
pub mod logging;
