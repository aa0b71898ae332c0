//! Transient storage for the values that bind a callback to its login attempt.

use crate::error::Error;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// The verifier and state issued with one authorization request.
///
/// Single use: consumed by exactly one callback and cleared afterwards whether
/// or not the callback succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    pub state: String,
    pub code_verifier: String,
}

/// Request-scoped key-value storage for an [`AuthorizationContext`].
///
/// The web layer backs this with short-lived cookies; tests use
/// [`MemoryContextStore`]. A server-side store keyed by a browser identifier
/// fits the same interface.
#[async_trait]
pub trait AuthorizationContextStore: Send + Sync {
    async fn store(&self, context: AuthorizationContext) -> Result<(), Error>;

    /// Returns the stored context, or `None` when either half is missing.
    async fn retrieve(&self) -> Result<Option<AuthorizationContext>, Error>;

    async fn clear(&self) -> Result<(), Error>;
}

/// In-memory store holding a single context, one instance per user agent.
#[derive(Debug, Default)]
pub struct MemoryContextStore {
    slot: Mutex<Option<AuthorizationContext>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: AuthorizationContext) -> Self {
        Self {
            slot: Mutex::new(Some(context)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[async_trait]
impl AuthorizationContextStore for MemoryContextStore {
    async fn store(&self, context: AuthorizationContext) -> Result<(), Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(context);
        Ok(())
    }

    async fn retrieve(&self) -> Result<Option<AuthorizationContext>, Error> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
