//! Client Cache (lazy loader)
//!
//! Defers construction of the [`GenerationClient`] until first use and
//! memoizes a single instance. The cache is an explicit owned object handed
//! out by the composition root rather than an ambient global, so its lifetime
//! is visible and injectable.

use std::sync::{Arc, RwLock};

use tracing::debug;

use super::client::GenerationClient;
use crate::config::LlmConfig;
use crate::types::Result;

/// Process-wide optional handle to a constructed client.
///
/// The first `get_or_init` call constructs and memoizes; later calls return
/// the same instance and ignore their config argument.
#[derive(Default)]
pub struct ClientCache {
    slot: RwLock<Option<Arc<GenerationClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized client, constructing it on first use.
    ///
    /// `config` is only honored on the first call.
    pub fn get_or_init(&self, config: &LlmConfig) -> Result<Arc<GenerationClient>> {
        if let Some(client) = self.read_slot() {
            return Ok(client);
        }

        let mut slot = self.slot.write().unwrap_or_else(|poisoned| {
            tracing::error!("Client cache lock poisoned, recovering");
            poisoned.into_inner()
        });

        // Another caller may have initialized while we waited for the lock
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        debug!(model = %config.model, "Constructing generation client");
        let client = Arc::new(GenerationClient::new(config)?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Whether a client has been constructed
    pub fn is_initialized(&self) -> bool {
        self.read_slot().is_some()
    }

    /// Clear the memoized instance.
    ///
    /// Test-isolation support; production code paths never call this.
    pub fn reset(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| {
            tracing::error!("Client cache lock poisoned, recovering");
            poisoned.into_inner()
        });
        *slot = None;
    }

    fn read_slot(&self) -> Option<Arc<GenerationClient>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Client cache lock poisoned, recovering");
                poisoned.into_inner()
            })
            .clone()
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
