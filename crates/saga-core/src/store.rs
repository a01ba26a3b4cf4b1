//! Persistence seam for adventure documents.
//!
//! The core never assumes a storage technology; it only requires that a
//! read returns the latest write and that writes from one turn land before
//! the next turn's read. Hosts implement [`AdventureStore`] over whatever
//! they persist to; [`MemoryStore`] backs tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::document::AdventureState;

/// Narrow interface to the external persistence collaborator.
pub trait AdventureStore: Send + Sync {
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    fn load(&self, adventure_id: &str) -> Result<Option<AdventureState>>;

    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    fn save(&self, adventure_id: &str, state: &AdventureState) -> Result<()>;
}

/// In-memory store for tests and hosts without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, AdventureState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AdventureState>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdventureStore for MemoryStore {
    fn load(&self, adventure_id: &str) -> Result<Option<AdventureState>> {
        Ok(self.lock().get(adventure_id).cloned())
    }

    fn save(&self, adventure_id: &str, state: &AdventureState) -> Result<()> {
        self.lock()
            .insert(adventure_id.to_string(), state.clone());
        Ok(())
    }
}
