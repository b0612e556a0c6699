pub mod json;
#[cfg(test)]
pub mod memory;

use tracing::{error, warn};

use crate::app::PersistenceError;
use crate::domain::VersionRecord;

pub use json::JsonStateStore;

/// Everything the engine persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub versions: VersionRecord,
    /// `None` when no destination list has ever been written.
    pub destinations: Option<Vec<String>>,
}

pub trait StateStore {
    fn load(&self) -> Result<PersistedState, PersistenceError>;
    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// Loads persisted state, degrading to an empty state on any failure.
pub fn load_or_default(store: &(dyn StateStore + Send + Sync)) -> PersistedState {
    match store.load() {
        Ok(state) => state,
        Err(e @ PersistenceError::CorruptSchema(_)) => {
            warn!("Discarding unreadable state: {}", e);
            PersistedState::default()
        }
        Err(e) => {
            error!("Failed to load state, starting empty: {}", e);
            PersistedState::default()
        }
    }
}
