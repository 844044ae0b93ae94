//! Process-wide table mapping a canonical database path to its single
//! live [`Coordinator`], so every handle opened against the same file
//! shares one background-notifier pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::trace;

use crate::config::DbConfig;
use crate::error::Result;
use crate::storage::StorageEngine;

use super::Coordinator;

static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Weak<Coordinator>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Looks up or creates the coordinator for `config.path`.
pub struct CoordinatorRegistry;

impl CoordinatorRegistry {
    /// Returns the coordinator already registered for this path if one is
    /// still alive, otherwise opens a fresh one via `make_storage` and
    /// registers it.
    pub fn get_or_create(
        config: DbConfig,
        make_storage: impl FnOnce() -> Result<Arc<dyn StorageEngine>>,
    ) -> Result<Arc<Coordinator>> {
        let path = config.path.clone();
        let mut table = REGISTRY.lock();
        if let Some(existing) = table.get(&path).and_then(Weak::upgrade) {
            trace!(path = %path.display(), "reusing existing coordinator");
            existing.config().reconcile(&config)?;
            return Ok(existing);
        }
        let storage = make_storage()?;
        let coordinator = Coordinator::open_database(config, storage)?;
        table.insert(path, Arc::downgrade(&coordinator));
        Ok(coordinator)
    }

    /// Drops the entry for `path`, if present. Called when the last handle
    /// against a file closes; harmless if the coordinator is already gone.
    pub fn forget(path: &Path) {
        REGISTRY.lock().remove(path);
    }

    #[cfg(test)]
    pub(crate) fn registered_count() -> usize {
        REGISTRY.lock().len()
    }
}
