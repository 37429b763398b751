pub mod config;
pub mod data;
pub mod mode;
pub mod policy;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use pomobell_core::storage::{Database, KeyValueStore};

/// The per-user store under the data directory.
pub(crate) fn open_store() -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(Database::open()?))
}
