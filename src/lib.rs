pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::ServerConfig;
use storage::Storage;
use tasks::TaskStorage;

/// Shared application state passed to every HTTP handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<Storage>,
    /// Task and genre queries over the shared SQLite pool.
    pub task_storage: Arc<TaskStorage>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire up the context from a loaded config and an opened storage layer.
    pub fn new(config: Arc<ServerConfig>, storage: Arc<Storage>) -> Self {
        let task_storage = Arc::new(TaskStorage::new(storage.pool()));
        Self {
            config,
            storage,
            task_storage,
            started_at: std::time::Instant::now(),
        }
    }
}
