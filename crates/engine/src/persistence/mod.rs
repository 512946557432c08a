//! Per-user key-value persistence behind a swappable adapter.
//!
//! The engine only relies on read-your-writes within one process; each
//! adapter picks its own storage layout.

mod embedded;
mod jsonl;
mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uplift_config::{StorageBackend, StorageConfig};

use crate::schema::{FeedbackSnapshot, SelectionRecord};

pub use embedded::RedbAdapter;
pub use jsonl::JsonlAdapter;
pub use memory::MemoryAdapter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] redb::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

macro_rules! redb_error {
    ($($ty:ty),+ $(,)?) => {
        $(impl From<$ty> for StoreError {
            fn from(err: $ty) -> Self {
                Self::Database(err.into())
            }
        })+
    };
}

redb_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Storage seam for the per-user bounded stores.
///
/// Missing users load as empty history / empty feedback; records are
/// created lazily on first save.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Short backend name for log lines.
    fn name(&self) -> &'static str;

    async fn load_history(&self, user_id: &str) -> Result<Vec<SelectionRecord>, StoreError>;

    async fn save_history(&self, user_id: &str, records: &[SelectionRecord]) -> Result<(), StoreError>;

    async fn load_feedback(&self, user_id: &str) -> Result<FeedbackSnapshot, StoreError>;

    async fn save_feedback(&self, user_id: &str, feedback: &FeedbackSnapshot) -> Result<(), StoreError>;
}

/// Build the adapter selected in `[storage]`.
pub fn open_adapter(config: &StorageConfig) -> Result<Arc<dyn PersistenceAdapter>> {
    let adapter: Arc<dyn PersistenceAdapter> = match config.backend {
        StorageBackend::Jsonl => Arc::new(JsonlAdapter::new(&config.path)),
        StorageBackend::Redb => Arc::new(RedbAdapter::open(config.redb_file())?),
        StorageBackend::Memory => Arc::new(MemoryAdapter::default()),
    };
    info!(backend = adapter.name(), path = %config.path, "persistence adapter ready");
    Ok(adapter)
}
