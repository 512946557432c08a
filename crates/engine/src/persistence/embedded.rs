//! [`redb`]-backed adapter: one embedded database for all users.
//!
//! # Tables
//!
//! | Name       | Key            | Value                                  |
//! |------------|----------------|----------------------------------------|
//! | `history`  | user id (&str) | JSON array of [`SelectionRecord`]      |
//! | `feedback` | user id (&str) | JSON [`FeedbackSnapshot`]              |
//!
//! Each save is a single write transaction, so a user's list is replaced
//! atomically.  Transactions run on tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;

use super::{PersistenceAdapter, StoreError};
use crate::schema::{FeedbackSnapshot, SelectionRecord};

type UserTable = TableDefinition<'static, &'static str, &'static [u8]>;

const HISTORY_TABLE: UserTable = TableDefinition::new("history");
const FEEDBACK_TABLE: UserTable = TableDefinition::new("feedback");

pub struct RedbAdapter {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbAdapter {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)
            .with_context(|| format!("opening redb store at {}", path.display()))?;

        // Ensure tables exist.
        {
            let tx = db.begin_write()?;
            tx.open_table(HISTORY_TABLE)?;
            tx.open_table(FEEDBACK_TABLE)?;
            tx.commit()?;
        }

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of users with a stored history.
    pub fn history_users(&self) -> Result<usize, StoreError> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(HISTORY_TABLE)?;
        Ok(tbl.len()? as usize)
    }

    /// Run a transaction on the blocking pool; commits fsync and must not
    /// stall a runtime worker.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|err| StoreError::Unavailable(format!("redb task failed: {err}")))?
    }

    async fn get<T>(&self, table: UserTable, user_id: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let user_id = user_id.to_string();
        self.blocking(move |db| {
            let tx = db.begin_read()?;
            let tbl = tx.open_table(table)?;
            let Some(guard) = tbl.get(user_id.as_str())? else {
                return Ok(T::default());
            };
            let value = serde_json::from_slice(guard.value())?;
            Ok(value)
        })
        .await
    }

    async fn put(&self, table: UserTable, user_id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| {
            let tx = db.begin_write()?;
            {
                let mut tbl = tx.open_table(table)?;
                tbl.insert(user_id.as_str(), bytes.as_slice())?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PersistenceAdapter for RedbAdapter {
    fn name(&self) -> &'static str {
        "redb"
    }

    async fn load_history(&self, user_id: &str) -> Result<Vec<SelectionRecord>, StoreError> {
        self.get(HISTORY_TABLE, user_id).await
    }

    async fn save_history(&self, user_id: &str, records: &[SelectionRecord]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(records)?;
        self.put(HISTORY_TABLE, user_id, bytes).await
    }

    async fn load_feedback(&self, user_id: &str) -> Result<FeedbackSnapshot, StoreError> {
        self.get(FEEDBACK_TABLE, user_id).await
    }

    async fn save_feedback(&self, user_id: &str, feedback: &FeedbackSnapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(feedback)?;
        self.put(FEEDBACK_TABLE, user_id, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::schema::{Category, Mood};

    #[tokio::test]
    async fn round_trip_per_user() {
        let dir = TempDir::new().unwrap();
        let adapter = RedbAdapter::open(dir.path().join("state.redb")).unwrap();
        let records = vec![SelectionRecord {
            message: "Rest well.".to_string(),
            category: Category::Sleep,
            mood: Mood::Peaceful,
            time: Utc::now(),
        }];
        adapter.save_history("u1", &records).await.unwrap();
        assert_eq!(adapter.load_history("u1").await.unwrap(), records);
        assert!(adapter.load_history("u2").await.unwrap().is_empty());
        assert_eq!(adapter.history_users().unwrap(), 1);

        let feedback = FeedbackSnapshot {
            liked: vec![],
            disliked: vec!["too loud".into()],
        };
        adapter.save_feedback("u2", &feedback).await.unwrap();
        assert_eq!(adapter.load_feedback("u2").await.unwrap(), feedback);
        assert_eq!(adapter.load_feedback("u1").await.unwrap(), FeedbackSnapshot::default());
    }

    #[tokio::test]
    async fn reopen_sees_committed_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.redb");
        {
            let adapter = RedbAdapter::open(&path).unwrap();
            adapter
                .save_feedback(
                    "u1",
                    &FeedbackSnapshot {
                        liked: vec!["a".into()],
                        disliked: vec![],
                    },
                )
                .await
                .unwrap();
        }
        let adapter = RedbAdapter::open(&path).unwrap();
        assert_eq!(adapter.load_feedback("u1").await.unwrap().liked, vec!["a"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transactions_do_not_block_the_runtime() {
        let dir = TempDir::new().unwrap();
        let adapter = Arc::new(RedbAdapter::open(dir.path().join("state.redb")).unwrap());
        let writes = (0..8).map(|n| {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move {
                let feedback = FeedbackSnapshot {
                    liked: vec![format!("note {n}")],
                    disliked: vec![],
                };
                adapter.save_feedback(&format!("u{n}"), &feedback).await
            })
        });
        for write in writes.collect::<Vec<_>>() {
            write.await.unwrap().unwrap();
        }
        assert_eq!(adapter.load_feedback("u7").await.unwrap().liked, vec!["note 7"]);
    }

    #[tokio::test]
    async fn open_adapter_puts_database_inside_state_dir() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        // A jsonl tree already occupies the state directory.
        std::fs::create_dir_all(state.join("users")).unwrap();
        let config = uplift_config::StorageConfig {
            backend: uplift_config::StorageBackend::Redb,
            path: state.to_string_lossy().into_owned(),
        };
        let adapter = super::super::open_adapter(&config).unwrap();
        adapter.save_history("u1", &[]).await.unwrap();
        assert!(state.join(uplift_config::REDB_FILE_NAME).is_file());
    }
}
