use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use super::{PersistenceAdapter, StoreError};
use crate::schema::{FeedbackSnapshot, SelectionRecord};

const HISTORY_FILE: &str = "history.jsonl";
const FEEDBACK_FILE: &str = "feedback.json";

/// File-backed adapter.
///
/// ```text
/// <root>/users/<sha256(user_id)>/history.jsonl   one SelectionRecord per line
/// <root>/users/<sha256(user_id)>/feedback.json   FeedbackSnapshot
/// ```
///
/// User ids are hashed so arbitrary ids never reach the filesystem as path
/// components.  Every save rewrites the whole file through a `.tmp` sibling
/// followed by an atomic rename.
#[derive(Debug, Clone)]
pub struct JsonlAdapter {
    root: PathBuf,
}

impl JsonlAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        self.root.join("users").join(format!("{digest:x}"))
    }
}

#[async_trait]
impl PersistenceAdapter for JsonlAdapter {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn load_history(&self, user_id: &str) -> Result<Vec<SelectionRecord>, StoreError> {
        let path = self.user_dir(user_id).join(HISTORY_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        let mut corrupt_count = 0usize;
        for (line_idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SelectionRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    corrupt_count += 1;
                    tracing::warn!(
                        line = line_idx + 1,
                        error = %err,
                        path = %path.display(),
                        "corrupt history record, skipping line"
                    );
                }
            }
        }

        if corrupt_count > 0 {
            tracing::warn!(
                corrupt_lines = corrupt_count,
                path = %path.display(),
                "history loaded with skipped corrupt lines"
            );
        }
        Ok(records)
    }

    async fn save_history(&self, user_id: &str, records: &[SelectionRecord]) -> Result<(), StoreError> {
        let mut body = Vec::new();
        for record in records {
            serde_json::to_writer(&mut body, record)?;
            body.push(b'\n');
        }
        write_atomic(&self.user_dir(user_id).join(HISTORY_FILE), &body).await
    }

    async fn load_feedback(&self, user_id: &str) -> Result<FeedbackSnapshot, StoreError> {
        let path = self.user_dir(user_id).join(FEEDBACK_FILE);
        match tokio::fs::read(&path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FeedbackSnapshot::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_feedback(&self, user_id: &str, feedback: &FeedbackSnapshot) -> Result<(), StoreError> {
        write_atomic(&self.user_dir(user_id).join(FEEDBACK_FILE), &to_pretty(feedback)?).await
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    Ok(body)
}

/// Write `body` to a `.tmp` sibling, fsync, then rename over `path`.  A crash
/// before the rename leaves the previous file untouched; the `.tmp` file is
/// removed on any error path.
async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "state".to_string());
        path.with_file_name(format!("{filename}.tmp"))
    };

    let write_result: Result<(), StoreError> = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await?;
        file.write_all(body).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
    .await;

    if let Err(err) = write_result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err);
    }

    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }

    Ok(())
}
