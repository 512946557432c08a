use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PersistenceAdapter, StoreError};
use crate::schema::{FeedbackSnapshot, SelectionRecord};

/// In-process adapter.  Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    history: Mutex<HashMap<String, Vec<SelectionRecord>>>,
    feedback: Mutex<HashMap<String, FeedbackSnapshot>>,
}

impl MemoryAdapter {
    /// Number of users with any persisted state.
    pub async fn user_count(&self) -> usize {
        let history = self.history.lock().await;
        let feedback = self.feedback.lock().await;
        history
            .keys()
            .chain(feedback.keys().filter(|k| !history.contains_key(*k)))
            .count()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_history(&self, user_id: &str) -> Result<Vec<SelectionRecord>, StoreError> {
        Ok(self.history.lock().await.get(user_id).cloned().unwrap_or_default())
    }

    async fn save_history(&self, user_id: &str, records: &[SelectionRecord]) -> Result<(), StoreError> {
        self.history
            .lock()
            .await
            .insert(user_id.to_string(), records.to_vec());
        Ok(())
    }

    async fn load_feedback(&self, user_id: &str) -> Result<FeedbackSnapshot, StoreError> {
        Ok(self.feedback.lock().await.get(user_id).cloned().unwrap_or_default())
    }

    async fn save_feedback(&self, user_id: &str, feedback: &FeedbackSnapshot) -> Result<(), StoreError> {
        self.feedback
            .lock()
            .await
            .insert(user_id.to_string(), feedback.clone());
        Ok(())
    }
}
