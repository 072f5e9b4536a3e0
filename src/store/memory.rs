use crate::error::{PromptSyncError, Result};
use crate::schema::{FeedbackRecord, Verdict};
use crate::store::{FeedbackRepository, PromptStore};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Prompt store kept in process memory. Records every write and can be
/// told to fail the next few calls.
#[derive(Debug)]
pub struct MemoryPromptStore {
    target: String,
    state: Mutex<MemoryPromptState>,
}

#[derive(Debug, Default)]
struct MemoryPromptState {
    text: String,
    writes: Vec<String>,
    get_failures: usize,
    set_failures: usize,
}

impl MemoryPromptStore {
    pub fn new(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: Mutex::new(MemoryPromptState {
                text: text.into(),
                ..Default::default()
            }),
        }
    }

    /// Makes the next `count` reads fail with a transient error.
    pub async fn fail_next_gets(&self, count: usize) {
        self.state.lock().await.get_failures = count;
    }

    /// Makes the next `count` writes fail with a transient error.
    pub async fn fail_next_sets(&self, count: usize) {
        self.state.lock().await.set_failures = count;
    }

    pub async fn text(&self) -> String {
        self.state.lock().await.text.clone()
    }

    /// Every text passed to a successful `set`, in order.
    pub async fn writes(&self) -> Vec<String> {
        self.state.lock().await.writes.clone()
    }
}

#[async_trait]
impl PromptStore for MemoryPromptStore {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn get(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.get_failures > 0 {
            state.get_failures -= 1;
            return Err(PromptSyncError::Store {
                status: Some(503),
                message: "prompt store unavailable".to_string(),
            });
        }
        Ok(state.text.clone())
    }

    async fn set(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.set_failures > 0 {
            state.set_failures -= 1;
            return Err(PromptSyncError::Store {
                status: Some(503),
                message: "prompt store unavailable".to_string(),
            });
        }
        state.text = text.to_string();
        state.writes.push(text.to_string());
        Ok(())
    }
}

/// Feedback repository over a fixed list of records.
#[derive(Debug, Default)]
pub struct MemoryFeedbackRepository {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryFeedbackRepository {
    pub fn new(records: Vec<FeedbackRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub async fn push(&self, record: FeedbackRecord) {
        self.records.lock().await.push(record);
    }

    /// Deletes every record for a request, as an operator removing
    /// feedback would.
    pub async fn remove(&self, request_id: &str) {
        self.records
            .lock()
            .await
            .retain(|r| r.request_id != request_id);
    }
}

#[async_trait]
impl FeedbackRepository for MemoryFeedbackRepository {
    async fn list_negative_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.verdict == Verdict::Bad)
            .cloned()
            .collect())
    }
}
