//! Adapters for the two external collaborators: the prompt store holding
//! the live system prompt, and the repository of operator feedback.

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use memory::*;

#[cfg(feature = "http")]
pub use http::*;

use crate::error::Result;
use crate::schema::FeedbackRecord;
use async_trait::async_trait;

#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Identifies the document this store holds. Updates to the same
    /// target are serialized.
    fn target(&self) -> String;

    async fn get(&self) -> Result<String>;

    async fn set(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// All `bad` feedback records, in no particular order.
    async fn list_negative_feedback(&self) -> Result<Vec<FeedbackRecord>>;
}
