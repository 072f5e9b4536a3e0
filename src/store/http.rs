use crate::error::{PromptSyncError, Result};
use crate::ingestion::{join_feedback_rows, AdminFeedbackRow, ChatRow};
use crate::schema::FeedbackRecord;
use crate::store::{FeedbackRepository, PromptStore};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

const SYSTEM_PROMPT_PATH: &str = "system-prompt";

#[derive(Debug, Serialize, Deserialize)]
struct PromptPayload {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PromptRow {
    #[serde(default)]
    prompt_text: Option<String>,
}

async fn check_status(res: Response, what: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let error_text = res.text().await.unwrap_or_default();
    Err(PromptSyncError::Store {
        status: Some(status.as_u16()),
        message: format!("{} failed: {}", what, error_text),
    })
}

/// The prompt API that fronts the assistant's live system prompt:
/// `GET`/`POST {base_url}/system-prompt` with a `{"content": ...}` body.
#[derive(Clone)]
pub struct HttpPromptStore {
    client: Client,
    base_url: String,
}

impl HttpPromptStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, SYSTEM_PROMPT_PATH)
    }
}

#[async_trait]
impl PromptStore for HttpPromptStore {
    fn target(&self) -> String {
        self.url()
    }

    async fn get(&self) -> Result<String> {
        let res = self.client.get(self.url()).send().await?;
        let res = check_status(res, "System prompt fetch").await?;
        let payload: PromptPayload = res.json().await?;
        debug!("Fetched system prompt ({} bytes)", payload.content.len());
        Ok(payload.content)
    }

    async fn set(&self, text: &str) -> Result<()> {
        let res = self
            .client
            .post(self.url())
            .json(&json!({ "content": text }))
            .send()
            .await?;
        check_status(res, "System prompt update").await?;
        debug!("Saved system prompt ({} bytes)", text.len());
        Ok(())
    }
}

/// Connection details shared by the Supabase adapters.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let res = self
            .authorize(self.client.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;
        let res = check_status(res, &format!("Select from {}", table)).await?;
        Ok(res.json().await?)
    }

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<()> {
        let res = self
            .authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        check_status(res, &format!("Insert into {}", table)).await?;
        Ok(())
    }
}

/// Prompt history kept as rows of a `prompts` table; the newest row is the
/// live prompt and every save inserts a new row.
#[derive(Clone)]
pub struct SupabasePromptStore {
    supabase: SupabaseClient,
    table: String,
}

impl SupabasePromptStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            supabase,
            table: "prompts".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

#[async_trait]
impl PromptStore for SupabasePromptStore {
    fn target(&self) -> String {
        self.supabase.table_url(&self.table)
    }

    async fn get(&self) -> Result<String> {
        let rows: Vec<PromptRow> = self
            .supabase
            .select(
                &self.table,
                &[
                    ("select", "prompt_text".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.prompt_text)
            .unwrap_or_default())
    }

    async fn set(&self, text: &str) -> Result<()> {
        self.supabase
            .insert(&self.table, json!({ "prompt_text": text }))
            .await
    }
}

/// Negative feedback from the `admin_feedback` table, joined with
/// `chat_data` for the user message each answer responded to.
#[derive(Clone)]
pub struct SupabaseFeedbackRepository {
    supabase: SupabaseClient,
}

impl SupabaseFeedbackRepository {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl FeedbackRepository for SupabaseFeedbackRepository {
    async fn list_negative_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        let rows: Vec<AdminFeedbackRow> = self
            .supabase
            .select(
                "admin_feedback",
                &[
                    ("select", "*".to_string()),
                    ("feedback_verdict", "eq.bad".to_string()),
                ],
            )
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows
            .iter()
            .map(|r| format!("\"{}\"", r.request_id.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        let chats: Vec<ChatRow> = self
            .supabase
            .select(
                "chat_data",
                &[
                    ("select", "request_id,input_text".to_string()),
                    ("request_id", format!("in.({})", ids)),
                ],
            )
            .await?;

        debug!(
            "Loaded {} negative feedback rows and {} chat rows",
            rows.len(),
            chats.len()
        );
        Ok(join_feedback_rows(rows, &chats))
    }
}
