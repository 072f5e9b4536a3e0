use crate::schema::{FeedbackRecord, Verdict};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A row of the `admin_feedback` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminFeedbackRow {
    #[serde(default)]
    pub id: Option<i64>,
    pub request_id: String,
    pub feedback_verdict: Verdict,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub corrected_response: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub prompt_apply: Option<bool>,
}

/// The columns of a `chat_data` row needed to recover the user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRow {
    pub request_id: String,
    #[serde(default)]
    pub input_text: Option<String>,
}

/// Joins feedback rows with their chat rows on `request_id`.
///
/// Rows whose `created_at` cannot be parsed sort first (Unix epoch).
pub fn join_feedback_rows(feedback: Vec<AdminFeedbackRow>, chats: &[ChatRow]) -> Vec<FeedbackRecord> {
    let inputs: HashMap<&str, &str> = chats
        .iter()
        .filter_map(|c| c.input_text.as_deref().map(|t| (c.request_id.as_str(), t)))
        .collect();

    feedback
        .into_iter()
        .map(|row| {
            let created_at = row
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(|| {
                    warn!(
                        "Feedback {} has no usable created_at ({:?}); ordering it first",
                        row.request_id, row.created_at
                    );
                    DateTime::<Utc>::UNIX_EPOCH
                });

            FeedbackRecord {
                original_user_message: inputs.get(row.request_id.as_str()).map(|s| s.to_string()),
                request_id: row.request_id,
                verdict: row.feedback_verdict,
                feedback_text: row.feedback_text,
                corrected_response: row.corrected_response,
                created_at,
                prompt_apply: row.prompt_apply.unwrap_or(true),
            }
        })
        .collect()
}

/// Accepts RFC 3339 and the offset-less form PostgREST returns for
/// `timestamp` columns.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
