use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptSyncError {
    /// A required section anchor is missing. The document is never
    /// reinterpreted in this case and nothing is written back.
    #[error("Prompt structure error: {section} section anchor '{anchor}' not found")]
    Structure {
        section: &'static str,
        anchor: String,
    },

    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Store request failed{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Store { status: Option<u16>, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PromptSyncError {
    pub fn is_structure_error(&self) -> bool {
        matches!(self, PromptSyncError::Structure { .. })
    }

    /// Whether retrying the same store call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PromptSyncError::Store { status: None, .. } => true,
            PromptSyncError::Store {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            #[cfg(feature = "http")]
            PromptSyncError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptSyncError>;
