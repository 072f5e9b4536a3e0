use crate::error::{PromptSyncError, Result};
use crate::schema::DocumentFormat;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

pub const PROMPT_API_URL: &str = "PROMPT_API_URL";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const PROMPT_FORMAT_PATH: &str = "PROMPT_FORMAT_PATH";

/// Where the prompt and the feedback live, plus the document format.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub prompt_api_url: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub format: DocumentFormat,
}

impl RemoteConfig {
    /// Reads the process environment, after loading a `.env` file if one
    /// exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PromptSyncError::Config(format!("{} is not set", key)))
        };

        let format = match vars.get(PROMPT_FORMAT_PATH).filter(|p| !p.trim().is_empty()) {
            Some(path) => load_format(Path::new(path.trim()))?,
            None => DocumentFormat::default(),
        };

        Ok(Self {
            prompt_api_url: required(PROMPT_API_URL)?,
            supabase_url: required(SUPABASE_URL)?,
            supabase_key: required(SUPABASE_ANON_KEY)?,
            format,
        })
    }
}

pub fn load_format(path: &Path) -> Result<DocumentFormat> {
    debug!("Loading document format from {}", path.display());
    let source = std::fs::read_to_string(path)?;
    DocumentFormat::from_toml_str(&source)
}
