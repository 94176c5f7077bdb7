//! Application Configuration
//!
//! Environment-driven configuration, loaded once at startup (after dotenvy
//! has populated the environment from `.env`) and passed by reference into
//! everything that needs it.

use std::path::PathBuf;

/// Application configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Groq API key. `None` means synthesis runs in fallback mode.
    pub groq_api_key: Option<String>,
    /// Groq model identifier.
    pub groq_model: String,
    /// Override for the Groq chat completions endpoint.
    pub groq_base_url: Option<String>,
    /// Directory holding the chunk store database.
    pub data_dir: PathBuf,
    /// Directory scanned for source documents by `ingest`.
    pub raw_docs_dir: PathBuf,
    /// Base URL of the operations state/audit service.
    pub ops_api_url: String,
    /// Operator name attached to approved actions.
    pub operator: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: "openai/gpt-oss-20b".to_string(),
            groq_base_url: None,
            data_dir: PathBuf::from("data"),
            raw_docs_dir: PathBuf::from("data/raw"),
            ops_api_url: "http://localhost:8001".to_string(),
            operator: "demo_user".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            groq_api_key: env_opt("GROQ_API_KEY"),
            groq_model: env_or("GROQ_MODEL", defaults.groq_model),
            groq_base_url: env_opt("GROQ_BASE_URL"),
            data_dir: env_opt("COPILOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            raw_docs_dir: env_opt("RAW_DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.raw_docs_dir),
            ops_api_url: env_or("OPS_API_URL", defaults.ops_api_url),
            operator: env_or("OPERATOR_NAME", defaults.operator),
        }
    }

    /// Path of the SQLite chunk store.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("copilot.db")
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}
