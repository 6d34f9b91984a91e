//! Configuration management for the client.

use std::env;
use std::path::PathBuf;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the todo API, without a trailing slash
    pub api_url: String,
    /// Bearer token attached to every request, if one was issued
    pub auth_token: Option<String>,
    /// Directory holding the durable todo cache
    pub cache_dir: PathBuf,
    /// List to select at startup when no last-active list is recorded
    pub initial_list: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `TALLY_API_URL` is required; `TALLY_AUTH_TOKEN`, `TALLY_CACHE_DIR`
    /// (default `.tally-cache`) and `TALLY_LIST` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("TALLY_API_URL").map_err(|_| ConfigError::MissingApiUrl)?;
        if api_url.is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let auth_token = env::var("TALLY_AUTH_TOKEN").ok().filter(|t| !t.is_empty());
        let cache_dir = env::var("TALLY_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".tally-cache"));
        let initial_list = env::var("TALLY_LIST").ok().filter(|l| !l.is_empty());

        Ok(Self {
            api_url,
            auth_token,
            cache_dir,
            initial_list,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TALLY_API_URL environment variable is required")]
    MissingApiUrl,

    #[error("TALLY_API_URL must start with http:// or https://, got: {0}")]
    InvalidApiUrl(String),
}
