use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::ingest::{IngestOptions, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// YouTube Data API key; the YOUTUBE_API_KEY environment variable wins
    /// over the config file.
    pub api_key: Option<String>,

    #[serde(default = "default_max_comments")]
    pub max_comments_per_video: u32,

    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yt-harvest");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("harvest.db").to_string_lossy().to_string()
}

fn default_max_comments() -> u32 {
    // One smallest practical comment page per video keeps run time bounded.
    5
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_retry_attempts() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_key: None,
            max_comments_per_video: default_max_comments(),
            concurrency_limit: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yt-harvest")
            .join("config.toml")
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_comments_per_video: self.max_comments_per_video,
            concurrency_limit: self.concurrency_limit.max(1),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.retry_attempts.max(1),
                ..RetryPolicy::default()
            },
        }
    }
}
