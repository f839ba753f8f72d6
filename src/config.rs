//! Tap configuration
//!
//! The configuration file is JSON (the Singer convention) or YAML, chosen by
//! file extension. Only `api_key` is required; everything else has a default
//! tuned to the limits the Insightly API enforces in practice.

use crate::error::{Error, Result};
use crate::types::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.insightly.com/v3.1/";

/// Runtime configuration for a tap run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// API key, sent as the Basic-auth username with an empty password
    #[serde(default)]
    pub api_key: String,

    /// API root all endpoints are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token-bucket rate (and ceiling), in requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum number of simultaneously in-flight requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Rows requested per page (`top`)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum characters kept in a note's BODY
    #[serde(default = "default_note_body_limit")]
    pub note_body_limit: usize,

    /// JSON-encode the note BODY after truncation
    #[serde(default)]
    pub escape_note_body: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Reaction to a failed resource worker
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_requests_per_second() -> u32 {
    // The API documents 10/s but rejects anything above ~5/s with a 429
    4
}

fn default_max_concurrency() -> usize {
    4
}

fn default_page_size() -> u32 {
    500
}

fn default_note_body_limit() -> usize {
    // Redshift caps a column at 1k characters
    900
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tap-insightly/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
            max_concurrency: default_max_concurrency(),
            page_size: default_page_size(),
            note_body_limit: default_note_body_limit(),
            escape_note_body: false,
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl TapConfig {
    /// Create a config with the given API key and defaults for everything else
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load and validate a config file (JSON, or YAML for `.yaml`/`.yml`)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::missing_field("api_key"));
        }
        if self.requests_per_second == 0 {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than zero",
            ));
        }
        if self.max_concurrency == 0 {
            return Err(Error::invalid_value(
                "max_concurrency",
                "must be greater than zero",
            ));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
