// SPDX-License-Identifier: MIT

//! Watcher settings
//!
//! Settings come from built-in defaults, an optional YAML file, the
//! environment, and finally explicit command line options, in that order.

use super::error::{PastegoError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_FEED_URL: &str = "https://pastebin.com/api_scraping.php";

/// Largest listing the scraping API hands out in one call
pub const MAX_LIMIT: u32 = 250;

/// Environment variable overriding the feed URL
pub const FEED_URL_ENV: &str = "PASTEGO_FEED_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Comma-separated search alternatives
    pub search: String,
    /// Directory matches are saved into
    pub output_dir: String,
    pub case_insensitive: bool,
    /// Seconds between polling cycles
    pub interval_secs: u64,
    /// Pastes requested per listing
    pub limit: u32,
    pub feed_url: String,
    pub request_timeout_secs: u64,
    /// Item bodies fetched at once
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: "pass".to_string(),
            output_dir: "results".to_string(),
            case_insensitive: false,
            interval_secs: 150,
            limit: MAX_LIMIT,
            feed_url: DEFAULT_FEED_URL.to_string(),
            request_timeout_secs: 60,
            concurrency: 8,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PastegoError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    /// Parse settings from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var(FEED_URL_ENV) {
            if !url.trim().is_empty() {
                self.feed_url = url.trim().to_string();
            }
        }
    }

    /// Reject values the watcher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.search.trim().is_empty() {
            return Err(PastegoError::config("search must not be empty"));
        }
        if self.interval_secs == 0 {
            return Err(PastegoError::config("interval must be at least one second"));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(PastegoError::config(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        if self.concurrency == 0 {
            return Err(PastegoError::config("concurrency must be at least 1"));
        }
        url::Url::parse(&self.feed_url)?;
        Ok(())
    }
}
