// SPDX-License-Identifier: MIT

//! Paste feed client
//!
//! The scraping API lists recent pastes as a JSON array; each record points
//! at a URL serving the raw paste body.

use super::config::Settings;
use super::error::{PastegoError, Result};
use super::extract::extract_text;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Body the API sends instead of a listing when polled too often
const SLOW_DOWN: &str = "Please slow down";

const EXCERPT_CHARS: usize = 120;

/// One record of the scraping listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteEntry {
    pub scrape_url: String,
    pub full_url: String,
    pub date: String,
    pub key: String,
    pub size: String,
    pub expire: String,
    pub title: String,
    pub syntax: String,
    pub user: String,
}

/// Where pastes come from
#[async_trait]
pub trait PasteSource: Send + Sync {
    /// The most recent `limit` pastes
    async fn latest(&self, limit: u32) -> Result<Vec<PasteEntry>>;

    /// Searchable text of one paste
    async fn fetch_body(&self, entry: &PasteEntry) -> Result<String>;
}

/// HTTP implementation of [`PasteSource`] against the scraping API
pub struct ScrapeClient {
    client: Client,
    feed_url: Url,
}

impl ScrapeClient {
    pub fn new(feed_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            feed_url: Url::parse(feed_url)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.feed_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn listing_url(&self, limit: u32) -> Url {
        let mut url = self.feed_url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl PasteSource for ScrapeClient {
    async fn latest(&self, limit: u32) -> Result<Vec<PasteEntry>> {
        let url = self.listing_url(limit);
        log::debug!("Fetching listing: {}", url);

        let resp = self.client.get(url.as_str()).send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(PastegoError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(PastegoError::feed(format!(
                "listing returned {}: {}",
                status,
                excerpt(&text)
            )));
        }

        let text = resp.text().await?;
        decode_listing(&text)
    }

    async fn fetch_body(&self, entry: &PasteEntry) -> Result<String> {
        if entry.scrape_url.is_empty() {
            return Err(PastegoError::feed(format!(
                "paste '{}' has no scrape URL",
                entry.key
            )));
        }

        let resp = self
            .client
            .get(entry.scrape_url.as_str())
            .send()
            .await?
            .error_for_status()?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?;

        extract_text(content_type.as_deref(), &bytes)
    }
}

/// Decode a listing body, recognising the API's back-off answer
pub fn decode_listing(body: &str) -> Result<Vec<PasteEntry>> {
    match serde_json::from_str::<Vec<PasteEntry>>(body) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            let trimmed = body.trim();
            if trimmed.is_empty() || trimmed.contains(SLOW_DOWN) {
                Err(PastegoError::RateLimited)
            } else {
                Err(PastegoError::feed(format!(
                    "undecodable listing ({}): {}",
                    e,
                    excerpt(trimmed)
                )))
            }
        }
    }
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_listing() {
        let body = r#"[
            {
                "scrape_url": "https://scrape.pastebin.com/api_scrape_item.php?i=0CeaNm8Y",
                "full_url": "https://pastebin.com/0CeaNm8Y",
                "date": "1442911802",
                "key": "0CeaNm8Y",
                "size": "890",
                "expire": "1442998159",
                "title": "Once we all know when we goto function",
                "syntax": "java",
                "user": "admin"
            },
            {
                "scrape_url": "https://scrape.pastebin.com/api_scrape_item.php?i=AbCdEf12",
                "key": "AbCdEf12"
            }
        ]"#;
        let entries = decode_listing(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "0CeaNm8Y");
        assert_eq!(entries[0].syntax, "java");
        assert_eq!(entries[1].title, "");
        assert_eq!(entries[1].user, "");
    }

    #[test]
    fn test_decode_slow_down() {
        let body = "Please slow down, you are hitting our servers unnecessarily hard!";
        assert!(matches!(
            decode_listing(body),
            Err(PastegoError::RateLimited)
        ));
        assert!(matches!(decode_listing("  "), Err(PastegoError::RateLimited)));
    }

    #[test]
    fn test_decode_other_garbage() {
        let body = "YOUR IP: 1.2.3.4 DOES NOT HAVE ACCESS.";
        match decode_listing(body) {
            Err(PastegoError::Feed(msg)) => assert!(msg.contains("DOES NOT HAVE ACCESS")),
            other => panic!("Expected Feed error, got {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert_eq!(short.len(), EXCERPT_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_listing_url() {
        let client = ScrapeClient::new(
            "https://pastebin.com/api_scraping.php",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.listing_url(100).as_str(),
            "https://pastebin.com/api_scraping.php?limit=100"
        );
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            ScrapeClient::new("::nope::", Duration::from_secs(5)),
            Err(PastegoError::Url(_))
        ));
    }
}
