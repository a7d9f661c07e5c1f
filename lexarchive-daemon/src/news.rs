//! Default news source: a single GET against the configured feed URL.
//!
//! The real scraping pipeline lives outside the daemon; this thin client
//! exists so the refresher and the notification scheduler have content to
//! work with when a plain feed URL is configured.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use lexarchive_core::notify::NewsSource;
use lexarchive_core::sched::NewsFile;

pub struct HttpNewsSource {
    http: Client,
    url: String,
}

impl HttpNewsSource {
    pub fn new(url: &str) -> Self {
        Self {
            http: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn fetch(&self) -> Option<String> {
        let response = match self.http.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("[News] Fetch failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!("[News] Feed returned status {}", response.status());
            return None;
        }
        match response.text().await {
            Ok(body) => {
                let body = body.trim().to_string();
                if body.is_empty() {
                    None
                } else {
                    Some(body)
                }
            }
            Err(e) => {
                tracing::warn!("[News] Failed to read feed body: {}", e);
                None
            }
        }
    }
}

/// News source backed by the locally cached news file; what subscribers
/// receive on their scheduled time.
pub struct FileNewsSource {
    news: Arc<NewsFile>,
}

impl FileNewsSource {
    pub fn new(news: Arc<NewsFile>) -> Self {
        Self { news }
    }
}

#[async_trait]
impl NewsSource for FileNewsSource {
    async fn fetch(&self) -> Option<String> {
        let content = self.news.read().ok()?;
        content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }
}
