//! Collaborator seams: outbound notification delivery and news content.
//!
//! The chat transport and the news scraper live outside this crate; the
//! workers only need fire-and-forget delivery and a one-shot content
//! fetch, so both are traits injected at construction.

use async_trait::async_trait;

/// Fire-and-forget outbound delivery to one client. Implementations must
/// not block the caller on delivery and there is no acknowledgment.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, client_id: i64, text: &str);
}

/// Source of the content pushed to subscribers and stored by the news
/// refresher. `None` means nothing new to deliver.
#[async_trait]
pub trait NewsSource: Send + Sync + 'static {
    async fn fetch(&self) -> Option<String>;
}
