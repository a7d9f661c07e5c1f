//! Application State
//!
//! Holds the shared state handed to the background workers and to the
//! (out-of-process) chat front-end: the sync gate, the mirror store, the
//! subscription book, the news cache, and the render admission queue.

use std::sync::Arc;

use lexarchive_core::sched::NewsFile;
use lexarchive_core::subs::SubscriptionBook;
use lexarchive_core::{AppConfig, ArchiveResult, ArchiveStore, RenderQueue, SyncGate, TapClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: AppConfig,
    pub gate: Arc<SyncGate>,
    pub store: Arc<ArchiveStore>,
    pub tap: Arc<TapClient>,
    pub subs: Arc<SubscriptionBook>,
    pub news: Arc<NewsFile>,
    pub render_queue: Arc<RenderQueue<i64>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        gate: Arc<SyncGate>,
        store: Arc<ArchiveStore>,
        tap: Arc<TapClient>,
        subs: Arc<SubscriptionBook>,
        news: Arc<NewsFile>,
    ) -> Self {
        let render_queue = Arc::new(RenderQueue::new(config.render_slots));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                gate,
                store,
                tap,
                subs,
                news,
                render_queue,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn gate(&self) -> &Arc<SyncGate> {
        &self.inner.gate
    }

    pub fn store(&self) -> &Arc<ArchiveStore> {
        &self.inner.store
    }

    pub fn tap(&self) -> &Arc<TapClient> {
        &self.inner.tap
    }

    pub fn subs(&self) -> &Arc<SubscriptionBook> {
        &self.inner.subs
    }

    pub fn news(&self) -> &Arc<NewsFile> {
        &self.inner.news
    }

    /// The queue a render handler holds a slot in for the lifetime of its
    /// external renderer process.
    pub fn render_queue(&self) -> &Arc<RenderQueue<i64>> {
        &self.inner.render_queue
    }

    /// Uniform busy check for every command handler: while a sync cycle
    /// runs, handlers reply "service temporarily unavailable" instead of
    /// touching the store.
    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_synchronizing()
    }

    /// Record a client on first contact so it receives pause/resume
    /// broadcasts.
    pub fn register_client(&self, id: i64) {
        self.inner.gate.register_client(id);
    }

    pub fn record_count(&self) -> ArchiveResult<i64> {
        self.inner.store.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> AppState {
        let config = AppConfig::default();
        let store = Arc::new(
            ArchiveStore::open_in_memory(&config.table, &config.columns).unwrap(),
        );
        let tap = Arc::new(TapClient::new(&config.tap_url, &config.table, &config.columns));
        let subs = Arc::new(SubscriptionBook::new(dir.path().join("subscribers.txt")));
        let news = Arc::new(NewsFile::new(dir.path().join("news.txt")));
        AppState::new(config, Arc::new(SyncGate::new()), store, tap, subs, news)
    }

    #[test]
    fn busy_tracks_the_gate() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        assert!(!state.is_busy());
        state.gate().begin_cycle();
        assert!(state.is_busy());
        state.gate().end_cycle();
        assert!(!state.is_busy());
    }

    #[test]
    fn render_queue_uses_configured_capacity() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        assert_eq!(state.render_queue().capacity(), 5);
    }
}
