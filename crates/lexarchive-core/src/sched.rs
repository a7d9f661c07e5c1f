//! Timer-driven workers: subscriber notifications and the news cache.
//!
//! [`NotificationScheduler`] ticks once a minute and pushes the day's
//! content to every subscriber whose stored time matches the current
//! wall-clock minute. Matching uses **local time**: subscribers enter the
//! times they live by, and the daemon is expected to run in their region.
//!
//! [`NewsRefresher`] keeps a local news file fresh on a daily period.

use chrono::Local;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::error::ArchiveResult;
use crate::notify::{NewsSource, Notifier};
use crate::subs::SubscriptionBook;

/// Local news cache shared between the refresher (writer) and the
/// front-end's news command (reader). The lock keeps reads from observing
/// a half-written file.
pub struct NewsFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl NewsFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn write(&self, content: &str) -> ArchiveResult<()> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn read(&self) -> ArchiveResult<String> {
        let _guard = self.lock.lock();
        Ok(fs::read_to_string(&self.path)?)
    }
}

pub struct NotificationScheduler {
    subs: Arc<SubscriptionBook>,
    notifier: Arc<dyn Notifier>,
    source: Arc<dyn NewsSource>,
    tick: Duration,
}

impl NotificationScheduler {
    pub fn new(
        subs: Arc<SubscriptionBook>,
        notifier: Arc<dyn Notifier>,
        source: Arc<dyn NewsSource>,
        tick: Duration,
    ) -> Self {
        Self {
            subs,
            notifier,
            source,
            tick,
        }
    }

    /// One tick: reload-if-changed, match, dispatch. The content is
    /// fetched at most once per tick no matter how many subscribers
    /// match, and dispatch is fire-and-forget so a slow delivery never
    /// stalls the loop.
    pub async fn tick_once(&self, hhmm: &str) {
        let subs = Arc::clone(&self.subs);
        let at = hhmm.to_string();
        // The reload touches the file system; keep it off the runtime.
        let due = match tokio::task::spawn_blocking(move || subs.due(&at)).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("[Notify] spawn_blocking panic for subscription reload: {}", e);
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        let Some(content) = self.source.fetch().await else {
            tracing::debug!("[Notify] {} subscriber(s) due but no content", due.len());
            return;
        };
        tracing::info!("[Notify] Dispatching to {} subscriber(s) at {}", due.len(), hhmm);
        for client in due {
            let notifier = Arc::clone(&self.notifier);
            let content = content.clone();
            tokio::spawn(async move {
                notifier.send(client, &content).await;
            });
        }
    }

    /// Run the tick loop until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("[Notify] Scheduler started (tick {:?})", self.tick);
        let mut ticker = interval(self.tick);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[Notify] Scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            let hhmm = Local::now().format("%H:%M").to_string();
            self.tick_once(&hhmm).await;
        }
    }
}

pub struct NewsRefresher {
    source: Arc<dyn NewsSource>,
    news: Arc<NewsFile>,
    period: Duration,
}

impl NewsRefresher {
    pub fn new(source: Arc<dyn NewsSource>, news: Arc<NewsFile>, period: Duration) -> Self {
        Self {
            source,
            news,
            period,
        }
    }

    /// Fetch once and store a non-empty result.
    pub async fn refresh_once(&self) {
        match self.source.fetch().await {
            Some(content) if !content.is_empty() => {
                let news = Arc::clone(&self.news);
                let result =
                    tokio::task::spawn_blocking(move || news.write(&content)).await;
                match result {
                    Ok(Err(e)) => tracing::warn!("[News] Failed to write news file: {}", e),
                    Err(e) => {
                        tracing::error!("[News] spawn_blocking panic for news write: {}", e);
                    }
                    Ok(Ok(())) => {}
                }
            }
            _ => tracing::debug!("[News] Nothing new to store"),
        }
    }

    /// Run the refresh loop until cancelled. The first refresh happens
    /// immediately.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("[News] Refresher started (period {:?})", self.period);
        let mut ticker = interval(self.period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[News] Refresher stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            self.refresh_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSource {
        fetches: AtomicUsize,
        content: Option<String>,
    }

    #[async_trait]
    impl NewsSource for CountingSource {
        async fn fetch(&self) -> Option<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.content.clone()
        }
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, client_id: i64, text: &str) {
            self.sent.lock().push((client_id, text.to_string()));
        }
    }

    async fn wait_for_sends(notifier: &RecordingNotifier, expected: usize) {
        for _ in 0..100 {
            if notifier.sent.lock().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn scheduler_fixture(
        dir: &TempDir,
        content: Option<String>,
    ) -> (
        NotificationScheduler,
        Arc<SubscriptionBook>,
        Arc<RecordingNotifier>,
        Arc<CountingSource>,
    ) {
        let subs = Arc::new(SubscriptionBook::new(dir.path().join("subscribers.txt")));
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
        });
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            content,
        });
        let scheduler = NotificationScheduler::new(
            Arc::clone(&subs),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&source) as Arc<dyn NewsSource>,
            Duration::from_secs(60),
        );
        (scheduler, subs, notifier, source)
    }

    #[tokio::test]
    async fn only_matching_subscribers_notified_and_content_fetched_once() {
        let dir = TempDir::new().unwrap();
        let (scheduler, subs, notifier, source) =
            scheduler_fixture(&dir, Some("fresh discovery".into()));
        subs.subscribe(1, "08:00").unwrap();
        subs.subscribe(2, "09:00").unwrap();
        subs.subscribe(3, "08:00").unwrap();

        scheduler.tick_once("08:00").await;
        wait_for_sends(&notifier, 2).await;

        let sent = notifier.sent.lock();
        let mut ids: Vec<i64> = sent.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert!(sent.iter().all(|(_, text)| text == "fresh discovery"));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_due_subscribers_means_no_fetch() {
        let dir = TempDir::new().unwrap();
        let (scheduler, subs, notifier, source) = scheduler_fixture(&dir, Some("x".into()));
        subs.subscribe(1, "08:00").unwrap();

        scheduler.tick_once("13:37").await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_content_dispatches_nothing() {
        let dir = TempDir::new().unwrap();
        let (scheduler, subs, notifier, source) = scheduler_fixture(&dir, None);
        subs.subscribe(1, "08:00").unwrap();

        scheduler.tick_once("08:00").await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn refresher_stores_non_empty_content() {
        let dir = TempDir::new().unwrap();
        let news = Arc::new(NewsFile::new(dir.path().join("news.txt")));
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            content: Some("https://example.org/article".into()),
        });
        let refresher = NewsRefresher::new(
            Arc::clone(&source) as Arc<dyn NewsSource>,
            Arc::clone(&news),
            Duration::from_secs(86_400),
        );

        refresher.refresh_once().await;
        assert_eq!(news.read().unwrap(), "https://example.org/article");
    }

    #[tokio::test]
    async fn cancellation_stops_the_loops() {
        let dir = TempDir::new().unwrap();
        let (scheduler, _subs, _notifier, _source) = scheduler_fixture(&dir, None);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler loop must exit promptly on cancellation")
            .unwrap();
    }
}
