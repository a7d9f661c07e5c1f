//! LEXArchive Daemon
//!
//! Headless mirror of NASA's Planetary Systems table:
//! - syncs the local SQLite mirror against the TAP endpoint once a day
//! - pauses foreground commands while a sync cycle runs
//! - pushes daily news to subscribed clients at their chosen time
//!
//! The chat front-end attaches through [`state::AppState`] and the
//! outbox channel; this binary only supervises the background workers.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod news;
mod outbox;
mod scheduler;
mod state;

use lexarchive_core::notify::Notifier;
use lexarchive_core::sched::NewsFile;
use lexarchive_core::subs::SubscriptionBook;
use lexarchive_core::{config, ArchiveStore, SyncGate, TapClient};
use outbox::OutboxNotifier;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let app_config = config::load_config()?;
    let data_dir = config::get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    info!("🚀 LEXArchive daemon starting (data dir {})", data_dir.display());

    let store = Arc::new(ArchiveStore::open(
        data_dir.join("archive.db"),
        &app_config.table,
        &app_config.columns,
    )?);
    info!("📊 Mirror holds {} records", store.count()?);

    let tap = Arc::new(TapClient::new(
        &app_config.tap_url,
        &app_config.table,
        &app_config.columns,
    ));
    let gate = Arc::new(SyncGate::new());
    let subs = Arc::new(SubscriptionBook::new(data_dir.join("subscribers.txt")));
    let news = Arc::new(NewsFile::new(data_dir.join("news.txt")));

    let state = AppState::new(app_config, gate, store, tap, subs, news);

    let (notifier, mut outbox_rx) = OutboxNotifier::channel();
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    let cancel = CancellationToken::new();
    let sync_worker = scheduler::start_sync(&state, Arc::clone(&notifier), &cancel);
    let notify_worker = scheduler::start_notifier(&state, Arc::clone(&notifier), &cancel);
    let news_worker = scheduler::start_news_refresh(&state, &cancel);
    if news_worker.is_none() {
        info!("📰 No news feed configured, refresher disabled");
    }

    // Drain the outbox. The chat transport takes this end over when one
    // is attached; standalone, deliveries are logged and dropped.
    let drain = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            info!("✉️  [Outbox] -> {}: {}", msg.client_id, msg.text);
        }
    });

    info!("✅ Workers running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    cancel.cancel();

    sync_worker.await?;
    notify_worker.await?;
    if let Some(worker) = news_worker {
        worker.await?;
    }
    drain.abort();
    info!("✅ Shutdown complete");

    Ok(())
}
