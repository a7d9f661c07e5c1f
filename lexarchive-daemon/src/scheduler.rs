//! Background Workers
//!
//! Supervises the three daemon loops:
//! - archive sync (remote diff + gate + pause/resume broadcasts)
//! - notification scheduler (minute tick, subscriber dispatch)
//! - news refresher (daily content pull)
//!
//! Each worker gets a child of the root cancellation token so Ctrl-C
//! tears all of them down together.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lexarchive_core::notify::{NewsSource, Notifier};
use lexarchive_core::sched::{NewsRefresher, NotificationScheduler};
use lexarchive_core::sync::worker::run_sync_worker;
use lexarchive_core::Synchronizer;

use crate::news::{FileNewsSource, HttpNewsSource};
use crate::state::AppState;

/// Start the archive sync worker.
pub fn start_sync(
    state: &AppState,
    notifier: Arc<dyn Notifier>,
    cancel: &CancellationToken,
) -> JoinHandle<()> {
    let synchronizer = Arc::new(Synchronizer::new(
        Arc::clone(state.tap()),
        Arc::clone(state.store()),
    ));
    tokio::spawn(run_sync_worker(
        synchronizer,
        Arc::clone(state.gate()),
        notifier,
        Duration::from_secs(state.config().sync_interval_secs),
        cancel.child_token(),
    ))
}

/// Start the subscriber notification scheduler.
pub fn start_notifier(
    state: &AppState,
    notifier: Arc<dyn Notifier>,
    cancel: &CancellationToken,
) -> JoinHandle<()> {
    let source: Arc<dyn NewsSource> = Arc::new(FileNewsSource::new(Arc::clone(state.news())));
    let scheduler = NotificationScheduler::new(
        Arc::clone(state.subs()),
        notifier,
        source,
        Duration::from_secs(state.config().notify_tick_secs),
    );
    tokio::spawn(scheduler.run(cancel.child_token()))
}

/// Start the news refresher, if a feed is configured.
pub fn start_news_refresh(state: &AppState, cancel: &CancellationToken) -> Option<JoinHandle<()>> {
    let url = state.config().news_feed_url.as_ref()?;
    let source: Arc<dyn NewsSource> = Arc::new(HttpNewsSource::new(url));
    let refresher = NewsRefresher::new(
        source,
        Arc::clone(state.news()),
        Duration::from_secs(state.config().news_interval_secs),
    );
    Some(tokio::spawn(refresher.run(cancel.child_token())))
}
