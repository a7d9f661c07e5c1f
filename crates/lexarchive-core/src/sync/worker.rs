//! Periodic sync worker: gate handling and pause/resume broadcasts
//! around each cycle.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::gate::SyncGate;
use crate::notify::Notifier;
use crate::sync::Synchronizer;

const PAUSE_NOTICE: &str = "We're currently updating the database, all commands are unavailable. \
                            We'll be back in a moment.";
const RESUME_NOTICE: &str = "We've updated the database, all commands are now available.";

/// Run sync cycles every `period` until cancelled. The first cycle starts
/// immediately. The gate is closed and reopened around every cycle, and
/// both broadcasts go out on success and on failure alike, so clients are
/// never left believing the service is still paused.
pub async fn run_sync_worker(
    synchronizer: Arc<Synchronizer>,
    gate: Arc<SyncGate>,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!("[Sync] Worker started (period {:?})", period);
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("[Sync] Worker stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        gate.begin_cycle();
        broadcast(&gate, &notifier, PAUSE_NOTICE).await;

        if let Err(e) = synchronizer.run_cycle().await {
            tracing::error!("[Sync] Cycle failed: {}", e);
        }

        gate.end_cycle();
        broadcast(&gate, &notifier, RESUME_NOTICE).await;
    }
}

async fn broadcast(gate: &SyncGate, notifier: &Arc<dyn Notifier>, text: &str) {
    for client in gate.list_clients() {
        notifier.send(client, text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::ArchiveStore;
    use crate::tap::TapClient;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingNotifier {
        messages: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, client_id: i64, text: &str) {
            self.messages.lock().push((client_id, text.to_string()));
        }
    }

    #[tokio::test]
    async fn failed_cycle_still_reopens_gate_and_broadcasts_resume() {
        let config = AppConfig::default();
        // Unroutable port: the first fetch fails, exercising the failure path.
        let tap = Arc::new(TapClient::new(
            "http://127.0.0.1:9",
            &config.table,
            &config.columns,
        ));
        let store = Arc::new(ArchiveStore::open_in_memory(&config.table, &config.columns).unwrap());
        let synchronizer = Arc::new(Synchronizer::new(tap, store));

        let gate = Arc::new(SyncGate::new());
        gate.register_client(11);
        let notifier = Arc::new(RecordingNotifier {
            messages: Mutex::new(Vec::new()),
        });

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_sync_worker(
            synchronizer,
            Arc::clone(&gate),
            notifier.clone() as Arc<dyn Notifier>,
            Duration::from_secs(3600),
            cancel.clone(),
        ));

        // Wait for the immediate first cycle to finish both broadcasts.
        for _ in 0..100 {
            if notifier.messages.lock().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        cancel.cancel();
        worker.await.unwrap();

        let messages = notifier.messages.lock();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, 11);
        assert!(messages[0].1.contains("unavailable"));
        assert!(messages[1].1.contains("now available"));
        assert!(!gate.is_synchronizing(), "gate must reopen after a failed cycle");
    }
}
