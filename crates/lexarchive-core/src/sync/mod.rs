//! Remote-diff synchronization of the local mirror.
//!
//! Each cycle walks Idle → Fetching → Diffing → Applying → Idle. The
//! reconciliation strategy is picked by precondition before any row fetch:
//!
//! - **Bootstrap** — empty mirror: fetch everything, insert everything.
//! - **Incremental** — counts match: fetch rows modified at or after the
//!   last marker; each fetched entity is deleted then reinserted, which
//!   absorbs updates without a changed flag.
//! - **FullDiff** — counts differ: the incremental fetch plus the full
//!   remote identifier list, so entities removed upstream are deleted
//!   outright (`to_delete = local − remote`).
//!
//! Deletions always run before insertions (primary-identifier uniqueness),
//! and a cycle's writes commit as one transaction; see
//! [`ArchiveStore::apply`].

pub mod worker;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ArchiveResult;
use crate::store::{ApplyPlan, ArchiveStore};
use crate::tap::{TapClient, TapRow};

/// Which reconciliation path a cycle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Bootstrap,
    Incremental,
    FullDiff,
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub strategy: Reconciliation,
    pub deleted: usize,
    pub inserted: usize,
    /// Marker written on success: the cycle's start date.
    pub marker: String,
}

pub struct Synchronizer {
    tap: Arc<TapClient>,
    store: Arc<ArchiveStore>,
}

impl Synchronizer {
    pub fn new(tap: Arc<TapClient>, store: Arc<ArchiveStore>) -> Self {
        Self { tap, store }
    }

    /// Run one sync cycle. Any remote or store error aborts the cycle
    /// with no partial writes (the transaction rolls back) and the next
    /// scheduled cycle retries from scratch.
    pub async fn run_cycle(&self) -> ArchiveResult<CycleReport> {
        let started = Utc::now().format("%Y-%m-%d").to_string();

        // Fetching
        let remote_count = self.tap.count().await?;
        let local_count = self.store.count()?;
        let last_marker = self.store.last_marker()?;

        let strategy = if local_count == 0 || last_marker.is_none() {
            Reconciliation::Bootstrap
        } else if remote_count != local_count {
            Reconciliation::FullDiff
        } else {
            Reconciliation::Incremental
        };
        tracing::info!(
            "[Sync] Cycle start: {:?} (remote {} rows, local {} rows)",
            strategy,
            remote_count,
            local_count
        );

        // Diffing
        let plan = match strategy {
            Reconciliation::Bootstrap => {
                let rows = self.tap.all_rows().await?;
                ApplyPlan {
                    to_delete: Vec::new(),
                    to_insert: rows,
                    marker: started.clone(),
                }
            }
            Reconciliation::Incremental => {
                let marker = last_marker.unwrap_or_default();
                let rows = self.tap.rows_since(&marker).await?;
                ApplyPlan {
                    to_delete: changed_names(&rows),
                    to_insert: rows,
                    marker: started.clone(),
                }
            }
            Reconciliation::FullDiff => {
                let marker = last_marker.unwrap_or_default();
                let rows = self.tap.rows_since(&marker).await?;
                let remote_ids = self.tap.identifiers().await?;
                let local_ids = self.store.local_identifiers()?;
                let mut to_delete = changed_names(&rows);
                to_delete.extend(removed_upstream(&local_ids, &remote_ids));
                ApplyPlan {
                    to_delete,
                    to_insert: rows,
                    marker: started.clone(),
                }
            }
        };

        // Applying: deletions before insertions, one transaction.
        let outcome = self.store.apply(&plan)?;
        tracing::info!(
            "[Sync] Cycle done: {} deleted, {} inserted, marker {}",
            outcome.deleted,
            outcome.inserted,
            started
        );

        Ok(CycleReport {
            strategy,
            deleted: outcome.deleted,
            inserted: outcome.inserted,
            marker: started,
        })
    }
}

/// Distinct identifiers of the fetched rows, each a delete-then-reinsert
/// target.
fn changed_names(rows: &[TapRow]) -> Vec<String> {
    let mut names: Vec<String> = rows
        .iter()
        .map(|r| r.name.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort_unstable();
    names
}

/// Identifiers present locally but gone from the remote set.
fn removed_upstream(local: &HashSet<String>, remote: &HashSet<String>) -> Vec<String> {
    let mut gone: Vec<String> = local.difference(remote).cloned().collect();
    gone.sort_unstable();
    gone
}
