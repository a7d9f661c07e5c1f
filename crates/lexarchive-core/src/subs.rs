//! Subscription persistence: one `<id>-<HH:MM>` line per subscriber.
//!
//! The file is rewritten wholesale on every subscribe/unsubscribe and
//! reloaded by the notification scheduler only when its modification time
//! changes. One mutex covers both the cached map and the file itself, so
//! a tick never reads a half-written file.

use chrono::NaiveTime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{ArchiveError, ArchiveResult};

#[derive(Debug, Default)]
struct Cache {
    entries: HashMap<i64, String>,
    last_mtime: Option<SystemTime>,
}

pub struct SubscriptionBook {
    path: PathBuf,
    cache: Mutex<Cache>,
}

impl SubscriptionBook {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Add or replace the subscription for `id`. `time` must be `HH:MM`.
    pub fn subscribe(&self, id: i64, time: &str) -> ArchiveResult<()> {
        if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return Err(ArchiveError::Config(format!(
                "invalid subscription time {time:?}, expected HH:MM"
            )));
        }
        let mut cache = self.cache.lock();
        self.reload_locked(&mut cache);
        cache.entries.insert(id, time.to_string());
        self.rewrite_locked(&mut cache)
    }

    /// Remove the subscription for `id`. Returns whether one existed.
    pub fn unsubscribe(&self, id: i64) -> ArchiveResult<bool> {
        let mut cache = self.cache.lock();
        self.reload_locked(&mut cache);
        let existed = cache.entries.remove(&id).is_some();
        if existed {
            self.rewrite_locked(&mut cache)?;
        }
        Ok(existed)
    }

    /// Subscribers whose stored time equals `hhmm`, after reloading the
    /// file if it changed on disk.
    pub fn due(&self, hhmm: &str) -> Vec<i64> {
        let mut cache = self.cache.lock();
        self.reload_locked(&mut cache);
        let mut ids: Vec<i64> = cache
            .entries
            .iter()
            .filter(|(_, t)| t.as_str() == hhmm)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the current subscriptions.
    pub fn entries(&self) -> HashMap<i64, String> {
        let mut cache = self.cache.lock();
        self.reload_locked(&mut cache);
        cache.entries.clone()
    }

    fn reload_locked(&self, cache: &mut Cache) {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return, // no file yet, keep the cached map
        };
        if cache.last_mtime == Some(mtime) {
            return;
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                cache.entries = parse_subscriptions(&content);
                cache.last_mtime = Some(mtime);
            }
            Err(e) => {
                tracing::warn!("[Subs] Failed to read subscription file: {}", e);
            }
        }
    }

    fn rewrite_locked(&self, cache: &mut Cache) -> ArchiveResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut ids: Vec<&i64> = cache.entries.keys().collect();
        ids.sort_unstable();
        let mut out = String::new();
        for id in ids {
            out.push_str(&format!("{id}-{}\n", cache.entries[id]));
        }
        fs::write(&self.path, out)?;
        cache.last_mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        Ok(())
    }
}

/// Parse subscription lines, silently skipping anything that is not
/// `<id>-<HH:MM>`. Splitting at the last `-` keeps negative group ids
/// intact.
fn parse_subscriptions(content: &str) -> HashMap<i64, String> {
    let mut entries = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id_part, time_part)) = line.rsplit_once('-') else {
            tracing::debug!("[Subs] Skipping malformed line {:?}", line);
            continue;
        };
        let Ok(id) = id_part.parse::<i64>() else {
            tracing::debug!("[Subs] Skipping malformed line {:?}", line);
            continue;
        };
        if NaiveTime::parse_from_str(time_part, "%H:%M").is_err() {
            tracing::debug!("[Subs] Skipping malformed line {:?}", line);
            continue;
        }
        entries.insert(id, time_part.to_string());
    }
    entries
}
