//! Adaptor statistics.
//!
//! Counts what flowed through the adaptor during a session and keeps a
//! cumulative copy on disk so `status` can report it between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Session counters.
#[derive(Debug)]
pub struct AdaptorStats {
    /// Field-update records dispatched to the interpreter
    raw_events: AtomicU64,
    /// Sync markers dispatched to the interpreter
    sync_markers: AtomicU64,
    /// SYN_DROPPED markers seen from the kernel
    kernel_drops: AtomicU64,
    /// State changes published to the change buffer
    published_changes: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl AdaptorStats {
    pub fn new() -> Self {
        Self {
            raw_events: AtomicU64::new(0),
            sync_markers: AtomicU64::new(0),
            kernel_drops: AtomicU64::new(0),
            published_changes: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats backed by a file, loading previous totals if present.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous adaptor stats: {}", e);
        }

        stats
    }

    pub fn record_raw_event(&self) {
        self.raw_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync(&self) {
        self.sync_markers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kernel_drop(&self) {
        self.kernel_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self, count: u64) {
        self.published_changes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            raw_events: self.raw_events.load(Ordering::Relaxed),
            sync_markers: self.sync_markers.load(Ordering::Relaxed),
            kernel_drops: self.kernel_drops.load(Ordering::Relaxed),
            published_changes: self.published_changes.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Adaptor Statistics:\n\
             - Raw events: {}\n\
             - Sync markers: {}\n\
             - Kernel drops: {}\n\
             - Published changes: {}\n\
             - Session duration: {} seconds",
            stats.raw_events,
            stats.sync_markers,
            stats.kernel_drops,
            stats.published_changes,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                raw_events: stats.raw_events,
                sync_markers: stats.sync_markers,
                kernel_drops: stats.kernel_drops,
                published_changes: stats.published_changes,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = load_persisted(path)?;
                self.raw_events
                    .store(persisted.raw_events, Ordering::Relaxed);
                self.sync_markers
                    .store(persisted.sync_markers, Ordering::Relaxed);
                self.kernel_drops
                    .store(persisted.kernel_drops, Ordering::Relaxed);
                self.published_changes
                    .store(persisted.published_changes, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for AdaptorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub raw_events: u64,
    pub sync_markers: u64,
    pub kernel_drops: u64,
    pub published_changes: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// On-disk totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStats {
    pub raw_events: u64,
    pub sync_markers: u64,
    pub kernel_drops: u64,
    pub published_changes: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read persisted totals without creating a live stats object.
pub fn load_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared stats.
pub type SharedStats = Arc<AdaptorStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = AdaptorStats::new();
        stats.record_raw_event();
        stats.record_raw_event();
        stats.record_sync();
        stats.record_published(3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.raw_events, 2);
        assert_eq!(snapshot.sync_markers, 1);
        assert_eq!(snapshot.kernel_drops, 0);
        assert_eq!(snapshot.published_changes, 3);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");

        let stats = AdaptorStats::with_persistence(path.clone());
        stats.record_raw_event();
        stats.record_kernel_drop();
        stats.save().unwrap();

        let reloaded = AdaptorStats::with_persistence(path.clone());
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.raw_events, 1);
        assert_eq!(snapshot.kernel_drops, 1);

        assert_eq!(load_persisted(&path).unwrap().raw_events, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = AdaptorStats::new().summary();
        assert!(summary.contains("Raw events"));
        assert!(summary.contains("Published changes"));
    }
}
