//! Types for the ingestion scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infohash::InfoHash;
use crate::store::StoreError;

/// Errors that abort a scheduling cycle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Counting or paging the backlog failed.
    #[error("backlog error: {0}")]
    Backlog(#[from] StoreError),

    /// Every worker has exited.
    #[error("worker pool is closed")]
    PoolClosed,
}

/// Final status of one backlog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Already in the index; the backlog entry was marked without fetching.
    Skipped,
    /// Fetched and indexed.
    Indexed,
    /// Could not be fetched or indexed.
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Skipped => "skipped",
            ItemStatus::Indexed => "indexed",
            ItemStatus::Failed => "failed",
        }
    }

    /// Per-item log line.
    pub fn message(&self, infohash: &InfoHash) -> String {
        match self {
            ItemStatus::Skipped => format!("'{}' Skip......", infohash),
            ItemStatus::Indexed => format!("Storage InfoHash '{}' Success......", infohash),
            ItemStatus::Failed => format!("Can not download '{}' torrent file......", infohash),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a worker reports back for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub infohash: InfoHash,
    pub status: ItemStatus,
    /// The entry still matches the scheduling predicate after processing.
    pub still_eligible: bool,
}

/// Summary of one drain pass over the backlog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Eligible entries counted at the start of the cycle.
    pub eligible: u64,
    pub batches: u64,
    pub processed: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
    /// The cycle stopped early because of a shutdown signal.
    pub interrupted: bool,
}

impl CycleReport {
    pub(crate) fn record(&mut self, status: ItemStatus) {
        self.processed += 1;
        match status {
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Indexed => self.indexed += 1,
            ItemStatus::Failed => self.failed += 1,
        }
    }

    /// Nothing left the backlog during this cycle.
    pub fn made_no_progress(&self) -> bool {
        self.indexed + self.skipped == 0
    }
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the background loop is running.
    pub running: bool,
    /// Completed drain passes.
    pub cycles: u64,
    pub processed: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Items a worker is working on right now.
    pub in_flight: u64,
    /// Worker tasks in the pool.
    pub workers: usize,
}
