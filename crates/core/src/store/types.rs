//! Record types for the backlog, the torrent index and daily statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infohash::InfoHash;
use crate::tree::{Directory, FileEntry};

/// Errors for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Duplicate infohash: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A discovered infohash waiting to be fetched and indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHash {
    pub id: String,
    pub infohash: InfoHash,
    /// Bumped every time the hash is rediscovered.
    pub hotness: u64,
    /// Number of fetches that exhausted every mirror.
    pub failure_count: u32,
    pub indexed: bool,
    pub created_at: DateTime<Utc>,
}

impl PendingHash {
    /// A fresh entry: hotness 1, no failures, not indexed.
    pub fn new(infohash: InfoHash) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            infohash,
            hotness: 1,
            failure_count: 0,
            indexed: false,
            created_at: Utc::now(),
        }
    }
}

/// Mutable fields of a [`PendingHash`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingHashUpdate {
    pub indexed: Option<bool>,
    pub failure_count: Option<u32>,
}

impl PendingHashUpdate {
    pub fn mark_indexed() -> Self {
        Self {
            indexed: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_none() && self.failure_count.is_none()
    }
}

/// Filter for querying the backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogFilter {
    pub indexed: Option<bool>,
    /// Inclusive upper bound on `failure_count`.
    pub max_failures: Option<u32>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for BacklogFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl BacklogFilter {
    pub fn new() -> Self {
        Self {
            indexed: None,
            max_failures: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Entries the scheduler should still work on.
    pub fn eligible(max_failures: u32) -> Self {
        Self::new()
            .with_indexed(false)
            .with_max_failures(max_failures)
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = Some(indexed);
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = Some(max_failures);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// The canonical searchable record for one torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedTorrent {
    pub id: String,
    pub infohash: InfoHash,
    pub title: String,
    pub total_size: u64,
    pub file_count: u32,
    pub hotness: u64,
    /// Flat `(path, size)` listing.
    pub files: Vec<FileEntry>,
    pub file_tree: Directory,
    /// De-duplicated, in first-occurrence order.
    pub search_tokens: Vec<String>,
    pub view_count: u64,
    /// When the torrent was created, as declared by its metadata.
    pub created_time: DateTime<Utc>,
    pub indexed_time: DateTime<Utc>,
}

/// Mutable fields of an [`IndexedTorrent`] besides the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedTorrentUpdate {
    pub title: Option<String>,
    pub total_size: Option<u64>,
    pub file_count: Option<u32>,
    pub created_time: Option<DateTime<Utc>>,
    pub indexed_time: Option<DateTime<Utc>>,
}

impl IndexedTorrentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.total_size.is_none()
            && self.file_count.is_none()
            && self.created_time.is_none()
            && self.indexed_time.is_none()
    }
}

/// Daily counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyCounter {
    /// New backlog entries.
    Discovered,
    /// Newly indexed torrents.
    Ingested,
}

impl DailyCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyCounter::Discovered => "discovered",
            DailyCounter::Ingested => "ingested",
        }
    }
}

/// Counters for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// `YYYYMMDD`.
    pub day: String,
    pub discovered: u64,
    pub ingested: u64,
}

/// `YYYYMMDD` key for `at`.
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}
