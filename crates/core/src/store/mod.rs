//! Persistence for the ingestion pipeline.
//!
//! Three record kinds, each behind its own trait so components only see what
//! they use: the backlog of discovered hashes, the torrent index, and daily
//! statistics. [`SqliteStore`] implements all three over one connection.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::*;

use crate::infohash::InfoHash;

/// Backlog of discovered infohashes.
pub trait BacklogStore: Send + Sync {
    /// Count entries matching the filter (limit/offset ignored).
    fn count(&self, filter: &BacklogFilter) -> Result<u64, StoreError>;

    /// One page of matching entries, hottest first, then oldest first.
    fn find_page(&self, filter: &BacklogFilter) -> Result<Vec<PendingHash>, StoreError>;

    fn get(&self, infohash: &InfoHash) -> Result<Option<PendingHash>, StoreError>;

    /// Insert a new entry. Fails with `Duplicate` if the infohash exists.
    fn insert(&self, entry: &PendingHash) -> Result<(), StoreError>;

    /// Apply a partial update. Fails with `NotFound` for unknown hashes.
    fn update(&self, infohash: &InfoHash, update: &PendingHashUpdate) -> Result<(), StoreError>;

    /// Add one to `failure_count`, returning the new value.
    fn increment_failures(&self, infohash: &InfoHash) -> Result<u32, StoreError>;

    /// Add one to `hotness`, returning the new value.
    fn increment_hotness(&self, infohash: &InfoHash) -> Result<u64, StoreError>;
}

/// The searchable torrent index.
pub trait TorrentIndex: Send + Sync {
    fn exists(&self, infohash: &InfoHash) -> Result<bool, StoreError>;

    fn get(&self, infohash: &InfoHash) -> Result<Option<IndexedTorrent>, StoreError>;

    /// Insert a new record. Fails with `Duplicate` if the infohash exists.
    fn insert(&self, torrent: &IndexedTorrent) -> Result<(), StoreError>;

    /// Apply a partial update. Fails with `NotFound` for unknown hashes.
    fn update(
        &self,
        infohash: &InfoHash,
        update: &IndexedTorrentUpdate,
    ) -> Result<(), StoreError>;

    /// Add one to `hotness`, returning the new value.
    fn increment_hotness(&self, infohash: &InfoHash) -> Result<u64, StoreError>;

    /// Add one to `view_count`, returning the new value.
    fn increment_views(&self, infohash: &InfoHash) -> Result<u64, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}

/// Per-day counters.
pub trait StatsStore: Send + Sync {
    /// Add one to `counter` for `day` (`YYYYMMDD`), creating the day if needed.
    fn increment(&self, day: &str, counter: DailyCounter) -> Result<(), StoreError>;

    fn get(&self, day: &str) -> Result<Option<DailyStats>, StoreError>;
}
