//! Turns parsed metadata into the canonical indexed record.
//!
//! Indexing is idempotent: a second call for the same infohash never
//! re-derives anything, it only makes sure the backlog entry is marked.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infohash::InfoHash;
use crate::metainfo::{FileDict, TorrentMetadata};
use crate::metrics;
use crate::scan_code::ScanCodeWriter;
use crate::store::{
    day_key, BacklogStore, DailyCounter, IndexedTorrent, PendingHashUpdate, StatsStore,
    StoreError, TorrentIndex,
};
use crate::tokenize::{search_tokens, Segmenter};
use crate::tree::{build_tree, Directory, FileEntry};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What a call to [`Indexer::index`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// A new record was written.
    Inserted,
    /// The record already existed; the backlog entry has now been marked.
    CaughtUp,
    /// The record existed and the backlog already knew.
    AlreadyIndexed,
    /// The metadata has no usable title or no files.
    Skipped,
}

impl IndexOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexOutcome::Inserted => "inserted",
            IndexOutcome::CaughtUp => "caught_up",
            IndexOutcome::AlreadyIndexed => "already_indexed",
            IndexOutcome::Skipped => "skipped",
        }
    }
}

/// Metadata reduced to what the index stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTorrent {
    pub title: String,
    pub total_size: u64,
    pub files: Vec<FileEntry>,
    pub file_tree: Directory,
    pub created_time: DateTime<Utc>,
}

/// Derive title, sizes, file paths, tree and creation time from `metadata`.
/// `None` when the file sizes do not add up to a `u64`.
pub fn normalize(metadata: &TorrentMetadata) -> Option<NormalizedTorrent> {
    let info = &metadata.info;

    let title = match info.name_utf8.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => info.name.trim().to_string(),
    };

    let files: Vec<FileEntry> = if info.is_multi_file() {
        info.files
            .iter()
            .map(|file| FileEntry::new(file_path(file), file.length))
            .collect()
    } else {
        vec![FileEntry::new(title.clone(), info.length.unwrap_or(0))]
    };

    let total_size = files
        .iter()
        .try_fold(0u64, |acc, f| acc.checked_add(f.size))?;
    let file_tree = build_tree(&files);

    let created_time = metadata
        .creation_date
        .filter(|secs| *secs != 0)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    Some(NormalizedTorrent {
        title,
        total_size,
        files,
        file_tree,
        created_time,
    })
}

/// UTF-8 segments when present, each trimmed, joined with `/`.
fn file_path(file: &FileDict) -> String {
    let segments = match &file.path_utf8 {
        Some(utf8) if !utf8.is_empty() => utf8,
        _ => &file.path,
    };
    let joined = segments
        .iter()
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join("/");
    joined.trim_end_matches('/').to_string()
}

/// Writes indexed records and their side effects.
pub struct Indexer {
    backlog: Arc<dyn BacklogStore>,
    index: Arc<dyn TorrentIndex>,
    stats: Arc<dyn StatsStore>,
    segmenter: Arc<dyn Segmenter>,
    scan_codes: Option<ScanCodeWriter>,
}

impl Indexer {
    pub fn new(
        backlog: Arc<dyn BacklogStore>,
        index: Arc<dyn TorrentIndex>,
        stats: Arc<dyn StatsStore>,
        segmenter: Arc<dyn Segmenter>,
    ) -> Self {
        Self {
            backlog,
            index,
            stats,
            segmenter,
            scan_codes: None,
        }
    }

    /// Write a scan-code artifact for every newly indexed torrent.
    pub fn with_scan_codes(mut self, writer: ScanCodeWriter) -> Self {
        self.scan_codes = Some(writer);
        self
    }

    /// Index `metadata`, or catch the backlog up if it is already indexed.
    pub fn index(&self, metadata: &TorrentMetadata) -> Result<IndexOutcome, IndexError> {
        let result = self.index_inner(metadata);
        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "error",
        };
        metrics::INDEX_OUTCOMES.with_label_values(&[label]).inc();
        result
    }

    /// If `infohash` is already in the index, make sure its backlog entry is
    /// marked and return the outcome. `None` when it still needs indexing.
    pub fn catch_up(&self, infohash: &InfoHash) -> Result<Option<IndexOutcome>, IndexError> {
        if !self.index.exists(infohash)? {
            return Ok(None);
        }
        self.mark_existing(infohash).map(Some)
    }

    fn index_inner(&self, metadata: &TorrentMetadata) -> Result<IndexOutcome, IndexError> {
        let infohash = &metadata.info_hash;

        if let Some(outcome) = self.catch_up(infohash)? {
            return Ok(outcome);
        }

        let Some(normalized) = normalize(metadata) else {
            warn!("Skipping {}: file sizes overflow", infohash);
            return Ok(IndexOutcome::Skipped);
        };
        if normalized.title.is_empty() || normalized.files.is_empty() {
            debug!("Skipping {}: no title or no files", infohash);
            return Ok(IndexOutcome::Skipped);
        }

        let tokens = search_tokens(self.segmenter.as_ref(), &normalized.title);
        let record = IndexedTorrent {
            id: uuid::Uuid::new_v4().to_string(),
            infohash: infohash.clone(),
            title: normalized.title,
            total_size: normalized.total_size,
            file_count: normalized.files.len() as u32,
            hotness: 1,
            files: normalized.files,
            file_tree: normalized.file_tree,
            search_tokens: tokens,
            view_count: 0,
            created_time: normalized.created_time,
            indexed_time: Utc::now(),
        };

        match self.index.insert(&record) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                debug!("Lost insert race for {}", infohash);
                return self.mark_existing(infohash);
            }
            Err(e) => return Err(e.into()),
        }

        self.mark_backlog_indexed(infohash)?;

        if let Err(e) = self
            .stats
            .increment(&day_key(Utc::now()), DailyCounter::Ingested)
        {
            warn!("Failed to bump ingested counter for {}: {}", infohash, e);
        }

        if let Some(writer) = &self.scan_codes {
            match writer.write(infohash) {
                Ok(path) => {
                    metrics::SCAN_CODES.with_label_values(&["written"]).inc();
                    debug!("Wrote scan code {}", path.display());
                }
                Err(e) => {
                    metrics::SCAN_CODES.with_label_values(&["failed"]).inc();
                    warn!("Failed to write scan code for {}: {}", infohash, e);
                }
            }
        }

        info!(
            "Indexed {} \"{}\" ({} files, {} bytes)",
            infohash, record.title, record.file_count, record.total_size
        );
        Ok(IndexOutcome::Inserted)
    }

    fn mark_existing(&self, infohash: &InfoHash) -> Result<IndexOutcome, IndexError> {
        match self.backlog.get(infohash)? {
            Some(entry) if !entry.indexed => {
                self.mark_backlog_indexed(infohash)?;
                Ok(IndexOutcome::CaughtUp)
            }
            _ => Ok(IndexOutcome::AlreadyIndexed),
        }
    }

    /// Torrents can be indexed without ever being discovered, so a missing
    /// backlog entry is not an error here.
    fn mark_backlog_indexed(&self, infohash: &InfoHash) -> Result<(), IndexError> {
        match self
            .backlog
            .update(infohash, &PendingHashUpdate::mark_indexed())
        {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => {
                debug!("No backlog entry for {}", infohash);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
