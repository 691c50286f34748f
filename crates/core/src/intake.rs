//! Entry points that put infohashes into the pipeline.
//!
//! The discovery crawler calls [`Intake::record_discovery`]; manual
//! submissions arrive as a magnet link or as an uploaded `.torrent` file.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetcher::Fetcher;
use crate::indexer::{IndexError, IndexOutcome, Indexer};
use crate::infohash::InfoHash;
use crate::metainfo::{self, ParseError};
use crate::metrics;
use crate::store::{
    day_key, BacklogStore, DailyCounter, PendingHash, StatsStore, StoreError, TorrentIndex,
};

/// `xt=urn:btih:` at any position in the query.
static MAGNET_BTIH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)magnet:\?(?:.*&)?xt=urn:btih:([^&\s]+)").unwrap());

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Invalid magnet link: {0}")]
    InvalidMagnet(String),

    #[error("Invalid torrent file: {0}")]
    Parse(#[from] ParseError),

    #[error("No mirror has metadata for {0}")]
    NotFound(InfoHash),

    #[error("Torrent {0} has no usable title or files")]
    Rejected(InfoHash),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of recording one discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum DiscoveryOutcome {
    /// A new backlog entry was created.
    New,
    /// The hash was already known; its hotness is now `hotness`.
    Rediscovered { hotness: u64 },
}

/// Extract the infohash from a magnet URI, or accept a bare 40-hex hash.
pub fn parse_magnet(input: &str) -> Result<InfoHash, IntakeError> {
    let decoded = urlencoding::decode(input.trim())
        .map_err(|_| IntakeError::InvalidMagnet(input.to_string()))?;

    let candidate = match MAGNET_BTIH.captures(&decoded) {
        Some(caps) => caps[1].trim().to_string(),
        None => decoded.trim().to_string(),
    };

    InfoHash::parse(&candidate).map_err(|_| IntakeError::InvalidMagnet(input.to_string()))
}

pub struct Intake {
    backlog: Arc<dyn BacklogStore>,
    index: Arc<dyn TorrentIndex>,
    stats: Arc<dyn StatsStore>,
    fetcher: Arc<Fetcher>,
    indexer: Arc<Indexer>,
}

impl Intake {
    pub fn new(
        backlog: Arc<dyn BacklogStore>,
        index: Arc<dyn TorrentIndex>,
        stats: Arc<dyn StatsStore>,
        fetcher: Arc<Fetcher>,
        indexer: Arc<Indexer>,
    ) -> Self {
        Self {
            backlog,
            index,
            stats,
            fetcher,
            indexer,
        }
    }

    /// Record that `infohash` was seen on the network.
    ///
    /// New hashes enter the backlog; known hashes get hotter, both in the
    /// backlog and in the index if they are already there.
    pub fn record_discovery(&self, infohash: &InfoHash) -> Result<DiscoveryOutcome, IntakeError> {
        if self.insert_backlog(infohash)? {
            metrics::DISCOVERIES.with_label_values(&["new"]).inc();
            return Ok(DiscoveryOutcome::New);
        }

        let hotness = self.backlog.increment_hotness(infohash)?;
        match self.index.increment_hotness(infohash) {
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        metrics::DISCOVERIES.with_label_values(&["rediscovered"]).inc();
        debug!("Rediscovered {} (hotness {})", infohash, hotness);
        Ok(DiscoveryOutcome::Rediscovered { hotness })
    }

    /// Submit a magnet link: queue it and, unless it is already indexed,
    /// fetch and index it right away.
    pub async fn submit_magnet(&self, input: &str) -> Result<InfoHash, IntakeError> {
        let infohash = parse_magnet(input)?;
        self.insert_backlog(&infohash)?;

        if self.indexer.catch_up(&infohash)?.is_some() {
            return Ok(infohash);
        }

        let fetched = match self.fetcher.fetch(&infohash).await {
            Ok(fetched) => fetched,
            Err(e) => {
                info!("Submitted magnet {} not found: {}", infohash, e);
                if let Err(e) = self.backlog.increment_failures(&infohash) {
                    warn!("Failed to record failure for {}: {}", infohash, e);
                }
                return Err(IntakeError::NotFound(infohash));
            }
        };

        match self.indexer.index(&fetched.metadata)? {
            IndexOutcome::Skipped => Err(IntakeError::Rejected(infohash)),
            _ => Ok(infohash),
        }
    }

    /// Submit an uploaded `.torrent` file and index it.
    pub fn submit_torrent(&self, bytes: &[u8]) -> Result<InfoHash, IntakeError> {
        let metadata = metainfo::parse(bytes)?;
        let infohash = metadata.info_hash.clone();
        self.insert_backlog(&infohash)?;

        match self.indexer.index(&metadata)? {
            IndexOutcome::Skipped => Err(IntakeError::Rejected(infohash)),
            _ => Ok(infohash),
        }
    }

    /// Create a backlog entry if none exists. Returns whether one was created.
    fn insert_backlog(&self, infohash: &InfoHash) -> Result<bool, IntakeError> {
        match self.backlog.insert(&PendingHash::new(infohash.clone())) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self
            .stats
            .increment(&day_key(Utc::now()), DailyCounter::Discovered)
        {
            warn!("Failed to bump discovered counter for {}: {}", infohash, e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetcherConfig;
    use crate::store::SqliteStore;
    use crate::testing::fixtures::{self, repeated_hash};
    use crate::testing::MockTransport;
    use crate::tokenize::JiebaSegmenter;

    fn create_intake() -> (Intake, Arc<SqliteStore>, Arc<MockTransport>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let transport = Arc::new(MockTransport::new());
        let fetcher = Arc::new(Fetcher::new(&FetcherConfig::default(), transport.clone()));
        let indexer = Arc::new(Indexer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(JiebaSegmenter),
        ));
        let intake = Intake::new(store.clone(), store.clone(), store.clone(), fetcher, indexer);
        (intake, store, transport)
    }

    fn today(store: &SqliteStore) -> crate::store::DailyStats {
        StatsStore::get(store, &day_key(Utc::now()))
            .unwrap()
            .unwrap_or_default()
    }

    #[test]
    fn test_parse_magnet() {
        let expected = "C12FE1C06BBA254A9DC9F519B335AA7C1367A88A";

        let hash = parse_magnet(
            "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a&dn=demo.iso",
        )
        .unwrap();
        assert_eq!(hash.as_str(), expected);

        let hash = parse_magnet("MAGNET:?XT=URN:BTIH:C12FE1C06BBA254A9DC9F519B335AA7C1367A88A")
            .unwrap();
        assert_eq!(hash.as_str(), expected);

        let hash = parse_magnet(&format!("  {}  ", expected.to_lowercase())).unwrap();
        assert_eq!(hash.as_str(), expected);

        let hash = parse_magnet(
            "magnet%3A%3Fxt%3Durn%3Abtih%3Ac12fe1c06bba254a9dc9f519b335aa7c1367a88a",
        )
        .unwrap();
        assert_eq!(hash.as_str(), expected);
    }

    #[test]
    fn test_parse_magnet_xt_after_other_params() {
        let expected = "C12FE1C06BBA254A9DC9F519B335AA7C1367A88A";

        let hash = parse_magnet(
            "magnet:?dn=x&xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a",
        )
        .unwrap();
        assert_eq!(hash.as_str(), expected);

        let hash = parse_magnet(
            "magnet:?dn=demo.iso&tr=udp%3A%2F%2Ftracker.example.org%3A6969\
             &xt=urn:btih:C12FE1C06BBA254A9DC9F519B335AA7C1367A88A&xl=10",
        )
        .unwrap();
        assert_eq!(hash.as_str(), expected);
    }

    #[test]
    fn test_parse_magnet_rejects_garbage() {
        for input in ["", "magnet:?xt=urn:btih:XYZ", "not a magnet", "magnet:?dn=x"] {
            assert!(
                matches!(parse_magnet(input), Err(IntakeError::InvalidMagnet(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_record_discovery_new_and_rediscovered() {
        let (intake, store, _) = create_intake();
        let hash = repeated_hash('A');

        assert_eq!(intake.record_discovery(&hash).unwrap(), DiscoveryOutcome::New);
        assert_eq!(
            intake.record_discovery(&hash).unwrap(),
            DiscoveryOutcome::Rediscovered { hotness: 2 }
        );

        let entry = BacklogStore::get(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(entry.hotness, 2);
        assert_eq!(today(&store).discovered, 1);
    }

    #[test]
    fn test_rediscovery_heats_indexed_record() {
        let (intake, store, _) = create_intake();
        let bytes = fixtures::single_file_torrent("demo.iso", 1);
        let hash = intake.submit_torrent(&bytes).unwrap();

        intake.record_discovery(&hash).unwrap();
        let record = TorrentIndex::get(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(record.hotness, 2);
    }

    #[tokio::test]
    async fn test_submit_magnet_fetches_and_indexes() {
        let (intake, store, transport) = create_intake();
        let bytes = fixtures::single_file_torrent("demo.iso", 104_857_600);
        let hash = fixtures::info_hash_of(&bytes);
        transport.serve(&hash, bytes).await;

        let submitted = intake.submit_magnet(&hash.magnet_uri()).await.unwrap();
        assert_eq!(submitted, hash);
        assert!(store.exists(&hash).unwrap());
        assert!(BacklogStore::get(store.as_ref(), &hash)
            .unwrap()
            .unwrap()
            .indexed);

        // Second submission is answered from the index.
        transport.clear_recorded().await;
        intake.submit_magnet(hash.as_str()).await.unwrap();
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_submit_magnet_not_found() {
        let (intake, store, _) = create_intake();
        let hash = repeated_hash('B');

        let err = intake.submit_magnet(hash.as_str()).await.unwrap_err();
        assert!(matches!(err, IntakeError::NotFound(h) if h == hash));

        let entry = BacklogStore::get(store.as_ref(), &hash).unwrap().unwrap();
        assert_eq!(entry.failure_count, 1);
        assert!(!entry.indexed);
    }

    #[test]
    fn test_submit_torrent() {
        let (intake, store, _) = create_intake();
        let bytes = fixtures::docs_torrent();

        let hash = intake.submit_torrent(&bytes).unwrap();
        assert_eq!(hash, fixtures::info_hash_of(&bytes));

        let entry = BacklogStore::get(store.as_ref(), &hash).unwrap().unwrap();
        assert!(entry.indexed);
        let stats = today(&store);
        assert_eq!(stats.discovered, 1);
        assert_eq!(stats.ingested, 1);
    }

    #[test]
    fn test_submit_torrent_rejects_garbage() {
        let (intake, _, _) = create_intake();
        assert!(matches!(
            intake.submit_torrent(b"not bencode"),
            Err(IntakeError::Parse(_))
        ));
    }
}
