pub mod config;
pub mod fetcher;
pub mod indexer;
pub mod infohash;
pub mod intake;
pub mod metainfo;
pub mod metrics;
pub mod scan_code;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod tokenize;
pub mod tree;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use fetcher::{
    FetchError, FetchedTorrent, Fetcher, FetcherConfig, HttpTransport, MirrorConfig, MirrorKind,
    MirrorTransport,
};
pub use indexer::{IndexError, IndexOutcome, Indexer};
pub use infohash::{InfoHash, InfoHashError};
pub use intake::{DiscoveryOutcome, Intake, IntakeError};
pub use metainfo::{parse, ParseError, TorrentMetadata};
pub use scan_code::{QrCodeRenderer, ScanCodeError, ScanCodeRenderer, ScanCodeWriter};
pub use scheduler::{IngestScheduler, SchedulerConfig, SchedulerError, SchedulerStatus};
pub use store::{BacklogStore, SqliteStore, StatsStore, StoreError, TorrentIndex};
pub use tokenize::{JiebaSegmenter, Segmenter};
pub use tree::{build_tree, Directory, FileEntry};
