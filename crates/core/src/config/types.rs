use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::fetcher::{FetcherConfig, MirrorKind};
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("magnetdex.db")
}

/// Indexer side effects
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    /// Root of the sharded scan-code tree.
    #[serde(default = "default_scan_code_dir")]
    pub scan_code_dir: PathBuf,
    /// Write a scan-code image for every newly indexed torrent.
    #[serde(default = "default_scan_codes")]
    pub scan_codes: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            scan_code_dir: default_scan_code_dir(),
            scan_codes: default_scan_codes(),
        }
    }
}

fn default_scan_code_dir() -> PathBuf {
    PathBuf::from("static/qrcode")
}

fn default_scan_codes() -> bool {
    true
}

/// Sanitized config for API responses (mirror credentials dropped)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub fetcher: SanitizedFetcherConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetcherConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub verify_infohash: bool,
    pub mirrors: Vec<SanitizedMirrorConfig>,
}

/// Mirror reduced to its host; any userinfo or query in the base URL is hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMirrorConfig {
    pub name: String,
    pub kind: MirrorKind,
    pub host: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            scheduler: config.scheduler.clone(),
            fetcher: SanitizedFetcherConfig {
                connect_timeout_ms: config.fetcher.connect_timeout_ms,
                request_timeout_ms: config.fetcher.request_timeout_ms,
                verify_infohash: config.fetcher.verify_infohash,
                mirrors: config
                    .fetcher
                    .mirrors
                    .iter()
                    .map(|m| SanitizedMirrorConfig {
                        name: m.name.clone(),
                        kind: m.kind,
                        host: url::Url::parse(&m.base_url)
                            .ok()
                            .and_then(|u| u.host_str().map(str::to_string))
                            .unwrap_or_default(),
                    })
                    .collect(),
            },
            indexer: config.indexer.clone(),
        }
    }
}
