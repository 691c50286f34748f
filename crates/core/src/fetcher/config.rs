//! Fetcher configuration.

use serde::{Deserialize, Serialize};

/// How a mirror addresses a torrent file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorKind {
    /// `{base}/get_torrent?info_hash=<lower>&size=…&key=<token>`
    Keyed,
    /// `{base}/<H[0..2]>/<H[38..40]>/<H>.torrent`
    Sharded,
    /// `{base}/torrent/<H>.torrent`
    Direct,
}

impl MirrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorKind::Keyed => "keyed",
            MirrorKind::Sharded => "sharded",
            MirrorKind::Direct => "direct",
        }
    }
}

/// One metadata mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Label used in logs and metrics.
    pub name: String,
    pub kind: MirrorKind,
    /// Scheme and authority, optionally with a path prefix.
    pub base_url: String,
}

impl MirrorConfig {
    pub fn new(name: impl Into<String>, kind: MirrorKind, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: base_url.into(),
        }
    }
}

/// Configuration for the mirror fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Connection establishment timeout per attempt (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Overall deadline per attempt, body included (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Reject bodies whose recomputed infohash differs from the requested one.
    #[serde(default = "default_verify")]
    pub verify_infohash: bool,

    /// Mirrors in the order they are tried.
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<MirrorConfig>,
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_verify() -> bool {
    true
}

pub fn default_mirrors() -> Vec<MirrorConfig> {
    vec![
        MirrorConfig::new(
            "bitcomet",
            MirrorKind::Keyed,
            "http://torrent-cache.bitcomet.org:36869",
        ),
        MirrorConfig::new("n0808", MirrorKind::Sharded, "http://bt.box.n0808.com"),
        MirrorConfig::new("torcache", MirrorKind::Direct, "https://torcache.net"),
    ]
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_timeout_ms(),
            request_timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            verify_infohash: default_verify(),
            mirrors: default_mirrors(),
        }
    }
}
