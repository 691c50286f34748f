//! Types for mirror fetching.

use std::fmt;

use thiserror::Error;

use crate::infohash::InfoHash;
use crate::metainfo::{ParseError, TorrentMetadata};

/// Errors from a single HTTP attempt against one mirror.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("Invalid mirror URL: {0}")]
    InvalidUrl(String),
}

/// Why one mirror attempt did not yield usable metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("undecodable torrent: {0}")]
    Parse(#[from] ParseError),

    #[error("infohash mismatch: requested {expected}, body hashes to {actual}")]
    InfoHashMismatch {
        expected: InfoHash,
        actual: InfoHash,
    },
}

impl AttemptError {
    /// Label for the `result` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Transport(TransportError::Timeout) => "timeout",
            AttemptError::Transport(_) => "transport_error",
            AttemptError::Parse(_) => "parse_error",
            AttemptError::InfoHashMismatch { .. } => "mismatch",
        }
    }
}

/// A failed attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFailure {
    pub mirror: String,
    pub reason: AttemptError,
}

impl fmt::Display for MirrorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.mirror, self.reason)
    }
}

/// Terminal fetch failure.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("all mirrors failed for {infohash} ({} attempts)", .attempts.len())]
    Exhausted {
        infohash: InfoHash,
        attempts: Vec<MirrorFailure>,
    },
}

/// Metadata successfully obtained from a mirror.
#[derive(Debug, Clone)]
pub struct FetchedTorrent {
    /// Name of the mirror that served it.
    pub mirror: String,
    pub metadata: TorrentMetadata,
    /// Size of the downloaded body in bytes.
    pub body_len: usize,
}
