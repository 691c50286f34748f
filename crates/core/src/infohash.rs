//! Torrent identifier (v1 infohash) handling.
//!
//! Infohashes arrive from many places (crawler, mirrors, magnet links, user
//! uploads) in mixed case. Everything inside the pipeline works with the
//! canonical uppercase hex form carried by [`InfoHash`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hex characters in a v1 infohash.
pub const INFO_HASH_HEX_LEN: usize = 40;

/// Number of leading characters used as directory levels when sharding
/// per-hash artifacts on disk.
pub const SHARD_DEPTH: usize = 7;

/// Errors produced when parsing an infohash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfoHashError {
    #[error("infohash must be {INFO_HASH_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),

    #[error("infohash contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

/// A 40-character hex infohash in canonical uppercase form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Parse a hex infohash, accepting any case and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, InfoHashError> {
        let trimmed = input.trim();
        if trimmed.len() != INFO_HASH_HEX_LEN {
            return Err(InfoHashError::InvalidLength(trimmed.chars().count()));
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(InfoHashError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Build an infohash from a raw 20-byte digest.
    pub fn from_digest(digest: &[u8; 20]) -> Self {
        Self(hex::encode_upper(digest))
    }

    /// Canonical uppercase hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex form, as some mirrors expect it.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// The 20 raw bytes the hex string encodes.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Validated at construction, decoding cannot fail.
        if hex::decode_to_slice(&self.0, &mut out).is_err() {
            unreachable!("InfoHash holds validated hex");
        }
        out
    }

    /// Canonical magnet URI for this hash.
    pub fn magnet_uri(&self) -> String {
        format!("magnet:?xt=urn:btih:{}", self.0)
    }

    /// Directory under `root` holding per-hash artifacts, one level per
    /// leading hex character.
    pub fn shard_dir(&self, root: &Path) -> PathBuf {
        self.0
            .chars()
            .take(SHARD_DEPTH)
            .fold(root.to_path_buf(), |dir, c| dir.join(c.to_string()))
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InfoHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InfoHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for InfoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
