//! Torrent metadata (`.torrent`) decoding and identifier verification.
//!
//! The parser never trusts an identifier supplied from outside: the infohash
//! of a [`TorrentMetadata`] is always the SHA-1 of the canonically
//! re-encoded `info` dictionary.

mod parser;

pub use parser::parse;

use thiserror::Error;

use crate::infohash::InfoHash;

/// Errors that can occur when parsing torrent metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed bencode: {0}")]
    Bencode(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("field {field} has wrong type: expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("torrent describes no files")]
    Empty,

    #[error("file entry has no path segments")]
    EmptyPath,

    /// File lengths add up to more than a signed 64-bit byte count.
    #[error("total size overflows")]
    SizeOverflow,
}

/// One entry of a multi-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDict {
    pub length: u64,
    pub path: Vec<String>,
    /// Explicit UTF-8 path segments (`path.utf-8`), when the creator set them.
    pub path_utf8: Option<Vec<String>>,
    pub md5sum: Option<String>,
}

/// The `info` dictionary of a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDict {
    pub name: String,
    /// Explicit UTF-8 name (`name.utf-8`), when the creator set it.
    pub name_utf8: Option<String>,
    /// Single-file length; `None` for multi-file torrents.
    pub length: Option<u64>,
    /// Multi-file entries; empty for single-file torrents.
    pub files: Vec<FileDict>,
    pub piece_length: Option<u64>,
    pub pieces: Vec<u8>,
    pub private: bool,
}

impl InfoDict {
    pub fn is_multi_file(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Parsed torrent metadata. Transient: produced by [`parse`], consumed once
/// by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetadata {
    pub info: InfoDict,
    /// Recomputed from `info`, never read from the input.
    pub info_hash: InfoHash,
    pub announce: Option<String>,
    pub announce_list: Vec<Vec<String>>,
    /// Seconds since the Unix epoch, as declared by the creator.
    pub creation_date: Option<i64>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub encoding: Option<String>,
}
