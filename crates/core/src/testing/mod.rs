//! Testing utilities and mock implementations.
//!
//! Mirrors and the scan-code renderer are the only collaborators that leave
//! the process, so they are the ones with mocks here. The store has a real
//! in-memory SQLite variant (`SqliteStore::in_memory`) and needs no mock.
//!
//! # Example
//!
//! ```rust,ignore
//! use magnetdex_core::testing::{fixtures, MockTransport};
//!
//! let transport = MockTransport::new();
//! let bytes = fixtures::single_file_torrent("demo.iso", 104_857_600);
//! transport.serve(&fixtures::info_hash_of(&bytes), bytes).await;
//! ```

mod mock_scan_code;
mod mock_transport;

pub use mock_scan_code::MockScanCodeRenderer;
pub use mock_transport::MockTransport;

/// Bencoded `.torrent` builders.
pub mod fixtures {
    use std::collections::HashMap;

    use serde_bencode::value::Value;

    use crate::infohash::InfoHash;

    pub const DEFAULT_ANNOUNCE: &str = "udp://tracker.example.org:6969";
    pub const DEFAULT_CREATION_DATE: i64 = 1_400_000_000;

    struct FixtureFile {
        path: Vec<String>,
        path_utf8: Option<Vec<String>>,
        length: u64,
    }

    /// Builder for syntactically valid torrent files.
    pub struct TorrentBuilder {
        name: String,
        name_utf8: Option<String>,
        length: Option<u64>,
        files: Vec<FixtureFile>,
        announce: Option<String>,
        creation_date: Option<i64>,
        comment: Option<String>,
    }

    impl TorrentBuilder {
        fn base(name: &str) -> Self {
            Self {
                name: name.to_string(),
                name_utf8: None,
                length: None,
                files: Vec::new(),
                announce: Some(DEFAULT_ANNOUNCE.to_string()),
                creation_date: Some(DEFAULT_CREATION_DATE),
                comment: None,
            }
        }

        pub fn single_file(name: &str, length: u64) -> Self {
            Self {
                length: Some(length),
                ..Self::base(name)
            }
        }

        /// Multi-file torrent; add entries with [`file`](Self::file).
        pub fn multi_file(name: &str) -> Self {
            Self::base(name)
        }

        pub fn name_utf8(mut self, name: &str) -> Self {
            self.name_utf8 = Some(name.to_string());
            self
        }

        pub fn file(mut self, path: &[&str], length: u64) -> Self {
            self.files.push(FixtureFile {
                path: to_strings(path),
                path_utf8: None,
                length,
            });
            self
        }

        pub fn file_with_utf8(mut self, path: &[&str], path_utf8: &[&str], length: u64) -> Self {
            self.files.push(FixtureFile {
                path: to_strings(path),
                path_utf8: Some(to_strings(path_utf8)),
                length,
            });
            self
        }

        pub fn comment(mut self, comment: &str) -> Self {
            self.comment = Some(comment.to_string());
            self
        }

        pub fn creation_date(mut self, date: Option<i64>) -> Self {
            self.creation_date = date;
            self
        }

        pub fn build(self) -> Vec<u8> {
            let mut info = HashMap::new();
            info.insert(key("name"), bytes(&self.name));
            if let Some(name_utf8) = &self.name_utf8 {
                info.insert(key("name.utf-8"), bytes(name_utf8));
            }
            if let Some(length) = self.length {
                info.insert(key("length"), Value::Int(length as i64));
            }
            if !self.files.is_empty() {
                let files = self.files.iter().map(file_value).collect();
                info.insert(key("files"), Value::List(files));
            }
            info.insert(key("piece length"), Value::Int(262_144));
            info.insert(key("pieces"), Value::Bytes(vec![0u8; 20]));

            let mut root = HashMap::new();
            root.insert(key("info"), Value::Dict(info));
            if let Some(announce) = &self.announce {
                root.insert(key("announce"), bytes(announce));
            }
            if let Some(date) = self.creation_date {
                root.insert(key("creation date"), Value::Int(date));
            }
            if let Some(comment) = &self.comment {
                root.insert(key("comment"), bytes(comment));
            }
            serde_bencode::to_bytes(&Value::Dict(root)).expect("fixture must encode")
        }
    }

    fn file_value(file: &FixtureFile) -> Value {
        let mut dict = HashMap::new();
        dict.insert(key("length"), Value::Int(file.length as i64));
        dict.insert(key("path"), string_list(&file.path));
        if let Some(path_utf8) = &file.path_utf8 {
            dict.insert(key("path.utf-8"), string_list(path_utf8));
        }
        Value::Dict(dict)
    }

    fn key(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    fn bytes(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    fn string_list(items: &[String]) -> Value {
        Value::List(items.iter().map(|s| bytes(s)).collect())
    }

    fn to_strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// A single-file torrent with default tracker and creation date.
    pub fn single_file_torrent(name: &str, length: u64) -> Vec<u8> {
        TorrentBuilder::single_file(name, length).build()
    }

    /// The two-file `docs/` torrent used across the tree tests.
    pub fn docs_torrent() -> Vec<u8> {
        TorrentBuilder::multi_file("docs")
            .file(&["docs", "readme.txt"], 10)
            .file(&["docs", "sub", "data.bin"], 20)
            .build()
    }

    /// The infohash a fixture will parse to.
    pub fn info_hash_of(torrent: &[u8]) -> InfoHash {
        crate::metainfo::parse(torrent)
            .expect("fixture must parse")
            .info_hash
    }

    /// An infohash made of one repeated hex character, e.g. `AAAA…`.
    pub fn repeated_hash(c: char) -> InfoHash {
        InfoHash::parse(&c.to_string().repeat(40)).expect("hex character")
    }
}
