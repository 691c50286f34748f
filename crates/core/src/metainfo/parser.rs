//! Typed view over a decoded `.torrent` dictionary.

use std::collections::HashMap;

use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use crate::infohash::InfoHash;

use super::{FileDict, InfoDict, ParseError, TorrentMetadata};

type Dict = HashMap<Vec<u8>, Value>;

/// Parse raw `.torrent` bytes and recompute the infohash from the `info`
/// dictionary.
///
/// Supports both single-file and multi-file torrents. Any structural problem
/// fails the whole parse; no partial metadata is returned.
pub fn parse(bytes: &[u8]) -> Result<TorrentMetadata, ParseError> {
    let root: Value = serde_bencode::from_bytes(bytes).map_err(bencode_error)?;
    let root = as_dict(&root).ok_or(ParseError::WrongType {
        field: "<root>",
        expected: "dictionary",
    })?;

    let info_value = root
        .get(b"info".as_slice())
        .ok_or(ParseError::MissingField("info"))?;
    let info_dict = as_dict(info_value).ok_or(ParseError::WrongType {
        field: "info",
        expected: "dictionary",
    })?;

    let info = parse_info(info_dict)?;
    let info_hash = compute_info_hash(info_value)?;

    Ok(TorrentMetadata {
        info,
        info_hash,
        announce: opt_string(root, "announce")?,
        announce_list: parse_announce_list(root)?,
        creation_date: opt_int(root, "creation date")?,
        comment: opt_string(root, "comment")?,
        created_by: opt_string(root, "created by")?,
        encoding: opt_string(root, "encoding")?,
    })
}

/// SHA-1 over the canonical encoding of the `info` value. The encoder
/// writes dictionary keys in sorted order regardless of input order.
fn compute_info_hash(info: &Value) -> Result<InfoHash, ParseError> {
    let canonical = serde_bencode::to_bytes(info).map_err(bencode_error)?;
    let digest: [u8; 20] = Sha1::digest(&canonical).into();
    Ok(InfoHash::from_digest(&digest))
}

fn bencode_error(err: serde_bencode::Error) -> ParseError {
    ParseError::Bencode(err.to_string())
}

fn as_dict(value: &Value) -> Option<&Dict> {
    match value {
        Value::Dict(dict) => Some(dict),
        _ => None,
    }
}

fn as_list(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(items) => Some(items),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Bytes(bytes) => Some(bytes),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

fn parse_info(dict: &Dict) -> Result<InfoDict, ParseError> {
    let name = opt_string(dict, "name")?.ok_or(ParseError::MissingField("name"))?;
    let name_utf8 = opt_string(dict, "name.utf-8")?;
    let length = opt_length(dict, "length")?;

    let files = match dict.get(b"files".as_slice()) {
        Some(value) => {
            let entries = as_list(value).ok_or(ParseError::WrongType {
                field: "files",
                expected: "list",
            })?;
            entries
                .iter()
                .map(parse_file)
                .collect::<Result<Vec<_>, _>>()?
        }
        None => Vec::new(),
    };

    if files.is_empty() && length.is_none() {
        return Err(ParseError::Empty);
    }
    total_size(length, &files)?;

    let pieces = match dict.get(b"pieces".as_slice()) {
        Some(value) => as_bytes(value)
            .ok_or(ParseError::WrongType {
                field: "pieces",
                expected: "byte string",
            })?
            .to_vec(),
        None => Vec::new(),
    };

    Ok(InfoDict {
        name,
        name_utf8,
        length,
        files,
        piece_length: opt_length(dict, "piece length")?,
        pieces,
        private: opt_int(dict, "private")?.unwrap_or(0) == 1,
    })
}

fn parse_file(value: &Value) -> Result<FileDict, ParseError> {
    let dict = as_dict(value).ok_or(ParseError::WrongType {
        field: "files[]",
        expected: "dictionary",
    })?;

    let length = opt_length(dict, "length")?.ok_or(ParseError::MissingField("files[].length"))?;
    let path =
        opt_string_list(dict, "path")?.ok_or(ParseError::MissingField("files[].path"))?;
    if path.is_empty() {
        return Err(ParseError::EmptyPath);
    }

    Ok(FileDict {
        length,
        path,
        path_utf8: opt_string_list(dict, "path.utf-8")?,
        md5sum: opt_string(dict, "md5sum")?,
    })
}

/// Sum of all declared lengths; must fit the index's signed size column.
fn total_size(length: Option<u64>, files: &[FileDict]) -> Result<u64, ParseError> {
    files
        .iter()
        .try_fold(length.unwrap_or(0), |acc, file| acc.checked_add(file.length))
        .filter(|total| i64::try_from(*total).is_ok())
        .ok_or(ParseError::SizeOverflow)
}

fn parse_announce_list(root: &Dict) -> Result<Vec<Vec<String>>, ParseError> {
    let Some(value) = root.get(b"announce-list".as_slice()) else {
        return Ok(Vec::new());
    };
    let tiers = as_list(value).ok_or(ParseError::WrongType {
        field: "announce-list",
        expected: "list of lists",
    })?;
    tiers
        .iter()
        .map(|tier| -> Result<Vec<String>, ParseError> {
            as_list(tier)
                .ok_or(ParseError::WrongType {
                    field: "announce-list",
                    expected: "list of lists",
                })?
                .iter()
                .map(|url| {
                    as_bytes(url)
                        .map(bytes_to_string)
                        .ok_or(ParseError::WrongType {
                            field: "announce-list",
                            expected: "byte string",
                        })
                })
                .collect()
        })
        .collect()
}

fn opt_string(dict: &Dict, key: &'static str) -> Result<Option<String>, ParseError> {
    match dict.get(key.as_bytes()) {
        None => Ok(None),
        Some(value) => as_bytes(value)
            .map(|b| Some(bytes_to_string(b)))
            .ok_or(ParseError::WrongType {
                field: key,
                expected: "byte string",
            }),
    }
}

fn opt_string_list(dict: &Dict, key: &'static str) -> Result<Option<Vec<String>>, ParseError> {
    let Some(value) = dict.get(key.as_bytes()) else {
        return Ok(None);
    };
    let wrong_type = ParseError::WrongType {
        field: key,
        expected: "list of byte strings",
    };
    let items = as_list(value).ok_or_else(|| wrong_type.clone())?;
    items
        .iter()
        .map(|item| {
            as_bytes(item)
                .map(bytes_to_string)
                .ok_or_else(|| wrong_type.clone())
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn opt_int(dict: &Dict, key: &'static str) -> Result<Option<i64>, ParseError> {
    match dict.get(key.as_bytes()) {
        None => Ok(None),
        Some(value) => as_int(value).map(Some).ok_or(ParseError::WrongType {
            field: key,
            expected: "integer",
        }),
    }
}

fn opt_length(dict: &Dict, key: &'static str) -> Result<Option<u64>, ParseError> {
    opt_int(dict, key)?
        .map(|n| {
            u64::try_from(n).map_err(|_| ParseError::WrongType {
                field: key,
                expected: "non-negative integer",
            })
        })
        .transpose()
}

/// Convert bytes to a string, falling back to lossy decoding for legacy
/// non-UTF-8 names.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_parse_single_file() {
        let bytes = fixtures::single_file_torrent("demo.iso", 104_857_600);
        let meta = parse(&bytes).unwrap();

        assert_eq!(meta.info.name, "demo.iso");
        assert_eq!(meta.info.length, Some(104_857_600));
        assert!(!meta.info.is_multi_file());
        assert_eq!(meta.announce.as_deref(), Some("udp://tracker.example.org:6969"));
        assert_eq!(meta.creation_date, Some(1_400_000_000));
    }

    #[test]
    fn test_parse_multi_file_with_utf8_variants() {
        let bytes = fixtures::TorrentBuilder::multi_file("docs")
            .name_utf8("文档")
            .file_with_utf8(&["readme.txt"], &["说明.txt"], 10)
            .file(&["sub", "data.bin"], 20)
            .build();
        let meta = parse(&bytes).unwrap();

        assert!(meta.info.is_multi_file());
        assert_eq!(meta.info.name_utf8.as_deref(), Some("文档"));
        assert_eq!(meta.info.files.len(), 2);
        assert_eq!(
            meta.info.files[0].path_utf8.as_deref(),
            Some(&["说明.txt".to_string()][..])
        );
        assert_eq!(meta.info.files[1].path, vec!["sub", "data.bin"]);
        assert_eq!(meta.info.files[1].length, 20);
    }

    #[test]
    fn test_info_hash_is_sha1_of_canonical_info() {
        // Keys out of order inside `info`; the hash covers the sorted form.
        let bytes = b"d4:infod4:name5:a.bin12:piece lengthi16384e6:lengthi5eee";
        let meta = parse(bytes).unwrap();

        let canonical = b"d6:lengthi5e4:name5:a.bin12:piece lengthi16384ee";
        let expected: [u8; 20] = Sha1::digest(canonical).into();
        assert_eq!(meta.info_hash, InfoHash::from_digest(&expected));
    }

    #[test]
    fn test_info_hash_matches_raw_info_when_already_canonical() {
        let bytes = fixtures::single_file_torrent("demo.iso", 104_857_600);
        let meta = parse(&bytes).unwrap();

        let start = bytes.windows(6).position(|w| w == b"4:info").unwrap() + 6;
        let raw_info = &bytes[start..bytes.len() - 1];
        let expected: [u8; 20] = Sha1::digest(raw_info).into();
        assert_eq!(meta.info_hash, InfoHash::from_digest(&expected));
    }

    #[test]
    fn test_info_hash_is_deterministic() {
        let bytes = fixtures::TorrentBuilder::multi_file("album")
            .file(&["01.flac"], 1)
            .file(&["02.flac"], 2)
            .build();
        let first = parse(&bytes).unwrap().info_hash;
        for _ in 0..5 {
            assert_eq!(parse(&bytes).unwrap().info_hash, first);
        }
    }

    #[test]
    fn test_info_hash_ignores_fields_outside_info() {
        let plain = fixtures::TorrentBuilder::single_file("a.bin", 5).build();
        let commented = fixtures::TorrentBuilder::single_file("a.bin", 5)
            .comment("different outer metadata")
            .build();
        assert_eq!(
            parse(&plain).unwrap().info_hash,
            parse(&commented).unwrap().info_hash
        );
    }

    #[test]
    fn test_parse_invalid_torrent() {
        assert!(matches!(
            parse(b"not a valid torrent"),
            Err(ParseError::Bencode(_))
        ));
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_parse_missing_info() {
        assert_eq!(
            parse(b"d8:announce3:urle"),
            Err(ParseError::MissingField("info"))
        );
    }

    #[test]
    fn test_parse_missing_name() {
        assert_eq!(
            parse(b"d4:infod6:lengthi1eee"),
            Err(ParseError::MissingField("name"))
        );
    }

    #[test]
    fn test_parse_without_files_or_length() {
        assert_eq!(parse(b"d4:infod4:name1:xee"), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_type_mismatch() {
        assert_eq!(
            parse(b"d4:infod6:length3:abc4:name1:xee"),
            Err(ParseError::WrongType {
                field: "length",
                expected: "integer",
            })
        );
        assert!(matches!(
            parse(b"d4:infoi1ee"),
            Err(ParseError::WrongType { field: "info", .. })
        ));
    }

    #[test]
    fn test_parse_negative_length() {
        assert!(matches!(
            parse(b"d4:infod6:lengthi-1e4:name1:xee"),
            Err(ParseError::WrongType { field: "length", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_file_path() {
        let bytes = fixtures::TorrentBuilder::multi_file("docs")
            .file(&["readme.txt"], 10)
            .file(&[], 20)
            .build();
        assert_eq!(parse(&bytes), Err(ParseError::EmptyPath));
    }

    #[test]
    fn test_parse_rejects_overflowing_total_size() {
        let bytes = fixtures::TorrentBuilder::multi_file("huge")
            .file(&["a.bin"], i64::MAX as u64)
            .file(&["b.bin"], i64::MAX as u64)
            .file(&["c.bin"], i64::MAX as u64)
            .build();
        assert_eq!(parse(&bytes), Err(ParseError::SizeOverflow));

        let bytes = fixtures::TorrentBuilder::multi_file("edge")
            .file(&["a.bin"], i64::MAX as u64 - 1)
            .file(&["b.bin"], 1)
            .build();
        assert_eq!(parse(&bytes).unwrap().info.files.len(), 2);
    }

    #[test]
    fn test_bytes_to_string_invalid_utf8() {
        let invalid = vec![0xff, 0xfe, 0x68, 0x65, 0x6c, 0x6c, 0x6f];
        assert!(bytes_to_string(&invalid).contains("hello"));
    }
}
