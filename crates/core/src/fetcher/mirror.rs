//! Per-mirror request construction.

use sha1::{Digest, Sha1};
use url::Url;

use crate::infohash::InfoHash;

use super::config::{MirrorConfig, MirrorKind};
use super::types::TransportError;

/// Fixed `size` query value the keyed mirror expects.
pub const KEYED_SIZE_PARAM: u64 = 226_920_869;

/// A fully resolved GET for one mirror attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    pub mirror: String,
    pub infohash: InfoHash,
    pub url: String,
    /// Value for the `Host` header.
    pub host: String,
}

/// Authentication token for keyed mirrors.
///
/// SHA-1 over the bytes `"bc"`, the 20 raw infohash bytes, and `"torrent"`,
/// hex encoded in lowercase. The raw bytes are concatenated, not their hex
/// spelling.
pub fn derive_key(infohash: &InfoHash) -> String {
    let mut hasher = Sha1::new();
    hasher.update(b"bc");
    hasher.update(infohash.to_bytes());
    hasher.update(b"torrent");
    hex::encode(hasher.finalize())
}

impl MirrorConfig {
    /// Build the request this mirror expects for `infohash`.
    pub fn request_for(&self, infohash: &InfoHash) -> Result<MirrorRequest, TransportError> {
        let base = self.base_url.trim_end_matches('/');
        let host = Url::parse(base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| TransportError::InvalidUrl(self.base_url.clone()))?;

        let upper = infohash.as_str();
        let url = match self.kind {
            MirrorKind::Keyed => format!(
                "{}/get_torrent?info_hash={}&size={}&key={}",
                base,
                infohash.to_lowercase(),
                KEYED_SIZE_PARAM,
                derive_key(infohash)
            ),
            MirrorKind::Sharded => format!(
                "{}/{}/{}/{}.torrent",
                base,
                &upper[..2],
                &upper[upper.len() - 2..],
                upper
            ),
            MirrorKind::Direct => format!("{}/torrent/{}.torrent", base, upper),
        };

        Ok(MirrorRequest {
            mirror: self.name.clone(),
            infohash: infohash.clone(),
            url,
            host,
        })
    }
}
