//! Multi-mirror torrent metadata fetching.
//!
//! Mirrors are tried strictly in configured order. Any failure on one
//! mirror (transport, undecodable body, identifier mismatch) falls through to
//! the next; only when every mirror has failed does the fetch fail, and the
//! caller decides what that costs the backlog entry.

mod config;
mod http;
mod mirror;
mod types;

pub use config::{default_mirrors, FetcherConfig, MirrorConfig, MirrorKind};
pub use http::HttpTransport;
pub use mirror::{derive_key, MirrorRequest, KEYED_SIZE_PARAM};
pub use types::{AttemptError, FetchError, FetchedTorrent, MirrorFailure, TransportError};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::infohash::InfoHash;
use crate::metainfo;
use crate::metrics;

/// Transport used to issue one GET against a mirror.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    async fn get(&self, request: &MirrorRequest) -> Result<Vec<u8>, TransportError>;
}

/// Fetches and decodes torrent metadata through an ordered mirror list.
pub struct Fetcher {
    mirrors: Vec<MirrorConfig>,
    transport: Arc<dyn MirrorTransport>,
    verify_infohash: bool,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig, transport: Arc<dyn MirrorTransport>) -> Self {
        Self {
            mirrors: config.mirrors.clone(),
            transport,
            verify_infohash: config.verify_infohash,
        }
    }

    pub fn mirrors(&self) -> &[MirrorConfig] {
        &self.mirrors
    }

    /// Obtain and parse metadata for `infohash`.
    pub async fn fetch(&self, infohash: &InfoHash) -> Result<FetchedTorrent, FetchError> {
        let mut attempts = Vec::with_capacity(self.mirrors.len());

        for mirror in &self.mirrors {
            let started = Instant::now();
            let result = self.attempt(mirror, infohash).await;
            metrics::MIRROR_REQUEST_DURATION
                .with_label_values(&[mirror.name.as_str()])
                .observe(started.elapsed().as_secs_f64());

            match result {
                Ok(fetched) => {
                    metrics::MIRROR_ATTEMPTS
                        .with_label_values(&[mirror.name.as_str(), "success"])
                        .inc();
                    metrics::FETCHES_TOTAL.with_label_values(&["success"]).inc();
                    debug!(
                        "Fetched {} from mirror {} ({} bytes)",
                        infohash, mirror.name, fetched.body_len
                    );
                    return Ok(fetched);
                }
                Err(reason) => {
                    metrics::MIRROR_ATTEMPTS
                        .with_label_values(&[mirror.name.as_str(), reason.kind()])
                        .inc();
                    debug!("Mirror {} failed for {}: {}", mirror.name, infohash, reason);
                    attempts.push(MirrorFailure {
                        mirror: mirror.name.clone(),
                        reason,
                    });
                }
            }
        }

        metrics::FETCHES_TOTAL.with_label_values(&["exhausted"]).inc();
        Err(FetchError::Exhausted {
            infohash: infohash.clone(),
            attempts,
        })
    }

    async fn attempt(
        &self,
        mirror: &MirrorConfig,
        infohash: &InfoHash,
    ) -> Result<FetchedTorrent, AttemptError> {
        let request = mirror.request_for(infohash)?;
        let body = self.transport.get(&request).await?;
        let metadata = metainfo::parse(&body)?;

        if self.verify_infohash && metadata.info_hash != *infohash {
            return Err(AttemptError::InfoHashMismatch {
                expected: infohash.clone(),
                actual: metadata.info_hash,
            });
        }

        Ok(FetchedTorrent {
            mirror: mirror.name.clone(),
            metadata,
            body_len: body.len(),
        })
    }
}
