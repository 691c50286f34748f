//! reqwest-backed mirror transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONNECTION, HOST, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use super::config::FetcherConfig;
use super::mirror::MirrorRequest;
use super::types::TransportError;
use super::MirrorTransport;

/// Plain HTTP GET against public mirrors.
///
/// The response status is not inspected: whatever body arrives is handed to
/// the parser, which rejects error pages on its own.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &FetcherConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: config.user_agent.clone(),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl MirrorTransport for HttpTransport {
    async fn get(&self, request: &MirrorRequest) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(&request.url)
            .header(USER_AGENT, &self.user_agent)
            .header(HOST, &request.host)
            .header(ACCEPT, "*/*")
            .header(CONNECTION, "Keep-Alive")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        debug!(
            "Mirror {} answered {} for {}",
            request.mirror,
            response.status(),
            request.infohash
        );

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::config::{MirrorConfig, MirrorKind};
    use crate::infohash::InfoHash;

    #[tokio::test]
    async fn test_unreachable_mirror_is_transport_error() {
        let config = FetcherConfig {
            connect_timeout_ms: 200,
            request_timeout_ms: 200,
            ..FetcherConfig::default()
        };
        let transport = HttpTransport::new(&config);

        // Port 1 on loopback is closed on any sane test machine.
        let mirror = MirrorConfig::new("closed", MirrorKind::Direct, "http://127.0.0.1:1");
        let request = mirror
            .request_for(&InfoHash::parse(&"B".repeat(40)).unwrap())
            .unwrap();

        let result = transport.get(&request).await;
        assert!(matches!(
            result,
            Err(TransportError::Connect(_)) | Err(TransportError::Timeout) | Err(TransportError::Request(_))
        ));
    }
}
