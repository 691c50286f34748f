//! Mock mirror transport for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::fetcher::{MirrorRequest, MirrorTransport, TransportError};
use crate::infohash::InfoHash;

/// Mock implementation of the MirrorTransport trait.
///
/// Answers requests in this order:
/// 1. Scripted responses, consumed one per request regardless of mirror.
/// 2. A body registered for the requested infohash with [`serve`](Self::serve).
/// 3. Otherwise a connection error, so an unknown hash exhausts every mirror.
///
/// Every request is recorded for assertions.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Arc<RwLock<VecDeque<Result<Vec<u8>, TransportError>>>>,
    bodies: Arc<RwLock<HashMap<InfoHash, Vec<u8>>>>,
    requests: Arc<RwLock<Vec<MirrorRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful body for the next unanswered request.
    pub async fn push_body(&self, body: Vec<u8>) {
        self.script.write().await.push_back(Ok(body));
    }

    /// Queue a failure for the next unanswered request.
    pub async fn push_error(&self, error: TransportError) {
        self.script.write().await.push_back(Err(error));
    }

    /// Serve `body` from every mirror whenever `infohash` is requested.
    pub async fn serve(&self, infohash: &InfoHash, body: Vec<u8>) {
        self.bodies.write().await.insert(infohash.clone(), body);
    }

    /// Stop serving `infohash`.
    pub async fn withdraw(&self, infohash: &InfoHash) {
        self.bodies.write().await.remove(infohash);
    }

    pub async fn requests(&self) -> Vec<MirrorRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Requests made for one infohash.
    pub async fn requests_for(&self, infohash: &InfoHash) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| &r.infohash == infohash)
            .count()
    }

    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl MirrorTransport for MockTransport {
    async fn get(&self, request: &MirrorRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.write().await.push(request.clone());

        if let Some(scripted) = self.script.write().await.pop_front() {
            return scripted;
        }

        match self.bodies.read().await.get(&request.infohash) {
            Some(body) => Ok(body.clone()),
            None => Err(TransportError::Connect(format!(
                "mock: nothing served for {}",
                request.infohash
            ))),
        }
    }
}
