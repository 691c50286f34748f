//! Common test utilities for in-process API testing.
//!
//! Builds the router over an in-memory store and a mocked mirror transport,
//! so requests exercise the real scheduler and indexer without network access.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use magnetdex_core::{
    testing::MockTransport, Config, Fetcher, Indexer, IngestScheduler, Intake, JiebaSegmenter,
    SchedulerConfig, SqliteStore,
};
use magnetdex_server::{api::create_router, state::AppState};

pub use magnetdex_core::testing::fixtures;

pub struct TestFixture {
    pub router: Router,
    pub transport: Arc<MockTransport>,
    pub scheduler: Arc<IngestScheduler>,
    pub intake: Intake,
}

impl TestFixture {
    pub fn new() -> Self {
        let config = Config {
            scheduler: SchedulerConfig {
                workers: 2,
                batch_size: 5,
                idle_interval_ms: 20,
                ..SchedulerConfig::default()
            },
            ..Config::default()
        };

        let store = Arc::new(SqliteStore::in_memory().expect("Failed to create store"));
        let transport = Arc::new(MockTransport::new());
        let fetcher = Arc::new(Fetcher::new(&config.fetcher, transport.clone()));
        let indexer = Arc::new(Indexer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(JiebaSegmenter),
        ));
        let intake = Intake::new(
            store.clone(),
            store.clone(),
            store.clone(),
            fetcher.clone(),
            indexer.clone(),
        );
        let scheduler = Arc::new(IngestScheduler::new(
            config.scheduler.clone(),
            store.clone(),
            fetcher,
            indexer,
        ));

        let state = Arc::new(AppState::new(config, store.clone(), scheduler.clone()));
        let router = create_router(state);

        Self {
            router,
            transport,
            scheduler,
            intake,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Response is not JSON")
    }
}
