use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;

use magnetdex_core::store::{day_key, BacklogFilter, DailyStats};
use magnetdex_core::{BacklogStore, SanitizedConfig, SchedulerStatus, StatsStore, TorrentIndex};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Counts read from the store for `/status`.
#[derive(Serialize)]
pub struct IndexSummary {
    pub torrents: u64,
    /// Backlog entries the scheduler would still pick up.
    pub pending: u64,
    pub today: DailyStats,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub scheduler: SchedulerStatus,
    pub index: IndexSummary,
    pub config: SanitizedConfig,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let index = index_summary(&state).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at()).num_seconds(),
        scheduler: state.scheduler().status().await,
        index,
        config: state.sanitized_config(),
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

fn index_summary(state: &AppState) -> Result<IndexSummary, magnetdex_core::StoreError> {
    let store = state.store();
    let max_failures = state.config().scheduler.max_failures;
    let day = day_key(Utc::now());

    Ok(IndexSummary {
        torrents: TorrentIndex::count(store)?,
        pending: BacklogStore::count(store, &BacklogFilter::eligible(max_failures))?,
        today: StatsStore::get(store, &day)?.unwrap_or(DailyStats {
            day,
            ..DailyStats::default()
        }),
    })
}
