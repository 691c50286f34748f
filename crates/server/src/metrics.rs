//! Prometheus metrics for the magnetdex server.
//!
//! The registry holds the HTTP collectors defined here, gauges refreshed from
//! the scheduler and store on every scrape, and every pipeline collector
//! exported by `magnetdex_core::metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use regex::Regex;

use magnetdex_core::{StatsStore, TorrentIndex};

use crate::state::AppState;

pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Metrics
// =============================================================================

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magnetdex_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_http_requests_in_flight",
        "HTTP requests currently being served",
    )
    .unwrap()
});

// =============================================================================
// Scheduler and index gauges (collected dynamically)
// =============================================================================

/// Scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_scheduler_running",
        "Whether the ingestion scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

pub static SCHEDULER_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_scheduler_in_flight",
        "Backlog items a worker is processing right now",
    )
    .unwrap()
});

pub static SCHEDULER_CYCLES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_scheduler_cycles",
        "Completed drain passes since startup",
    )
    .unwrap()
});

pub static INDEXED_TORRENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("magnetdex_indexed_torrents", "Records in the torrent index").unwrap()
});

pub static INGESTED_TODAY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_ingested_today",
        "Torrents indexed during the current UTC day",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Scheduler and index
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_CYCLES.clone()))
        .unwrap();
    registry
        .register(Box::new(INDEXED_TORRENTS.clone()))
        .unwrap();
    registry.register(Box::new(INGESTED_TODAY.clone())).unwrap();

    // Pipeline (fetcher, indexer, scheduler, intake)
    for metric in magnetdex_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the gauges that mirror scheduler and store state.
pub async fn collect_dynamic_metrics(state: &AppState) {
    let status = state.scheduler().status().await;
    SCHEDULER_RUNNING.set(if status.running { 1 } else { 0 });
    SCHEDULER_IN_FLIGHT.set(status.in_flight as i64);
    SCHEDULER_CYCLES.set(status.cycles as i64);

    if let Ok(count) = TorrentIndex::count(state.store()) {
        INDEXED_TORRENTS.set(count as i64);
    }

    let today = magnetdex_core::store::day_key(chrono::Utc::now());
    if let Ok(stats) = StatsStore::get(state.store(), &today) {
        INGESTED_TODAY.set(stats.map(|s| s.ingested as i64).unwrap_or(0));
    }
}

static INFOHASH_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace hashes and numbers with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = INFOHASH_SEGMENT.replace_all(path, "{hash}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/torrents/C12FE1C06BBA254A9DC9F519B335AA7C1367A88A";
        assert_eq!(normalize_path(path), "/api/v1/torrents/{hash}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/days/20240101"), "/api/v1/days/{id}");
        assert_eq!(
            normalize_path("/api/v1/days/20240101/stats"),
            "/api/v1/days/{id}/stats"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("magnetdex_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_server_and_pipeline_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        SCHEDULER_RUNNING.set(0);
        INDEXED_TORRENTS.set(0);
        magnetdex_core::metrics::BACKLOG_PENDING.set(0);
        magnetdex_core::metrics::MIRROR_ATTEMPTS
            .with_label_values(&["bitcomet", "success"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("magnetdex_http_request_duration_seconds"));
        assert!(output.contains("magnetdex_http_requests_in_flight"));
        assert!(output.contains("magnetdex_scheduler_running"));
        assert!(output.contains("magnetdex_indexed_torrents"));
        assert!(output.contains("magnetdex_backlog_pending"));
        assert!(output.contains("magnetdex_mirror_attempts_total"));
    }
}
