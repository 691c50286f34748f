//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetcher (per-mirror attempts, fetch outcomes)
//! - Indexer (index outcomes, scan-code artifacts)
//! - Scheduler (per-item statuses, batch timing, backlog size)
//! - Intake (discoveries)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Fetcher Metrics
// =============================================================================

/// Mirror attempts by mirror and result.
pub static MIRROR_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_mirror_attempts_total", "Total mirror attempts"),
        &["mirror", "result"], // "success", "timeout", "transport_error", "parse_error", "mismatch"
    )
    .unwrap()
});

/// Duration of a single mirror attempt, parse included.
pub static MIRROR_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magnetdex_mirror_request_duration_seconds",
            "Duration of mirror attempts",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0]),
        &["mirror"],
    )
    .unwrap()
});

/// Fetch outcomes across all mirrors.
pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_fetches_total", "Total metadata fetches"),
        &["result"], // "success", "exhausted"
    )
    .unwrap()
});

// =============================================================================
// Indexer Metrics
// =============================================================================

/// Index calls by outcome.
pub static INDEX_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_index_outcomes_total", "Indexer outcomes"),
        &["outcome"], // "inserted", "caught_up", "already_indexed", "skipped", "error"
    )
    .unwrap()
});

/// Scan-code artifacts by result.
pub static SCAN_CODES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_scan_codes_total", "Scan-code artifacts written"),
        &["result"], // "written", "failed"
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Backlog items processed by status.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "magnetdex_items_processed_total",
            "Backlog items processed by the scheduler",
        ),
        &["status"], // "skipped", "indexed", "failed"
    )
    .unwrap()
});

/// Time to drain one batch.
pub static BATCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("magnetdex_batch_duration_seconds", "Duration of one batch")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

/// Eligible backlog entries at the start of the last cycle.
pub static BACKLOG_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "magnetdex_backlog_pending",
        "Backlog entries eligible for scheduling",
    )
    .unwrap()
});

// =============================================================================
// Intake Metrics
// =============================================================================

/// Discoveries by result.
pub static DISCOVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetdex_discoveries_total", "Infohash discoveries"),
        &["result"], // "new", "rediscovered"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Fetcher
        Box::new(MIRROR_ATTEMPTS.clone()),
        Box::new(MIRROR_REQUEST_DURATION.clone()),
        Box::new(FETCHES_TOTAL.clone()),
        // Indexer
        Box::new(INDEX_OUTCOMES.clone()),
        Box::new(SCAN_CODES.clone()),
        // Scheduler
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(BATCH_DURATION.clone()),
        Box::new(BACKLOG_PENDING.clone()),
        // Intake
        Box::new(DISCOVERIES.clone()),
    ]
}
