//! Ingestion scheduler.
//!
//! Drains the backlog of discovered infohashes:
//! - **Count**: eligible entries (not indexed, failure count within the limit)
//! - **Page**: hottest first, in batches
//! - **Work**: a persistent worker pool fetches and indexes each entry
//!
//! When nothing is eligible the loop sleeps for the idle interval.

mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::IngestScheduler;
pub use types::{CycleReport, ItemResult, ItemStatus, SchedulerError, SchedulerStatus};
