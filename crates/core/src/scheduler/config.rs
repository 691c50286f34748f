//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the ingestion scheduler. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the background loop at startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Worker tasks in the pool.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Depth of the work queue and of the result channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Backlog entries fetched per page.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wait between cycles when there is nothing to do (milliseconds).
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,

    /// Entries whose failure count exceeds this are no longer scheduled.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Log every item's status at info level instead of debug.
    #[serde(default)]
    pub show_messages: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_workers() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    10
}

fn default_batch_size() -> usize {
    100
}

fn default_idle_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_failures() -> u32 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            idle_interval_ms: default_idle_interval(),
            max_failures: default_max_failures(),
            show_messages: false,
        }
    }
}
