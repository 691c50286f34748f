//! Ingestion scheduler implementation.
//!
//! One control loop pages through the backlog; a fixed pool of workers,
//! spawned once, fetches and indexes each infohash:
//! - Batches: strictly sequential, each drained completely before the next
//! - Items: concurrent across workers, order within a batch unspecified

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::fetcher::Fetcher;
use crate::indexer::{IndexOutcome, Indexer};
use crate::infohash::InfoHash;
use crate::metrics;
use crate::store::{BacklogFilter, BacklogStore, PendingHash};

use super::config::SchedulerConfig;
use super::types::{CycleReport, ItemResult, ItemStatus, SchedulerError, SchedulerStatus};

/// Running totals across cycles.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    cycles: AtomicU64,
    total_processed: AtomicU64,
    total_indexed: AtomicU64,
    total_skipped: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn record(&self, status: ItemStatus) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            ItemStatus::Skipped => &self.total_skipped,
            ItemStatus::Indexed => &self.total_indexed,
            ItemStatus::Failed => &self.total_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn to_status(&self, running: bool, workers: usize) -> SchedulerStatus {
        SchedulerStatus {
            running,
            cycles: self.cycles.load(Ordering::Relaxed),
            processed: self.total_processed.load(Ordering::Relaxed),
            indexed: self.total_indexed.load(Ordering::Relaxed),
            skipped: self.total_skipped.load(Ordering::Relaxed),
            failed: self.total_failed.load(Ordering::Relaxed),
            in_flight: self.active.load(Ordering::Relaxed),
            workers,
        }
    }
}

/// Everything a worker needs to process one item.
struct WorkerContext {
    backlog: Arc<dyn BacklogStore>,
    fetcher: Arc<Fetcher>,
    indexer: Arc<Indexer>,
    stats: Arc<PoolStats>,
    max_failures: u32,
    show_messages: bool,
}

impl WorkerContext {
    async fn process(&self, infohash: InfoHash) -> ItemResult {
        let (status, still_eligible) = self.process_inner(&infohash).await;

        metrics::ITEMS_PROCESSED
            .with_label_values(&[status.as_str()])
            .inc();
        self.stats.record(status);

        if self.show_messages {
            info!("{}", status.message(&infohash));
        } else {
            debug!("{}", status.message(&infohash));
        }

        ItemResult {
            infohash,
            status,
            still_eligible,
        }
    }

    async fn process_inner(&self, infohash: &InfoHash) -> (ItemStatus, bool) {
        match self.indexer.catch_up(infohash) {
            Ok(Some(_)) => return (ItemStatus::Skipped, false),
            Ok(None) => {}
            Err(e) => {
                warn!("Index lookup failed for {}: {}", infohash, e);
                return (ItemStatus::Failed, true);
            }
        }

        let fetched = match self.fetcher.fetch(infohash).await {
            Ok(fetched) => fetched,
            Err(e) => {
                debug!("{}", e);
                return (ItemStatus::Failed, self.record_failure(infohash));
            }
        };

        match self.indexer.index(&fetched.metadata) {
            Ok(IndexOutcome::Skipped) => (ItemStatus::Failed, self.record_failure(infohash)),
            Ok(_) => (ItemStatus::Indexed, false),
            Err(e) => {
                warn!("Failed to index {}: {}", infohash, e);
                (ItemStatus::Failed, true)
            }
        }
    }

    /// Result for an item whose processing task panicked or was cancelled.
    fn abandoned(&self, infohash: InfoHash, err: JoinError) -> ItemResult {
        error!("Processing {} aborted: {}", infohash, err);
        let status = ItemStatus::Failed;
        metrics::ITEMS_PROCESSED
            .with_label_values(&[status.as_str()])
            .inc();
        self.stats.record(status);
        let still_eligible = self.record_failure(&infohash);
        ItemResult {
            infohash,
            status,
            still_eligible,
        }
    }

    /// Bump the failure counter. Returns whether the entry is still eligible.
    fn record_failure(&self, infohash: &InfoHash) -> bool {
        match self.backlog.increment_failures(infohash) {
            Ok(count) => count <= self.max_failures,
            Err(e) => {
                warn!("Failed to record failure for {}: {}", infohash, e);
                true
            }
        }
    }
}

/// Long-lived channels and tasks of the worker pool.
struct WorkerPool {
    work_tx: mpsc::Sender<InfoHash>,
    result_rx: mpsc::Receiver<ItemResult>,
    workers: Vec<JoinHandle<()>>,
}

/// State shared between the public handle and the control loop.
struct Inner {
    config: SchedulerConfig,
    backlog: Arc<dyn BacklogStore>,
    context: Arc<WorkerContext>,
    pool: Mutex<Option<WorkerPool>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Inner {
    fn spawn_pool(&self) -> WorkerPool {
        let (work_tx, work_rx) = mpsc::channel(self.config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.config.queue_capacity);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let workers = (0..self.config.workers)
            .map(|id| {
                let context = Arc::clone(&self.context);
                let work_rx = Arc::clone(&work_rx);
                let result_tx = result_tx.clone();
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(worker_loop(id, context, work_rx, result_tx, shutdown_rx))
            })
            .collect();

        info!("Spawned {} ingestion workers", self.config.workers);

        WorkerPool {
            work_tx,
            result_rx,
            workers,
        }
    }

    /// One drain pass, cut short by any signal pending on `shutdown_rx`.
    async fn run_cycle(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<CycleReport, SchedulerError> {
        let filter = BacklogFilter::eligible(self.config.max_failures);
        let eligible = self.backlog.count(&filter)?;
        metrics::BACKLOG_PENDING.set(eligible as i64);

        let mut report = CycleReport {
            eligible,
            ..CycleReport::default()
        };

        if eligible > 0 {
            let mut guard = self.pool.lock().await;
            let pool = guard.get_or_insert_with(|| self.spawn_pool());

            let result = self
                .drain(pool, &filter, shutdown_rx, &mut report)
                .await;
            if let Err(SchedulerError::PoolClosed) = result {
                *guard = None;
            }
            result?;
        }

        self.context.stats.cycles.fetch_add(1, Ordering::Relaxed);
        Ok(report)
    }

    /// Page through the eligible backlog. The offset only advances past
    /// entries that are still eligible after processing; the rest have left
    /// the predicate and no longer occupy a page slot.
    async fn drain(
        &self,
        pool: &mut WorkerPool,
        filter: &BacklogFilter,
        shutdown_rx: &mut broadcast::Receiver<()>,
        report: &mut CycleReport,
    ) -> Result<(), SchedulerError> {
        let batch_size = self.config.batch_size;
        let mut offset: i64 = 0;

        while report.processed < report.eligible {
            if shutdown_requested(shutdown_rx) {
                report.interrupted = true;
                break;
            }

            let page = self.backlog.find_page(
                &filter
                    .clone()
                    .with_limit(batch_size as i64)
                    .with_offset(offset),
            )?;
            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let started = Instant::now();
            let retained = self.dispatch(pool, page, shutdown_rx, report).await?;
            metrics::BATCH_DURATION.observe(started.elapsed().as_secs_f64());
            report.batches += 1;

            debug!(
                "Batch {} done: {} items, {} still eligible",
                report.batches, page_len, retained
            );

            if report.interrupted || page_len < batch_size {
                break;
            }
            offset += retained as i64;
        }

        Ok(())
    }

    /// Feed one batch to the pool and collect exactly one result per item.
    /// Returns how many items are still eligible.
    async fn dispatch(
        &self,
        pool: &mut WorkerPool,
        batch: Vec<PendingHash>,
        shutdown_rx: &mut broadcast::Receiver<()>,
        report: &mut CycleReport,
    ) -> Result<u64, SchedulerError> {
        let expected = batch.len();
        let work_tx = pool.work_tx.clone();
        let mut feeder_shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            for entry in batch {
                tokio::select! {
                    _ = feeder_shutdown.recv() => break,
                    sent = work_tx.send(entry.infohash) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut retained = 0;
        for _ in 0..expected {
            let result = tokio::select! {
                _ = shutdown_rx.recv() => {
                    report.interrupted = true;
                    break;
                }
                result = pool.result_rx.recv() => result,
            };

            let Some(result) = result else {
                return Err(SchedulerError::PoolClosed);
            };
            report.record(result.status);
            if result.still_eligible {
                retained += 1;
            }
        }

        Ok(retained)
    }

    async fn shutdown_pool(&self) {
        let Some(pool) = self.pool.lock().await.take() else {
            return;
        };
        let WorkerPool {
            work_tx, workers, ..
        } = pool;
        drop(work_tx);
        futures::future::join_all(workers).await;
    }
}

async fn worker_loop(
    id: usize,
    context: Arc<WorkerContext>,
    work_rx: Arc<Mutex<mpsc::Receiver<InfoHash>>>,
    result_tx: mpsc::Sender<ItemResult>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    debug!("Worker {} started", id);
    loop {
        let next = tokio::select! {
            _ = shutdown_rx.recv() => break,
            next = async { work_rx.lock().await.recv().await } => next,
        };
        let Some(infohash) = next else {
            break;
        };

        // Own task, so a panic still yields a result for the dispatcher.
        context.stats.active.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn({
            let context = Arc::clone(&context);
            let infohash = infohash.clone();
            async move { context.process(infohash).await }
        });
        let result = match task.await {
            Ok(result) => result,
            Err(e) => context.abandoned(infohash, e),
        };
        context.stats.active.fetch_sub(1, Ordering::Relaxed);

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            sent = result_tx.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Worker {} stopped", id);
}

fn shutdown_requested(rx: &mut broadcast::Receiver<()>) -> bool {
    !matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty))
}

/// Drains the backlog of discovered infohashes into the index.
pub struct IngestScheduler {
    inner: Arc<Inner>,
    running: Arc<AtomicBool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl IngestScheduler {
    pub fn new(
        config: SchedulerConfig,
        backlog: Arc<dyn BacklogStore>,
        fetcher: Arc<Fetcher>,
        indexer: Arc<Indexer>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let context = Arc::new(WorkerContext {
            backlog: Arc::clone(&backlog),
            fetcher,
            indexer,
            stats: Arc::new(PoolStats::default()),
            max_failures: config.max_failures,
            show_messages: config.show_messages,
        });

        Self {
            inner: Arc::new(Inner {
                config,
                backlog,
                context,
                pool: Mutex::new(None),
                shutdown_tx,
            }),
            running: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
        }
    }

    /// Start the control loop (spawns the worker pool on the first cycle).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!(
            "Starting ingestion scheduler ({} workers, batch size {})",
            self.inner.config.workers, self.inner.config.batch_size
        );

        let inner = Arc::clone(&self.inner);
        let running = Arc::clone(&self.running);
        let idle = Duration::from_millis(self.inner.config.idle_interval_ms);
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Scheduler loop started");
            loop {
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let wait = match inner.run_cycle(&mut shutdown_rx).await {
                    Ok(report) => {
                        if report.processed > 0 {
                            info!(
                                "Cycle finished: {} processed ({} indexed, {} skipped, {} failed)",
                                report.processed, report.indexed, report.skipped, report.failed
                            );
                        }
                        report.made_no_progress()
                    }
                    Err(e) => {
                        error!("Scheduling cycle failed: {}", e);
                        true
                    }
                };

                if wait {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(idle) => {}
                    }
                } else if shutdown_requested(&mut shutdown_rx) {
                    break;
                }
            }
            info!("Scheduler loop stopped");
        });

        *self.loop_handle.lock().await = Some(handle);
    }

    /// Signal shutdown and wait for the loop and every worker to exit.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping ingestion scheduler");

        let _ = self.inner.shutdown_tx.send(());

        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Scheduler loop panicked: {}", e);
            }
        }
        self.inner.shutdown_pool().await;

        info!("Ingestion scheduler stopped");
    }

    /// Perform exactly one drain pass over the eligible backlog.
    pub async fn run_cycle(&self) -> Result<CycleReport, SchedulerError> {
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        self.inner.run_cycle(&mut shutdown_rx).await
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.inner
            .context
            .stats
            .to_status(self.is_running(), self.inner.config.workers)
    }
}
