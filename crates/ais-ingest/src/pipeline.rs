//! Ingest pipeline engine.
//!
//! Wires the feed frames through normalization and aggregation on the
//! receive path, and hands flushed batches to a blocking registry worker.
//!
//! # Architecture
//!
//! ```text
//! frame ──► normalize ──► broadcast raw ──► aggregator.enqueue ──► flush_if_due
//!                                                                      │
//! tick task (idle flush) ──────────────────────────────────────────────┤
//!                                                                      ▼
//!                                     bounded queue ──► worker (spawn_blocking)
//!                                                        gate → resolve → apply
//! ```
//!
//! The receive path never waits on the registry. When the queue is full the
//! drained batch is merged back into the aggregator and retried on the next
//! flush. Shutdown drains the aggregator one last time, lets the worker
//! finish everything queued, then returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use ais_core::config::AppConfig;
use ais_core::error::AisError;
use ais_core::time_util::now_ms;
use ais_core::types::CanonicalUpdate;
use ais_core::ws::FrameHandler;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::BatchAggregator;
use crate::broadcast::FrameBroadcaster;
use crate::normalizer::normalize_text;
use crate::reconcile::Reconciler;
use crate::registry::RegistryStore;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Default)]
struct IngestStats {
    frames_received: AtomicU64,
    frames_normalized: AtomicU64,
    frames_ignored: AtomicU64,
    parse_errors: AtomicU64,
    batches_dispatched: AtomicU64,
    batches_requeued: AtomicU64,
    batches_processed: AtomicU64,
    operations_applied: AtomicU64,
}

impl IngestStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_normalized: self.frames_normalized.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batches_requeued: self.batches_requeued.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            operations_applied: self.operations_applied.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_normalized: u64,
    /// Well-formed frames of other types, or carrying nothing usable.
    pub frames_ignored: u64,
    pub parse_errors: u64,
    pub batches_dispatched: u64,
    pub batches_requeued: u64,
    pub batches_processed: u64,
    pub operations_applied: u64,
}

// ---------------------------------------------------------------------------
// Receive path
// ---------------------------------------------------------------------------

enum WorkItem {
    Batch(Vec<CanonicalUpdate>),
    Stop,
}

/// State shared by the frame handler and the tick task.
struct Ingress {
    aggregator: Mutex<BatchAggregator>,
    tx: Sender<WorkItem>,
    broadcaster: FrameBroadcaster,
    stats: Arc<IngestStats>,
}

impl Ingress {
    fn on_frame(&self, text: &str) -> Result<(), AisError> {
        IngestStats::bump(&self.stats.frames_received);
        let update = match normalize_text(text) {
            Ok(Some(update)) => update,
            Ok(None) => {
                IngestStats::bump(&self.stats.frames_ignored);
                return Ok(());
            }
            Err(e) => {
                IngestStats::bump(&self.stats.parse_errors);
                return Err(e);
            }
        };
        IngestStats::bump(&self.stats.frames_normalized);
        self.broadcaster.publish(text);

        let batch = {
            let mut agg = self.aggregator.lock().unwrap_or_else(PoisonError::into_inner);
            agg.enqueue(update);
            agg.flush_if_due(Instant::now())
        };
        self.dispatch(batch);
        Ok(())
    }

    fn tick(&self) {
        let batch = self.aggregator.lock().unwrap_or_else(PoisonError::into_inner).flush_if_due(Instant::now());
        self.dispatch(batch);
    }

    fn drain(&self) -> Vec<CanonicalUpdate> {
        self.aggregator.lock().unwrap_or_else(PoisonError::into_inner).drain()
    }

    /// Hand a batch to the worker without blocking; requeue it if the queue is full.
    fn dispatch(&self, batch: Vec<CanonicalUpdate>) {
        if batch.is_empty() {
            return;
        }
        let vessels = batch.len();
        match self.tx.try_send(WorkItem::Batch(batch)) {
            Ok(()) => {
                IngestStats::bump(&self.stats.batches_dispatched);
                debug!("[ingest] dispatched batch of {vessels} vessels");
            }
            Err(TrySendError::Full(item)) => {
                warn!("[ingest] worker queue full, requeueing {vessels} vessels");
                self.requeue(item);
            }
            Err(TrySendError::Disconnected(item)) => {
                warn!("[ingest] worker gone, holding {vessels} vessels");
                self.requeue(item);
            }
        }
    }

    fn requeue(&self, item: WorkItem) {
        if let WorkItem::Batch(batch) = item {
            IngestStats::bump(&self.stats.batches_requeued);
            self.aggregator.lock().unwrap_or_else(PoisonError::into_inner).requeue(batch);
        }
    }
}

// ---------------------------------------------------------------------------
// IngestPipeline
// ---------------------------------------------------------------------------

/// Running ingest pipeline over registry `S`.
///
/// Must be started inside a tokio runtime.
pub struct IngestPipeline<S> {
    ingress: Arc<Ingress>,
    reconciler: Arc<Mutex<Reconciler<S>>>,
    shutdown_tx: watch::Sender<bool>,
    ticker: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl<S: RegistryStore + 'static> IngestPipeline<S> {
    /// Spawn the registry worker and the idle-flush tick task.
    pub fn start(store: S, config: &AppConfig, broadcaster: FrameBroadcaster) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(config.batch.max_queued_batches.max(1));
        let stats = Arc::new(IngestStats::default());
        let ingress = Arc::new(Ingress {
            aggregator: Mutex::new(BatchAggregator::from_config(&config.batch)),
            tx,
            broadcaster,
            stats: stats.clone(),
        });
        info!("[ingest] registry backend: {}", store.backend());
        let reconciler = Arc::new(Mutex::new(Reconciler::new(store, &config.gate)));

        let worker_reconciler = reconciler.clone();
        let worker = tokio::task::spawn_blocking(move || run_worker(rx, worker_reconciler, stats));

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let tick_ingress = ingress.clone();
        let tick_interval = config.batch.tick_interval();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => tick_ingress.tick(),
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Self { ingress, reconciler, shutdown_tx, ticker: Some(ticker), worker: Some(worker) }
    }

    /// Frame callback for [`StreamClient::start`](ais_core::ws::StreamClient::start).
    pub fn frame_handler(&self) -> FrameHandler {
        let ingress = self.ingress.clone();
        Arc::new(move |text: &str| -> anyhow::Result<()> {
            ingress.on_frame(text)?;
            Ok(())
        })
    }

    /// Feed one raw frame through the receive path.
    pub fn handle_frame(&self, text: &str) -> Result<(), AisError> {
        self.ingress.on_frame(text)
    }

    /// Subscribe to normalized raw frames.
    pub fn broadcaster(&self) -> &FrameBroadcaster {
        &self.ingress.broadcaster
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ingress.stats.snapshot()
    }

    /// Shared handle on the reconciler (and through it, the registry).
    pub fn reconciler(&self) -> Arc<Mutex<Reconciler<S>>> {
        self.reconciler.clone()
    }

    /// Flush everything pending, wait for the worker to drain, and stop.
    ///
    /// Call after the stream client has stopped so no frames race the final flush.
    pub async fn shutdown(mut self) -> StatsSnapshot {
        let _ = self.shutdown_tx.send(true);
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.await;
        }

        let remaining = self.ingress.drain();
        if !remaining.is_empty() {
            info!("[ingest] flushing {} pending vessels on shutdown", remaining.len());
        }
        let tx = self.ingress.tx.clone();
        let stats = self.ingress.stats.clone();
        // Blocking sends: the worker is still consuming, so they only wait for queue space.
        let sent = tokio::task::spawn_blocking(move || {
            if !remaining.is_empty() && tx.send(WorkItem::Batch(remaining)).is_ok() {
                IngestStats::bump(&stats.batches_dispatched);
            }
            let _ = tx.send(WorkItem::Stop);
        })
        .await;
        if let Err(e) = sent {
            warn!("[ingest] final flush task failed: {e}");
        }

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("[ingest] registry worker panicked: {e}");
            }
        }

        let stats = self.stats();
        info!(
            "[ingest] stopped: frames={} normalized={} ignored={} parse_errors={} batches={} requeued={} applied={}",
            stats.frames_received,
            stats.frames_normalized,
            stats.frames_ignored,
            stats.parse_errors,
            stats.batches_processed,
            stats.batches_requeued,
            stats.operations_applied,
        );
        stats
    }
}

/// Registry worker loop. Runs on the blocking pool until `Stop` arrives.
fn run_worker<S: RegistryStore>(rx: Receiver<WorkItem>, reconciler: Arc<Mutex<Reconciler<S>>>, stats: Arc<IngestStats>) {
    info!("[ingest] registry worker started");
    while let Ok(item) = rx.recv() {
        let batch = match item {
            WorkItem::Batch(batch) => batch,
            WorkItem::Stop => break,
        };
        let outcome = reconciler.lock().unwrap_or_else(PoisonError::into_inner).process_batch(batch, now_ms());
        IngestStats::bump(&stats.batches_processed);
        stats.operations_applied.fetch_add(outcome.report.applied as u64, Ordering::Relaxed);
    }
    info!("[ingest] registry worker stopped");
}
