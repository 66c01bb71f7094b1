//! Asynchronous batch writer over a [`RemoteSink`].
//!
//! Records queued through [`BatchWriter`] accumulate in a buffer guarded by a
//! tokio mutex. Once the buffer holds more than `batch_size` records, it is
//! moved whole into a bounded mpsc channel together with an in-flight guard,
//! and a single background task writes the batches in FIFO order.
//! [`AsyncWriter::flush`] writes any partial buffer directly from the calling
//! task, then waits until the in-flight count returns to zero.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use graphsink_core::{AsyncWriter, RemoteSink, StoreError, WriteOperation};
use metrics::counter;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::in_flight::{InFlightGuard, InFlightTracker};
use crate::config::WriterConfig;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct WriterStats {
    dispatched: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    records_written: AtomicU64,
}

/// Point-in-time counters for one writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStatsSnapshot {
    /// Batches handed to the dispatch channel.
    pub dispatched: u64,
    /// Batches (channel or flush) the sink accepted.
    pub written: u64,
    /// Batches (channel or flush) the sink rejected.
    pub failed: u64,
    /// Records contained in accepted batches.
    pub records_written: u64,
}

// ---------------------------------------------------------------------------
// Shared writer core
// ---------------------------------------------------------------------------

/// A dispatched batch. Owned solely by the background task once sent.
struct Batch<R> {
    records: Vec<R>,
    _in_flight: InFlightGuard,
}

/// State shared between the producer side and the background task.
struct WriterCore<R: Send + Sync + 'static> {
    id: Uuid,
    operation: WriteOperation,
    sink: Arc<dyn RemoteSink<R>>,
    in_flight: Arc<InFlightTracker>,
    stats: WriterStats,
}

impl<R: Send + Sync + 'static> WriterCore<R> {
    /// Executes one batch against the sink and records the outcome.
    async fn write(&self, records: &[R]) -> Result<(), StoreError> {
        let operation = self.operation.to_string();
        debug!(writer = %self.id, operation = %operation, records = records.len(), "batch write");

        match self.sink.execute(&self.operation, records).await {
            Ok(()) => {
                self.stats.written.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .records_written
                    .fetch_add(records.len() as u64, Ordering::Relaxed);
                counter!("graphsink_batches_written_total", "operation" => operation.clone())
                    .increment(1);
                counter!("graphsink_records_written_total", "operation" => operation)
                    .increment(records.len() as u64);
                Ok(())
            }
            Err(source) => {
                let cause = format!("{source:#}");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("graphsink_batches_failed_total", "operation" => operation.clone())
                    .increment(1);
                error!(
                    writer = %self.id,
                    operation = %operation,
                    records = records.len(),
                    error = %cause,
                    "batch write failed"
                );
                Err(StoreError::BackendWrite {
                    operation,
                    records: records.len(),
                    source,
                })
            }
        }
    }
}

/// Background consume loop. The only receiver of the dispatch channel.
///
/// `close` stops intake but lets batches already in the channel finish;
/// `cancel` stops at once and discards them.
async fn run_worker<R: Send + Sync + 'static>(
    core: Arc<WriterCore<R>>,
    mut rx: mpsc::Receiver<Batch<R>>,
    close: CancellationToken,
    cancel: CancellationToken,
) {
    let mut closing = false;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                rx.close();
                let mut discarded = 0usize;
                while let Ok(batch) = rx.try_recv() {
                    discarded += batch.records.len();
                }
                info!(
                    writer = %core.id,
                    operation = %core.operation,
                    discarded_records = discarded,
                    "background batch writer cancelled"
                );
                return;
            }
            () = close.cancelled(), if !closing => {
                // Rejects blocked and future sends; buffered batches still arrive.
                rx.close();
                closing = true;
                debug!(writer = %core.id, "dispatch channel closed");
            }
            batch = rx.recv() => {
                let Some(batch) = batch else {
                    info!(writer = %core.id, operation = %core.operation, "background batch writer closed");
                    return;
                };
                // The producer already returned; failures surface through
                // logs, metrics, and stats only.
                let _ = core.write(&batch.records).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// BatchWriter
// ---------------------------------------------------------------------------

/// Buffer preallocation cap; larger batches grow on demand.
const PREALLOCATED_RECORDS: usize = 1024;

struct Accumulator<R> {
    inserts: Vec<R>,
    dispatch: mpsc::Sender<Batch<R>>,
}

/// Buffers records and writes them to a [`RemoteSink`] in size-bounded batches.
///
/// Exactly one background task per writer consumes the dispatch channel, so
/// channel batches reach the sink in the order their threshold-crossing
/// [`queue`](AsyncWriter::queue) calls happened. A partial buffer written by
/// [`flush`](AsyncWriter::flush) has no ordering relative to batches still in
/// the channel. Callers needing parallel writes create several writers.
pub struct BatchWriter<R: Send + Sync + 'static> {
    core: Arc<WriterCore<R>>,
    batch_size: usize,
    accumulator: Mutex<Accumulator<R>>,
    closed: AtomicBool,
    close_signal: CancellationToken,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<R: Send + Sync + 'static> BatchWriter<R> {
    /// Creates a writer bound to `sink` and starts its background task.
    ///
    /// Must be called from within a tokio runtime. Cancelling `cancel` stops
    /// the background task without draining the channel.
    #[must_use]
    pub fn spawn(
        sink: Arc<dyn RemoteSink<R>>,
        operation: WriteOperation,
        config: &WriterConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity());
        let core = Arc::new(WriterCore {
            id: Uuid::new_v4(),
            operation,
            sink,
            in_flight: InFlightTracker::new(),
            stats: WriterStats::default(),
        });
        let close_signal = CancellationToken::new();

        debug!(
            writer = %core.id,
            operation = %core.operation,
            batch_size = config.batch_size,
            channel_capacity = config.channel_capacity(),
            "starting background batch writer"
        );
        let handle = tokio::spawn(run_worker(
            Arc::clone(&core),
            rx,
            close_signal.clone(),
            cancel,
        ));

        Self {
            core,
            batch_size: config.batch_size,
            accumulator: Mutex::new(Accumulator {
                inserts: buffer_for(config.batch_size),
                dispatch: tx,
            }),
            closed: AtomicBool::new(false),
            close_signal,
            worker: parking_lot::Mutex::new(Some(handle)),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.core.id
    }

    #[must_use]
    pub fn operation(&self) -> &WriteOperation {
        &self.core.operation
    }

    /// Batches accepted for writing but not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.core.in_flight.count()
    }

    /// Records buffered but not yet dispatched.
    pub async fn buffered(&self) -> usize {
        self.accumulator.lock().await.inserts.len()
    }

    #[must_use]
    pub fn stats(&self) -> WriterStatsSnapshot {
        let stats = &self.core.stats;
        WriterStatsSnapshot {
            dispatched: stats.dispatched.load(Ordering::Relaxed),
            written: stats.written.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            records_written: stats.records_written.load(Ordering::Relaxed),
        }
    }

    /// Waits for the background task to terminate (after close or cancellation).
    pub async fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(writer = %self.core.id, error = %err, "background batch writer task failed");
            }
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        if self.core.sink.is_connected() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized {
                component: "batch writer sink",
            })
        }
    }
}

fn buffer_for<R>(batch_size: usize) -> Vec<R> {
    Vec::with_capacity(batch_size.min(PREALLOCATED_RECORDS) + 1)
}

#[async_trait]
impl<R: Send + Sync + 'static> AsyncWriter<R> for BatchWriter<R> {
    async fn queue(&self, record: R) -> Result<(), StoreError> {
        let mut acc = self.accumulator.lock().await;
        self.ensure_open()?;
        // Only reachable after a dispatch failed because the worker stopped.
        if acc.inserts.len() > self.batch_size {
            return Err(StoreError::WorkerStopped);
        }

        acc.inserts.push(record);
        if acc.inserts.len() <= self.batch_size {
            return Ok(());
        }

        let records = std::mem::replace(&mut acc.inserts, buffer_for(self.batch_size));
        let batch = Batch {
            records,
            _in_flight: self.core.in_flight.acquire(),
        };
        if let Err(mpsc::error::SendError(batch)) = acc.dispatch.send(batch).await {
            if self.closed.load(Ordering::Acquire) {
                warn!(
                    writer = %self.core.id,
                    operation = %self.core.operation,
                    records = batch.records.len(),
                    "batch writer closed while dispatching, batch dropped"
                );
                return Err(StoreError::Closed);
            }
            // Worker is gone; keep the records so a flush can still write them.
            acc.inserts = batch.records;
            warn!(
                writer = %self.core.id,
                operation = %self.core.operation,
                buffered = acc.inserts.len(),
                "background batch writer stopped, batch not dispatched"
            );
            return Err(StoreError::WorkerStopped);
        }
        self.core.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut acc = self.accumulator.lock().await;
        self.ensure_open()?;

        if !acc.inserts.is_empty() {
            let in_flight = self.core.in_flight.acquire();
            let result = self.core.write(&acc.inserts).await;
            drop(in_flight);

            if let Err(err) = result {
                // Drain the background writer before surfacing the error.
                self.core.in_flight.wait_idle().await;
                return Err(err);
            }
            info!(
                writer = %self.core.id,
                operation = %self.core.operation,
                records = acc.inserts.len(),
                "done flushing, clearing the queue"
            );
            acc.inserts.clear();
        }

        self.core.in_flight.wait_idle().await;
        Ok(())
    }

    /// Never takes the buffer lock, so a producer stalled on a full channel
    /// cannot hold it up.
    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.close_signal.cancel();
        if let Ok(acc) = self.accumulator.try_lock() {
            if !acc.inserts.is_empty() {
                warn!(
                    writer = %self.core.id,
                    operation = %self.core.operation,
                    records = acc.inserts.len(),
                    "closing batch writer with unflushed records"
                );
            }
        }
        info!(writer = %self.core.id, operation = %self.core.operation, "batch writer closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
