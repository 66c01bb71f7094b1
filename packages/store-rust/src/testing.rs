//! Test sinks shared by the writer and storage tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphsink_core::{RemoteSink, WriteOperation};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Records every successful batch. Can inject failures, hold writes behind a
/// gate, and pretend to be disconnected.
pub(crate) struct RecordingSink<R> {
    batches: Mutex<Vec<Vec<R>>>,
    operations: Mutex<Vec<WriteOperation>>,
    started: AtomicUsize,
    fail_remaining: AtomicUsize,
    connected: AtomicBool,
    gate: Option<Semaphore>,
}

impl<R: Clone + Send + Sync + 'static> RecordingSink<R> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Every write waits for a permit from [`release`](Self::release).
    pub(crate) fn gated() -> Arc<Self> {
        Arc::new(Self::build(Some(Semaphore::new(0))))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            operations: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            fail_remaining: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
            gate,
        }
    }

    pub(crate) fn release(&self, writes: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(writes);
        }
    }

    /// The next `writes` executions fail.
    pub(crate) fn fail_next(&self, writes: usize) {
        self.fail_remaining.store(writes, Ordering::SeqCst);
    }

    pub(crate) fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub(crate) fn batches(&self) -> Vec<Vec<R>> {
        self.batches.lock().clone()
    }

    pub(crate) fn operations(&self) -> Vec<WriteOperation> {
        self.operations.lock().clone()
    }

    /// Waits until at least `count` executions have begun.
    pub(crate) async fn wait_started(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.started.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("sink writes did not start in time");
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> RemoteSink<R> for RecordingSink<R> {
    async fn execute(&self, operation: &WriteOperation, batch: &[R]) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("injected failure writing {operation}");
        }
        self.operations.lock().push(operation.clone());
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        Ok(self.is_connected())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Tracing layer that captures ERROR events and their `operation` field.
#[derive(Clone, Default)]
pub(crate) struct ErrorEvents {
    operations: Arc<Mutex<Vec<String>>>,
}

impl ErrorEvents {
    /// Routes this thread's events through the layer until the guard drops.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// `operation` field of every captured error, in emission order.
    pub(crate) fn operations(&self) -> Vec<String> {
        self.operations.lock().clone()
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = OperationField(None);
        event.record(&mut visitor);
        self.operations
            .lock()
            .push(visitor.0.unwrap_or_default());
    }
}

struct OperationField(Option<String>);

impl Visit for OperationField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "operation" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}
