use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{CacheKey, WriteOperation};

/// Remote backend that executes one batch of records as a single operation.
///
/// A batch either fully succeeds or is reported failed as a whole; there is
/// no partial-success outcome. Used as `Arc<dyn RemoteSink<R>>`.
#[async_trait]
pub trait RemoteSink<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    /// Execute `operation` over `batch`, in order.
    async fn execute(&self, operation: &WriteOperation, batch: &[R]) -> anyhow::Result<()>;

    /// Probe the backend. `Ok(false)` means reachable but unhealthy.
    async fn health_check(&self) -> anyhow::Result<bool>;

    /// Whether the underlying connection has been established and is still open.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Lifecycle capabilities every store backend exposes.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns `Ok(true)` if the backend is healthy.
    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Release backend resources. The driver cannot be reused afterwards.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Read access to a keyed store.
#[async_trait]
pub trait Reader: Driver {
    /// Fetch the serialized value stored under `key`.
    ///
    /// Absence is reported as [`StoreError::NotFound`], never as a transport error.
    async fn get(&self, key: &CacheKey) -> Result<String, StoreError>;
}

/// Read access plus construction of bulk writers bound to the same backend.
#[async_trait]
pub trait Provider: Reader {
    /// Record type accepted by this provider's writers.
    type Record: Send + Sync + 'static;

    /// Create a fresh asynchronous writer bound to this backend's connection.
    async fn bulk_writer(&self) -> Result<Box<dyn AsyncWriter<Self::Record>>, StoreError>;
}

/// Queue-now, flush-later writer contract.
#[async_trait]
pub trait AsyncWriter<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    /// Add a record to the write queue. Never waits on the backend, only on
    /// dispatch backpressure.
    async fn queue(&self, record: R) -> Result<(), StoreError>;

    /// Write any buffered records and wait until every dispatched batch has completed.
    async fn flush(&self) -> Result<(), StoreError>;

    /// Stop accepting work. Does not wait for in-flight batches; call
    /// [`flush`](AsyncWriter::flush) first for a guaranteed drain.
    async fn close(&self) -> Result<(), StoreError>;
}
