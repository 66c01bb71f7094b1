//! In-process cache [`Provider`] backed by [`DashMap`].
//!
//! Writers created by [`MemoryStore`] run through the same [`BatchWriter`]
//! engine as remote backends, so batching and flush semantics are identical.
//! Nothing is persisted beyond the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use graphsink_core::{
    AsyncWriter, CacheEntry, CacheKey, Driver, Provider, Reader, RemoteSink, StoreError,
    WriteOperation,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WriterConfig;
use crate::writer::BatchWriter;

/// Sink that applies cache batches to a shared map.
pub struct MemorySink {
    entries: DashMap<CacheKey, String>,
    open: AtomicBool,
}

impl MemorySink {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            open: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl RemoteSink<CacheEntry> for MemorySink {
    async fn execute(&self, _operation: &WriteOperation, batch: &[CacheEntry]) -> anyhow::Result<()> {
        if !self.is_connected() {
            anyhow::bail!("memory store is closed");
        }
        for entry in batch {
            self.entries.insert(entry.key.clone(), entry.value.clone());
        }
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        Ok(self.is_connected())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// In-memory cache provider.
pub struct MemoryStore {
    sink: Arc<MemorySink>,
    config: WriterConfig,
    cancel: CancellationToken,
}

impl MemoryStore {
    /// Creates an empty store. Writers stop when `parent` is cancelled.
    #[must_use]
    pub fn new(config: WriterConfig, parent: &CancellationToken) -> Self {
        Self {
            sink: Arc::new(MemorySink::new()),
            config,
            cancel: parent.child_token(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sink.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sink.entries.is_empty()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.sink.is_connected() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized {
                component: "memory store",
            })
        }
    }
}

#[async_trait]
impl Driver for MemoryStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(self.sink.health_check().await?)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.sink.open.swap(false, Ordering::AcqRel) {
            self.cancel.cancel();
            info!(entries = self.len(), "memory store closed");
        }
        Ok(())
    }
}

#[async_trait]
impl Reader for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<String, StoreError> {
        self.ensure_open()?;
        self.sink
            .entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }
}

#[async_trait]
impl Provider for MemoryStore {
    type Record = CacheEntry;

    async fn bulk_writer(&self) -> Result<Box<dyn AsyncWriter<CacheEntry>>, StoreError> {
        self.ensure_open()?;
        self.config.validate()?;
        Ok(Box::new(BatchWriter::spawn(
            Arc::clone(&self.sink) as Arc<dyn RemoteSink<CacheEntry>>,
            WriteOperation::cache("memory"),
            &self.config,
            self.cancel.child_token(),
        )))
    }
}
