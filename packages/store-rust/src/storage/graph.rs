//! Graph store provider.
//!
//! [`GraphProvider`] owns the connection to the remote graph (as a
//! [`RemoteSink`] of [`GraphInsert`] records) and hands out one
//! [`BatchWriter`] per vertex or edge label.

use std::sync::Arc;

use async_trait::async_trait;
use graphsink_core::{Driver, GraphInsert, RemoteSink, StoreError, WriteOperation};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WriterConfig;
use crate::writer::BatchWriter;

/// Builds batch writers bound to one graph connection.
///
/// Closing the provider cancels the background task of every writer it
/// created; flush those writers first.
pub struct GraphProvider {
    sink: Arc<dyn RemoteSink<GraphInsert>>,
    config: WriterConfig,
    cancel: CancellationToken,
}

impl GraphProvider {
    #[must_use]
    pub fn new(sink: Arc<dyn RemoteSink<GraphInsert>>, config: WriterConfig) -> Self {
        Self::with_cancellation(sink, config, CancellationToken::new())
    }

    /// Like [`new`](Self::new), with writers also stopped when `parent` is cancelled.
    #[must_use]
    pub fn with_cancellation(
        sink: Arc<dyn RemoteSink<GraphInsert>>,
        config: WriterConfig,
        parent: CancellationToken,
    ) -> Self {
        Self {
            sink,
            config,
            cancel: parent.child_token(),
        }
    }

    /// Creates a writer for `operation` with an explicit batch size.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInitialized`] if the graph connection is not
    /// open, [`StoreError::Closed`] once the provider is closed, or a
    /// configuration error for a zero batch size.
    pub fn writer(
        &self,
        operation: WriteOperation,
        batch_size: usize,
    ) -> Result<BatchWriter<GraphInsert>, StoreError> {
        if !self.sink.is_connected() {
            return Err(StoreError::NotInitialized {
                component: "graph provider",
            });
        }
        if self.cancel.is_cancelled() {
            return Err(StoreError::Closed);
        }

        let config = self.config.with_batch_size(batch_size);
        config.validate()?;
        Ok(BatchWriter::spawn(
            Arc::clone(&self.sink),
            operation,
            &config,
            self.cancel.child_token(),
        ))
    }

    /// Writer inserting `label` vertices with the configured batch size.
    ///
    /// # Errors
    ///
    /// See [`writer`](Self::writer).
    pub fn vertex_writer(&self, label: &str) -> Result<BatchWriter<GraphInsert>, StoreError> {
        self.writer(WriteOperation::vertex(label), self.config.batch_size)
    }

    /// Writer inserting `label` edges with the configured batch size.
    ///
    /// # Errors
    ///
    /// See [`writer`](Self::writer).
    pub fn edge_writer(&self, label: &str) -> Result<BatchWriter<GraphInsert>, StoreError> {
        self.writer(WriteOperation::edge(label), self.config.batch_size)
    }
}

#[async_trait]
impl Driver for GraphProvider {
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(self.sink.health_check().await?)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            info!("graph provider closed");
        }
        Ok(())
    }
}
