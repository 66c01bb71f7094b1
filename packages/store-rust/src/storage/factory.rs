//! Selects and builds the configured cache [`Provider`].

use std::sync::Arc;

use graphsink_core::{CacheEntry, Provider, StoreError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{CacheBackend, StoreConfig};
use crate::storage::memory::MemoryStore;

/// Shared handle to a cache provider.
pub type CacheProvider = Arc<dyn Provider<Record = CacheEntry>>;

/// Builds the cache provider named by `config.backend`.
///
/// Writers created by the provider stop when `cancel` is cancelled.
///
/// # Errors
///
/// Returns [`StoreError::NotImplemented`] when no backend is configured or the
/// configured backend has no implementation, and a configuration error for
/// invalid writer settings. Both are startup-time failures.
pub fn provider_factory(
    config: &StoreConfig,
    cancel: &CancellationToken,
) -> Result<CacheProvider, StoreError> {
    config.writer.validate()?;

    match config.backend {
        CacheBackend::Memory => {
            info!(
                backend = config.backend.as_str(),
                batch_size = config.writer.batch_size,
                "cache provider ready"
            );
            Ok(Arc::new(MemoryStore::new(config.writer.clone(), cancel)))
        }
        backend @ (CacheBackend::None | CacheBackend::Redis | CacheBackend::Mongo) => {
            Err(StoreError::NotImplemented {
                backend: backend.as_str().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use graphsink_core::{AsyncWriter, CacheKey, Driver, Reader};

    use super::*;
    use crate::config::WriterConfig;

    fn config(backend: CacheBackend) -> StoreConfig {
        StoreConfig {
            backend,
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn memory_backend_builds_working_provider() {
        let provider = provider_factory(&config(CacheBackend::Memory), &CancellationToken::new())
            .unwrap();
        assert!(provider.health_check().await.unwrap());

        let writer = provider.bulk_writer().await.unwrap();
        let key = CacheKey::new("endpoint", "svc:443");
        writer
            .queue(CacheEntry::json(key.clone(), &vec!["10.0.0.1"]).unwrap())
            .await
            .unwrap();
        writer.flush().await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(provider.get(&key).await.unwrap(), r#"["10.0.0.1"]"#);
        provider.close().await.unwrap();
    }

    #[test]
    fn unconfigured_backend_is_not_implemented() {
        let err = provider_factory(&config(CacheBackend::None), &CancellationToken::new())
            .err()
            .unwrap();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn remote_backends_are_not_implemented() {
        for backend in [CacheBackend::Redis, CacheBackend::Mongo] {
            match provider_factory(&config(backend), &CancellationToken::new()) {
                Err(StoreError::NotImplemented { backend: name }) => {
                    assert_eq!(name, backend.as_str());
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("{} should not be available", backend.as_str()),
            }
        }
    }

    #[test]
    fn invalid_writer_config_is_rejected_before_backend_selection() {
        let config = StoreConfig {
            backend: CacheBackend::Memory,
            writer: WriterConfig::default().with_batch_size(0),
            ..StoreConfig::default()
        };
        let err = provider_factory(&config, &CancellationToken::new())
            .err()
            .unwrap();
        assert!(!err.is_not_implemented());
    }
}
