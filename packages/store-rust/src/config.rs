//! Configuration types for store backends and batch writers.

use serde::Deserialize;

use graphsink_core::StoreError;

/// Largest accepted `batch_size`.
pub const MAX_BATCH_SIZE: usize = 1 << 20;

/// Largest dispatch channel capacity, in batches.
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// Batch writer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// A buffer is dispatched once it holds more than this many records.
    pub batch_size: usize,
    /// Dispatch channel capacity, as a multiple of `batch_size` (in batches).
    pub channel_size_factor: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            channel_size_factor: 5,
        }
    }
}

impl WriterConfig {
    /// Same settings with a different batch size.
    #[must_use]
    pub fn with_batch_size(&self, batch_size: usize) -> Self {
        Self {
            batch_size,
            ..self.clone()
        }
    }

    /// Number of batches the dispatch channel holds before producers stall.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.batch_size
            .saturating_mul(self.channel_size_factor)
            .clamp(1, MAX_CHANNEL_CAPACITY)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the batch size or channel factor is
    /// zero, or if either would exceed [`MAX_BATCH_SIZE`] /
    /// [`MAX_CHANNEL_CAPACITY`].
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("writer batch_size must be at least 1").into());
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(anyhow::anyhow!(
                "writer batch_size {} exceeds the maximum of {MAX_BATCH_SIZE}",
                self.batch_size
            )
            .into());
        }
        if self.channel_size_factor == 0 {
            return Err(anyhow::anyhow!("writer channel_size_factor must be at least 1").into());
        }
        match self.batch_size.checked_mul(self.channel_size_factor) {
            Some(capacity) if capacity <= MAX_CHANNEL_CAPACITY => Ok(()),
            _ => Err(anyhow::anyhow!(
                "writer channel capacity ({} x {}) exceeds the maximum of {MAX_CHANNEL_CAPACITY} batches",
                self.batch_size,
                self.channel_size_factor
            )
            .into()),
        }
    }
}

/// Which cache backend the provider factory should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Nothing configured.
    #[default]
    None,
    /// In-process map; no persistence.
    Memory,
    Redis,
    Mongo,
}

impl CacheBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackend::None => "none",
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
            CacheBackend::Mongo => "mongo",
        }
    }
}

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Top-level store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: CacheBackend,
    pub writer: WriterConfig,
    pub log: LogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_config_defaults() {
        let config = WriterConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.channel_size_factor, 5);
        assert_eq!(config.channel_capacity(), 2500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = WriterConfig::default().with_batch_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_channel_factor_is_rejected() {
        let config = WriterConfig {
            batch_size: 10,
            channel_size_factor: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_batch_size_is_rejected() {
        assert!(WriterConfig::default().with_batch_size(usize::MAX).validate().is_err());
        assert!(WriterConfig::default()
            .with_batch_size(MAX_BATCH_SIZE + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn overflowing_channel_capacity_is_rejected_and_clamped() {
        let config = WriterConfig {
            batch_size: MAX_BATCH_SIZE,
            channel_size_factor: usize::MAX,
        };
        assert!(config.validate().is_err());
        assert_eq!(config.channel_capacity(), MAX_CHANNEL_CAPACITY);

        let at_limit = WriterConfig {
            batch_size: MAX_BATCH_SIZE,
            channel_size_factor: 1,
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn store_config_defaults_to_no_backend() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, CacheBackend::None);
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn store_config_deserializes_partial_json() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"backend": "memory", "writer": {"batch_size": 50}, "log": {"format": "json"}}"#,
        )
        .unwrap();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.writer.batch_size, 50);
        assert_eq!(config.writer.channel_size_factor, 5);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "info");
    }
}
