//! Error kinds shared by every store backend and writer.

/// Errors returned by store drivers, readers, providers, and writers.
///
/// Sink implementations report failures as `anyhow::Error`; the engine wraps
/// them into [`StoreError::BackendWrite`] (batch writes) or
/// [`StoreError::Backend`] (reads and health checks).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{component} is not initialized with a backend connection")]
    NotInitialized { component: &'static str },

    #[error("backend write failed for {operation} ({records} records)")]
    BackendWrite {
        operation: String,
        records: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("no cache entry for key {key}")]
    NotFound { key: String },

    #[error("store backend not implemented: {backend}")]
    NotImplemented { backend: String },

    #[error("writer has been closed")]
    Closed,

    #[error("background writer has stopped")]
    WorkerStopped,

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, StoreError::NotImplemented { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn not_found_is_distinct_from_backend_errors() {
        let missing = StoreError::NotFound {
            key: "pod::x".to_string(),
        };
        let transport = StoreError::Backend(anyhow::anyhow!("connection reset"));
        assert!(missing.is_not_found());
        assert!(!transport.is_not_found());
        assert_eq!(missing.to_string(), "no cache entry for key pod::x");
    }

    #[test]
    fn backend_write_keeps_source() {
        let err = StoreError::BackendWrite {
            operation: "vertex:Pod".to_string(),
            records: 3,
            source: anyhow::anyhow!("timeout"),
        };
        assert_eq!(
            err.to_string(),
            "backend write failed for vertex:Pod (3 records)"
        );
        assert_eq!(err.source().unwrap().to_string(), "timeout");
    }

    #[test]
    fn not_implemented_flag() {
        let err = StoreError::NotImplemented {
            backend: "redis".to_string(),
        };
        assert!(err.is_not_implemented());
        assert!(!StoreError::Closed.is_not_implemented());
    }
}
