//! graphsink store: asynchronous batch writers over remote graph and cache
//! backends, with a flush barrier for draining all queued and in-flight work.

pub mod config;
pub mod observe;
pub mod storage;
pub mod writer;

#[cfg(test)]
mod testing;

pub use config::{CacheBackend, LogConfig, LogFormat, StoreConfig, WriterConfig};
pub use storage::{provider_factory, CacheProvider, GraphProvider, MemoryStore};
pub use writer::{BatchWriter, InFlightTracker, WriterStatsSnapshot};
