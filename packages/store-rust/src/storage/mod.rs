//! Store backends and provider selection.
//!
//! - [`GraphProvider`]: batch writers over a remote graph connection
//! - [`MemoryStore`]: in-process cache provider
//! - [`provider_factory`]: builds the cache provider named by configuration

pub mod factory;
pub mod graph;
pub mod memory;

pub use factory::{provider_factory, CacheProvider};
pub use graph::GraphProvider;
pub use memory::{MemorySink, MemoryStore};
