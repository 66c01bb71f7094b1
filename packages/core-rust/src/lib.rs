//! graphsink core: record types, error kinds, and the store contract traits
//! shared by every backend.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StoreError;
pub use traits::{AsyncWriter, Driver, Provider, Reader, RemoteSink};
pub use types::{CacheEntry, CacheKey, GraphInsert, OperationKind, Value, WriteOperation};
