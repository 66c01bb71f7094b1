//! Batch accumulation, background dispatch, and the flush barrier.

pub mod batch_writer;
pub mod in_flight;

pub use batch_writer::{BatchWriter, WriterStatsSnapshot};
pub use in_flight::{InFlightGuard, InFlightTracker};
