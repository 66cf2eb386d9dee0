//! Real implementations of the collaborator traits

pub mod comparator;
pub mod sinks;
pub mod snapshot_store;

#[cfg(test)]
pub mod tests;

pub use comparator::StructuralComparator;
pub use sinks::{ChannelOutcomeSink, SinkEvent, TracingOutcomeSink};
pub use snapshot_store::{JsonSnapshotStore, MemorySnapshotStore};
