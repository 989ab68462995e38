use essentials_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent **intent** (e.g. "rename this base item"). They are
/// transient and are turned into events once accepted; invalid commands are
/// rejected with validation errors and produce nothing.
///
/// Commands are cloneable and own all their data so they can be logged,
/// retried, or moved across threads.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
