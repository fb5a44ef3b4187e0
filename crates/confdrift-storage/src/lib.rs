//! Persistence for the drift check: per-target append-only snapshot
//! histories, the cross-invocation execution lock, and the freshness
//! polling contract for asynchronously produced policy files.

pub mod lock;
pub mod policy;
pub mod store;

pub use lock::{signature, ExecutionLock, LivenessProbe, LockGuard, ProcTableProbe};
pub use policy::{PolicyFetch, PolicyPoller};
pub use store::{DiffOutcome, SnapshotStore};
