//! Process-local caching in front of the snapshot store.
//!
//! Nothing here coordinates across processes: every deployed instance keeps
//! its own cache, and correctness relies only on the snapshot file being
//! replaced atomically.

pub mod dedup;
pub(crate) mod lock;
pub mod snapshot_cache;
