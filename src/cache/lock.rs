//! Poison recovery for the crate's std lock slots.
//!
//! A poisoned lock means some thread panicked while holding the guard. The
//! guarded values here are small whole-value slots that are replaced, never
//! partially mutated, so the stored value is still coherent and the lock is
//! recovered with a warning instead of propagating the panic.

use std::sync::LockResult;

use tracing::warn;

const TARGET: &str = "scorta::lock";

pub(crate) fn recover<G>(result: LockResult<G>, slot: &'static str) -> G {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(target: TARGET, slot, "recovered poisoned lock");
            poisoned.into_inner()
        }
    }
}
