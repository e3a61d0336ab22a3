//! Progress reporting trait for the routing stage and the orchestrator.
//!
//! Defines a [`ProgressCallback`] trait that decouples progress reporting
//! from any rendering backend (`indicatif` bars in the CLI, silence in
//! tests). Routing reports one tick per origin node from `rayon` worker
//! threads, so implementations must be thread-safe.

use std::sync::Arc;

/// Trait for reporting progress from long-running stages.
///
/// Implementations must be `Send + Sync` because ticks arrive from
/// parallel routing workers.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
