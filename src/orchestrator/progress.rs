//! Progress reporting hooks for batch runs.
//!
//! Frontends implement `BatchProgress` to surface status; every hook has a
//! no-op default.

use crate::client::ProtocolError;
use crate::models::RequestSpec;

pub trait BatchProgress: Send {
    /// Called once with the number of queued specs.
    fn begin(&mut self, _total: usize) {}

    /// A new attempt for `spec` is about to start (1-based).
    fn attempt(&mut self, _spec: &RequestSpec, _attempt: u32) {}

    /// The attempt failed and will be retried.
    fn retry(&mut self, _spec: &RequestSpec, _error: &ProtocolError) {}

    /// `spec` completed with `records` proceedings.
    fn item_done(&mut self, _spec: &RequestSpec, _records: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;

impl BatchProgress for NullProgress {}
