//! Append-only sample record and the cancel token for sampling loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::Sample;

/// Output samples captured while recording, in acquisition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    samples: Vec<Sample>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Shared stop flag for `record_ramping` / `start_record`.
///
/// Clones observe the same flag; setting it from another thread (or a
/// signal handler) ends the loop at the next sample boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can drive another loop.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
