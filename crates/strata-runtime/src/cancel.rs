//! Run-level cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that stops a run from starting any further batch.
///
/// Raising it never interrupts a backend call already in flight; the
/// current batch is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    raised: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Creates a signal that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Every clone observes it.
    pub fn raise(&self) {
        if !self.raised.swap(true, Ordering::SeqCst) {
            tracing::warn!("cancellation requested, no further batches will start");
        }
    }

    /// Returns whether the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = CancelSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_raised());
        handle.raise();
        handle.raise();
        assert!(signal.is_raised());
    }
}
