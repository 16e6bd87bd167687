use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Token for cooperative cancellation, shared between the caller and the worker pool.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns Ok(()) to continue, Err if cancelled.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            return Err(CancelledError);
        }
        Ok(())
    }
}

/// Error indicating the operation was cancelled.
#[derive(Debug, Clone, Copy, Error)]
#[error("Operation cancelled")]
pub struct CancelledError;
