//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cheap, cloneable flag checked at suspension
//! points: between executable-lookup candidates, before spawning a
//! subprocess, and while blocking in `wait`. The token handed to
//! `Runtime::execute` governs the subprocess lifetime; the token handed
//! to `wait` only bounds how long the caller blocks.

use crate::error::{MusterError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cancellation flag shared between the requester and background work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token as cancelled. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(MusterError::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MusterError::Cancelled);
        }
        Ok(())
    }
}
