//! Cancellation for an in-flight fetch.
//!
//! One token is shared by the HEAD probe and every range worker. Requests check
//! it before starting and curl's progress callback polls it during transfers;
//! a tripped token aborts the transfer with [`RangeError::Cancelled`].
//!
//! [`RangeError::Cancelled`]: crate::error::RangeError::Cancelled

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight transfers abort at their next progress tick.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
