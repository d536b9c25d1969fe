//! Type aliases shared across the ReliefKit crates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, polled between V-cycles and pipeline stages.
///
/// # Example
/// ```rust
/// use reliefkit_core::types::{cancel_flag, is_cancelled};
///
/// let flag = cancel_flag();
/// assert!(!is_cancelled(Some(&flag)));
/// flag.store(true, std::sync::atomic::Ordering::Relaxed);
/// assert!(is_cancelled(Some(&flag)));
/// ```
pub type CancelFlag = Arc<AtomicBool>;

/// Create a fresh, unset cancellation flag.
pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// `true` once the optional flag has been raised.
#[inline]
pub fn is_cancelled(flag: Option<&CancelFlag>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}
