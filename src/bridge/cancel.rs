use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal shared by a bridge and its pump.
///
/// This is a polled flag, not a mutex: [`request_shutdown`] writes it,
/// and the pump reads it once per iteration at the top of the loop. The
/// store uses release ordering and the load acquire ordering, so a set
/// observed by the pump also makes everything the requester did before
/// setting it visible to the pump task.
///
/// Cancelling is idempotent; the flag never resets.
///
/// [`request_shutdown`]: crate::bridge::EventBridge::request_shutdown
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the pump's next iteration
    /// boundary; an in-flight receive is never interrupted.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
