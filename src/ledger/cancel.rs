//! ledger::cancel
//!
//! Cooperative cancellation for delivery.
//!
//! A [`CancelSignal`] is a shared flag plus a notifier. The command layer
//! trips it on Ctrl-C; the delivery loop checks it before each attempt and
//! races it against backoff sleeps. A request already on the wire is always
//! allowed to finish so the caller never sees an ambiguous partial write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation handle.
///
/// # Example
///
/// ```
/// use trailmark::ledger::CancelSignal;
///
/// let signal = CancelSignal::new();
/// let observer = signal.clone();
/// assert!(!observer.is_cancelled());
///
/// signal.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// Create a signal that has not been tripped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal and wake every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether the signal has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is tripped.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Trip this signal when the process receives Ctrl-C.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling delivery");
                signal.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_tripped() {
        let signal = CancelSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already cancelled");
    }

    #[test]
    fn clones_share_state() {
        let a = CancelSignal::new();
        let b = a.clone();
        b.cancel();
        assert!(a.is_cancelled());
    }
}
