//! Cooperative cancellation handle (§5 "every asynchronous runtime
//! operation accepts a cancellation handle").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A handle shared between the caller and whatever suspension point is
/// waiting on its behalf (a `rent`, a `copy`, a `synchronize`, a `launch`).
/// Cloning shares the same underlying cancellation state.
#[derive(Clone, Default)]
pub struct CancellationHandle {
    canceled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        CancellationHandle::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Cancel the operation(s) waiting on this handle. Idempotent.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once this handle is canceled; resolves immediately if it
    /// already was.
    pub async fn canceled(&self) {
        if self.is_canceled() {
            return;
        }
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_a_pending_waiter() {
        let handle = CancellationHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move {
            waiter.canceled().await;
        });
        handle.cancel();
        task.await.unwrap();
        assert!(handle.is_canceled());
    }

    #[tokio::test]
    async fn already_canceled_resolves_immediately() {
        let handle = CancellationHandle::new();
        handle.cancel();
        handle.canceled().await;
    }
}
