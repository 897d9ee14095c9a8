//! Device memory pools (§4.6, §5, §9 "active-allocations counter").
//!
//! A pool serializes `rent`/`return_to_pool` through an internal lock
//! (mutex-guarded free list) while its statistics -- the active-allocations
//! count -- are updated with a bare `AtomicUsize`, per §5's "statistics are
//! updated atomically".

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use crate::cancellation::CancellationHandle;
use crate::error::RuntimeError;

/// A buffer rented from a [`Pool`]. Must be handed back via
/// [`Pool::return_to_pool`] to release its capacity slot and decrement the
/// active-allocations counter; dropping it without returning leaks its
/// permit (mirrors a host buffer a caller forgot to free).
pub struct PooledBuffer {
    pub bytes: Vec<u8>,
    permit: tokio::sync::OwnedSemaphorePermit,
}

impl PooledBuffer {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A fixed-capacity pool of device buffers. `capacity` bounds how many
/// buffers may be rented out concurrently; a `rent` beyond that capacity
/// suspends the caller until a buffer is returned (§5 "Suspension points").
pub struct Pool {
    capacity: Arc<Semaphore>,
    free_list: Mutex<Vec<Vec<u8>>>,
    active_allocations: AtomicUsize,
}

impl Pool {
    pub fn new(capacity: usize) -> Self {
        Pool {
            capacity: Arc::new(Semaphore::new(capacity)),
            free_list: Mutex::new(Vec::new()),
            active_allocations: AtomicUsize::new(0),
        }
    }

    /// Number of buffers currently held by callers (rented but not yet
    /// returned). Exact at every point between calls (§9): a blocked or
    /// canceled `rent` never contributes to it.
    pub fn active_allocations(&self) -> usize {
        self.active_allocations.load(Ordering::SeqCst)
    }

    /// Rent a `bytes`-sized buffer, reusing a returned one of sufficient
    /// size when the free list has one, allocating fresh otherwise. Blocks
    /// (cooperatively, cancelable via `cancellation`) while the pool is at
    /// capacity.
    pub async fn rent(&self, bytes: usize, cancellation: &CancellationHandle) -> Result<PooledBuffer, RuntimeError> {
        let permit = tokio::select! {
            biased;
            _ = cancellation.canceled() => return Err(RuntimeError::Canceled),
            acquired = Arc::clone(&self.capacity).acquire_owned() => acquired.map_err(|e| RuntimeError::AllocationFailed { reason: e.to_string() })?,
        };

        let buffer = {
            let mut free = self.free_list.lock().await;
            free.iter()
                .position(|b| b.len() >= bytes)
                .map(|index| free.swap_remove(index))
                .unwrap_or_else(|| vec![0u8; bytes])
        };

        // Only a successful rent touches the counter (§9).
        self.active_allocations.fetch_add(1, Ordering::SeqCst);
        Ok(PooledBuffer {
            bytes: buffer,
            permit,
        })
    }

    /// Return a rented buffer: zero it, push it back onto the free list,
    /// then decrement the counter and release its capacity slot (§9: the
    /// decrement happens "after the buffer has been zeroed/reset and before
    /// the pool's free-list gains the slot back" -- the permit release,
    /// which is what actually admits the next waiter, happens last so a
    /// waiter never observes a freed slot before the counter reflects it).
    pub async fn return_to_pool(&self, mut buffer: PooledBuffer) {
        buffer.bytes.iter_mut().for_each(|b| *b = 0);
        self.active_allocations.fetch_sub(1, Ordering::SeqCst);
        let mut free = self.free_list.lock().await;
        free.push(buffer.bytes);
        drop(free);
        drop(buffer.permit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rent_increments_and_return_decrements_active_allocations() {
        let pool = Pool::new(4);
        let cancellation = CancellationHandle::new();
        assert_eq!(pool.active_allocations(), 0);

        let a = pool.rent(16, &cancellation).await.unwrap();
        assert_eq!(pool.active_allocations(), 1);
        let b = pool.rent(16, &cancellation).await.unwrap();
        assert_eq!(pool.active_allocations(), 2);

        pool.return_to_pool(a).await;
        assert_eq!(pool.active_allocations(), 1);
        pool.return_to_pool(b).await;
        assert_eq!(pool.active_allocations(), 0);
    }

    #[tokio::test]
    async fn returned_buffer_is_zeroed_before_reuse() {
        let pool = Pool::new(1);
        let cancellation = CancellationHandle::new();
        let mut a = pool.rent(8, &cancellation).await.unwrap();
        a.bytes.fill(0xFF);
        pool.return_to_pool(a).await;

        let b = pool.rent(8, &cancellation).await.unwrap();
        assert!(b.bytes.iter().all(|&byte| byte == 0));
    }

    #[tokio::test]
    async fn rent_blocks_at_capacity_until_a_return() {
        let pool = Arc::new(Pool::new(1));
        let cancellation = CancellationHandle::new();
        let held = pool.rent(4, &cancellation).await.unwrap();
        assert_eq!(pool.active_allocations(), 1);

        let pool2 = Arc::clone(&pool);
        let waiter = tokio::spawn(async move {
            let cancellation = CancellationHandle::new();
            pool2.rent(4, &cancellation).await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        pool.return_to_pool(held).await;
        waiter.await.unwrap();
    }

    /// §9: "a canceled pending `rent` never increments" the counter.
    #[tokio::test]
    async fn canceling_a_blocked_rent_never_increments_the_counter() {
        let pool = Arc::new(Pool::new(1));
        let cancellation = CancellationHandle::new();
        let held = pool.rent(4, &cancellation).await.unwrap();

        let blocked_cancellation = CancellationHandle::new();
        let waiter_cancellation = blocked_cancellation.clone();
        let pool2 = Arc::clone(&pool);
        let waiter = tokio::spawn(async move { pool2.rent(4, &waiter_cancellation).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        blocked_cancellation.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(RuntimeError::Canceled)));
        assert_eq!(pool.active_allocations(), 1);

        pool.return_to_pool(held).await;
        assert_eq!(pool.active_allocations(), 0);
    }
}
