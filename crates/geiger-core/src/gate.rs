//! Shared-state gate between the sampling and display contexts
//!
//! The producer (pulse sampling) and the consumer (statistics, display,
//! network) run on different cores and touch the same state block. Every
//! access goes through [`SharedStateGate::with_lock`], which holds the lock
//! for exactly the duration of the closure.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;

/// Scoped, exclusive access to a state block shared across executors.
///
/// Built on Embassy's async `Mutex` with a `CriticalSectionRawMutex`, which
/// is safe to share between the two cores of the ESP32-S3 and between host
/// threads. The closure passed to [`with_lock`](Self::with_lock) is
/// synchronous, so the lock can never be held across an `.await` and the
/// guard is released on every exit path, including unwinding.
pub struct SharedStateGate<T> {
    inner: AsyncMutex<CriticalSectionRawMutex, T>,
}

impl<T> SharedStateGate<T> {
    pub const fn new(state: T) -> Self {
        Self {
            inner: AsyncMutex::new(state),
        }
    }

    /// Wait for the lock, run `f` on the state and release.
    pub async fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }

    /// Run `f` only if the lock is free right now.
    pub fn try_with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.try_lock().ok()?;
        Some(f(&mut guard))
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::sync::Arc;

    #[test]
    fn test_with_lock_returns_closure_result() {
        let gate = SharedStateGate::new(41u32);

        let value = block_on(gate.with_lock(|n| {
            *n += 1;
            *n
        }));

        assert_eq!(value, 42);
        assert_eq!(gate.into_inner(), 42);
    }

    #[test]
    fn test_lock_released_after_early_return() {
        let gate = SharedStateGate::new(Some(3u32));

        let taken: Option<u32> = block_on(gate.with_lock(|slot| {
            let value = (*slot)?;
            *slot = None;
            Some(value)
        }));
        let second: Option<u32> = block_on(gate.with_lock(|slot| {
            let value = (*slot)?;
            Some(value)
        }));

        assert_eq!(taken, Some(3));
        assert_eq!(second, None);
        assert!(gate.try_with_lock(|_| ()).is_some());
    }

    #[test]
    fn test_lock_released_after_panic() {
        let gate = SharedStateGate::new(0u32);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            block_on(gate.with_lock(|_| panic!("boom")))
        }));

        assert!(result.is_err());
        assert_eq!(gate.try_with_lock(|n| *n), Some(0));
    }

    #[test]
    fn test_try_with_lock_contended() {
        let gate = SharedStateGate::new(7u32);

        let nested = block_on(gate.with_lock(|_| gate.try_with_lock(|n| *n)));

        assert_eq!(nested, None);
        assert_eq!(gate.try_with_lock(|n| *n), Some(7));
    }

    #[test]
    fn test_two_threads_never_interleave() {
        let gate = Arc::new(SharedStateGate::new((0u64, 0u64)));
        let mut handles = Vec::new();

        for _ in 0..2 {
            let gate = Arc::clone(&gate);
            handles.push(std::thread::spawn(move || {
                for _ in 0..5_000 {
                    block_on(gate.with_lock(|(a, b)| {
                        *a += 1;
                        // Both halves must move together inside one critical section
                        assert_eq!(*a, *b + 1);
                        *b += 1;
                    }));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        assert_eq!(block_on(gate.with_lock(|(a, b)| (*a, *b))), (10_000, 10_000));
    }
}
