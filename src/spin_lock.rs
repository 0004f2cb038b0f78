//! A busy-waiting lock.
//!
//! [`SpinLock`] never parks the calling thread. It spins on a single atomic flag until the flag
//! can be flipped from unlocked to locked. There is no backoff and no fairness, so under heavy
//! contention waiting threads burn CPU. It only pays off for critical sections as short as the
//! O(1) cache operations it is meant to guard.
//!
//! `SpinLock` implements [`lock_api::RawMutex`], so it can stand in for `parking_lot`'s mutex in
//! [`SynchronizedCache`](crate::SynchronizedCache) or be used through [`SpinMutex`].

use parking_lot::lock_api::{self, GuardSend};
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

/// A mutex protecting `T` with a [`SpinLock`].
pub type SpinMutex<T> = lock_api::Mutex<SpinLock, T>;

#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquires the lock, spinning until it becomes available.
    pub fn lock(&self) {
        while !self.try_lock() {
            hint::spin_loop();
        }
    }

    /// Attempts to acquire the lock without spinning. Returns whether the lock was acquired.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// The flag is cleared unconditionally. Calling this without holding the lock releases it on
    /// behalf of whoever holds it.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

// SAFETY: the flag only transitions from false to true through a successful compare-exchange with
// acquire ordering and back through a release store, so at most one holder exists at a time.
#[allow(unsafe_code)]
unsafe impl lock_api::RawMutex for SpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: SpinLock = SpinLock::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        SpinLock::lock(self);
    }

    fn try_lock(&self) -> bool {
        SpinLock::try_lock(self)
    }

    unsafe fn unlock(&self) {
        SpinLock::unlock(self);
    }

    fn is_locked(&self) -> bool {
        SpinLock::is_locked(self)
    }
}
