//! Fleet-wide mutual exclusion for scheduled jobs.
//!
//! This module provides the lock that keeps a periodic job from running on
//! more than one fleet instance at a time:
//!
//! - **DistributedLock**: capability interface (`try_acquire`, `release`,
//!   `holder`) that the scheduler core is written against
//! - **LockCoordinator**: in-process implementation standing in for an
//!   external lock service
//! - **LockGuard**: scope guard that releases the lock on every exit path
//!
//! # Policy
//!
//! Acquisition is "skip if busy": a contender that finds the lock held gets
//! `false` back immediately and never waits. The internal guard only covers
//! the check-and-set; the holder keeps logical ownership for the whole job
//! and is trusted to release it afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetlock::lock::{LockCoordinator, LockGuard};
//!
//! let lock = LockCoordinator::new("stat-sync");
//! if let Some(guard) = LockGuard::try_acquire(&lock, "node-1") {
//!     // run the job; the lock is released when `guard` drops
//! }
//! ```

pub mod coordinator;

pub use coordinator::{find_overlap, HolderInterval, LockCoordinator, LockState, LockStats};

/// Mutual-exclusion capability shared by every instance of a fleet.
///
/// Implementations must make `try_acquire` indivisible with respect to all
/// concurrent callers: no two calls may both observe the lock free and both
/// succeed. Neither operation fails; every outcome is a boolean or a no-op.
pub trait DistributedLock: Send + Sync {
    /// Attempts to take the lock for `instance_id` without waiting.
    fn try_acquire(&self, instance_id: &str) -> bool;

    /// Releases the lock if `instance_id` currently holds it.
    fn release(&self, instance_id: &str);

    /// Returns the current holder, if any.
    fn holder(&self) -> Option<String>;
}

/// Ownership of a [`DistributedLock`] for the lifetime of the guard.
///
/// Dropping the guard releases the lock, so a protected region that returns
/// early, returns an error, panics or is cancelled still gives the lock back.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, L: DistributedLock + ?Sized> {
    lock: &'a L,
    holder: String,
}

impl<'a, L: DistributedLock + ?Sized> LockGuard<'a, L> {
    /// Tries to acquire `lock` for `instance_id`.
    ///
    /// Returns `None` when another instance holds the lock.
    pub fn try_acquire(lock: &'a L, instance_id: &str) -> Option<Self> {
        lock.try_acquire(instance_id).then(|| Self {
            lock,
            holder: instance_id.to_string(),
        })
    }

    /// Returns the instance owning this guard.
    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl<L: DistributedLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.release(&self.holder);
    }
}

impl<L: DistributedLock + ?Sized> std::fmt::Debug for LockGuard<'_, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("holder", &self.holder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = LockCoordinator::new("test");

        {
            let guard = LockGuard::try_acquire(&lock, "node-1").expect("lock is free");
            assert_eq!(guard.holder(), "node-1");
            assert_eq!(lock.holder().as_deref(), Some("node-1"));
            assert!(LockGuard::try_acquire(&lock, "node-2").is_none());
        }

        assert!(lock.holder().is_none());
        assert!(LockGuard::try_acquire(&lock, "node-2").is_some());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let lock = LockCoordinator::new("test");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = LockGuard::try_acquire(&lock, "node-1").expect("lock is free");
            panic!("job blew up");
        }));

        assert!(result.is_err());
        assert!(!lock.state().is_held());
        assert!(lock.try_acquire("node-2"));
    }

    #[test]
    fn test_guard_works_through_trait_object() {
        let lock: Box<dyn DistributedLock> = Box::new(LockCoordinator::new("dyn"));
        let guard = LockGuard::try_acquire(lock.as_ref(), "node-1");
        assert!(guard.is_some());
        assert!(!lock.try_acquire("node-2"));
        drop(guard);
        assert!(lock.try_acquire("node-2"));
    }
}
