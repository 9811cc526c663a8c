//! In-process lock coordinator.
//!
//! `LockCoordinator` owns a single [`LockState`] behind one mutex. Every read
//! and write of the state happens inside that mutex, which is never held
//! across an `.await` or while a job runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::DistributedLock;

/// Ownership state of the lock.
///
/// The lock is held exactly when a holder is present, so the two can never
/// disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LockState {
    holder: Option<String>,
}

impl LockState {
    /// Returns whether some instance owns the lock.
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    /// Returns the owning instance, if any.
    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }
}

/// One period of ownership, measured on the monotonic clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderInterval {
    /// Instance that held the lock.
    pub holder: String,
    /// When `try_acquire` granted the lock.
    pub acquired_at: Instant,
    /// When the holder released it; `None` while still held.
    pub released_at: Option<Instant>,
}

impl HolderInterval {
    /// Returns whether the two ownership periods share any instant.
    ///
    /// An open interval extends indefinitely. Touching endpoints do not
    /// overlap since a release always precedes the next grant.
    pub fn overlaps(&self, other: &HolderInterval) -> bool {
        let ends_after = |a: &HolderInterval, start: Instant| match a.released_at {
            Some(end) => end > start,
            None => true,
        };
        ends_after(self, other.acquired_at) && ends_after(other, self.acquired_at)
    }
}

/// Finds the first pair of ownership periods that overlap.
///
/// Returns `None` when the history respects mutual exclusion.
pub fn find_overlap(intervals: &[HolderInterval]) -> Option<(&HolderInterval, &HolderInterval)> {
    let mut sorted: Vec<&HolderInterval> = intervals.iter().collect();
    sorted.sort_by_key(|interval| interval.acquired_at);

    sorted
        .windows(2)
        .find(|pair| pair[0].overlaps(pair[1]))
        .map(|pair| (pair[0], pair[1]))
}

/// Counters describing how the lock has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    /// Successful acquisitions.
    pub grants: u64,
    /// Acquisitions refused because the lock was held.
    pub denials: u64,
    /// Releases by an instance that did not hold the lock.
    pub stray_releases: u64,
}

impl LockStats {
    /// Total number of acquisition attempts.
    pub fn attempts(&self) -> u64 {
        self.grants + self.denials
    }
}

struct Inner {
    state: LockState,
    history: Vec<HolderInterval>,
    stats: LockStats,
}

/// In-memory mutual-exclusion coordinator for one named job.
///
/// Stands in for an external lock service. One coordinator is shared by
/// every fleet instance for the whole simulation.
pub struct LockCoordinator {
    name: String,
    inner: Mutex<Inner>,
}

impl LockCoordinator {
    /// Creates a free lock with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                state: LockState::default(),
                history: Vec::new(),
                stats: LockStats::default(),
            }),
        }
    }

    /// Returns the lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> LockState {
        self.inner().state.clone()
    }

    /// Returns the usage counters.
    pub fn stats(&self) -> LockStats {
        self.inner().stats
    }

    /// Returns every ownership period granted so far, in grant order.
    pub fn history(&self) -> Vec<HolderInterval> {
        self.inner().history.clone()
    }

    // No user code ever runs under this mutex, so a poisoned guard still
    // carries a consistent state.
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DistributedLock for LockCoordinator {
    fn try_acquire(&self, instance_id: &str) -> bool {
        let mut inner = self.inner();

        if let Some(holder) = inner.state.holder() {
            debug!(lock = %self.name, instance_id, holder, "Lock busy");
            inner.stats.denials += 1;
            return false;
        }

        inner.state.holder = Some(instance_id.to_string());
        inner.stats.grants += 1;
        inner.history.push(HolderInterval {
            holder: instance_id.to_string(),
            acquired_at: Instant::now(),
            released_at: None,
        });

        debug!(lock = %self.name, instance_id, "Lock acquired");
        true
    }

    fn release(&self, instance_id: &str) {
        let mut inner = self.inner();

        if inner.state.holder() != Some(instance_id) {
            warn!(
                lock = %self.name,
                instance_id,
                holder = ?inner.state.holder(),
                "Release by non-holder ignored"
            );
            inner.stats.stray_releases += 1;
            return;
        }

        inner.state.holder = None;
        let now = Instant::now();
        if let Some(open) = inner
            .history
            .iter_mut()
            .rev()
            .find(|interval| interval.released_at.is_none())
        {
            open.released_at = Some(now);
        }

        debug!(lock = %self.name, instance_id, "Lock released");
    }

    fn holder(&self) -> Option<String> {
        self.inner().state.holder.clone()
    }
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_new_lock_is_free() {
        let lock = LockCoordinator::new("stat-sync");

        assert_eq!(lock.name(), "stat-sync");
        assert!(!lock.state().is_held());
        assert!(lock.holder().is_none());
        assert_eq!(lock.stats(), LockStats::default());
    }

    #[test]
    fn test_second_acquire_is_denied() {
        let lock = LockCoordinator::new("stat-sync");

        assert!(lock.try_acquire("node-1"));
        assert!(!lock.try_acquire("node-2"));
        assert!(!lock.try_acquire("node-1"));

        let state = lock.state();
        assert!(state.is_held());
        assert_eq!(state.holder(), Some("node-1"));

        let stats = lock.stats();
        assert_eq!(stats.grants, 1);
        assert_eq!(stats.denials, 2);
        assert_eq!(stats.attempts(), 3);
    }

    #[test]
    fn test_release_frees_lock() {
        let lock = LockCoordinator::new("stat-sync");

        assert!(lock.try_acquire("node-1"));
        lock.release("node-1");

        assert!(!lock.state().is_held());
        assert!(lock.try_acquire("node-2"));
        assert_eq!(lock.holder().as_deref(), Some("node-2"));
    }

    #[test]
    fn test_release_by_non_holder_is_noop() {
        let lock = LockCoordinator::new("stat-sync");

        lock.release("node-1");
        assert_eq!(lock.stats().stray_releases, 1);

        assert!(lock.try_acquire("node-1"));
        lock.release("node-2");

        assert_eq!(lock.holder().as_deref(), Some("node-1"));
        assert_eq!(lock.stats().stray_releases, 2);
    }

    #[test]
    fn test_history_records_intervals() {
        let lock = LockCoordinator::new("stat-sync");

        assert!(lock.try_acquire("node-1"));
        lock.release("node-1");
        assert!(lock.try_acquire("node-2"));

        let history = lock.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].holder, "node-1");
        assert!(history[0].released_at.is_some());
        assert_eq!(history[1].holder, "node-2");
        assert!(history[1].released_at.is_none());
        assert!(find_overlap(&history).is_none());
    }

    #[test]
    fn test_interval_overlap() {
        let base = Instant::now();
        let interval = |holder: &str, start: u64, end: Option<u64>| HolderInterval {
            holder: holder.to_string(),
            acquired_at: base + Duration::from_secs(start),
            released_at: end.map(|e| base + Duration::from_secs(e)),
        };

        let a = interval("a", 0, Some(5));
        let b = interval("b", 5, Some(8));
        let c = interval("c", 4, Some(6));
        let open = interval("d", 1, None);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(open.overlaps(&b));

        let intervals = vec![b.clone(), a.clone()];
        assert!(find_overlap(&intervals).is_none());

        let intervals = vec![a, b, c];
        let (first, second) = find_overlap(&intervals).expect("overlap present");
        assert_eq!(first.holder, "a");
        assert_eq!(second.holder, "c");
    }

    #[test]
    fn test_concurrent_acquire_grants_exactly_one() {
        for _ in 0..50 {
            let lock = Arc::new(LockCoordinator::new("race"));
            let winners = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(std::sync::Barrier::new(8));

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let lock = Arc::clone(&lock);
                    let winners = Arc::clone(&winners);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        if lock.try_acquire(&format!("node-{i}")) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().expect("contender thread panicked");
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert_eq!(lock.stats().grants, 1);
            assert_eq!(lock.stats().denials, 7);
        }
    }
}
