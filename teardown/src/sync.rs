//! Scoped shared/exclusive locking with poison recovery.
//!
//! Containers guard their state with a [`std::sync::RwLock`]. A release
//! operation is user code and may panic, and a panic must not turn every
//! later call on the container into a second panic. The extension trait here
//! recovers poisoned locks and offers closure-scoped access, so the lock is
//! released on every exit path of the closure, unwinding included.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Extension trait for `RwLock` to provide recovery from poisoned locks
/// and scoped shared/exclusive access.
pub trait RwLockRecovery<T> {
    /// Acquires a read lock, recovering from poison if necessary.
    ///
    /// The state behind a poisoned lock is whatever the panicking thread left
    /// behind. Callers keep their invariants valid at every await-free step,
    /// so the recovered state is still consistent.
    fn read_recover(&self) -> RwLockReadGuard<'_, T>;

    /// Acquires a write lock, recovering from poison if necessary.
    fn write_recover(&self) -> RwLockWriteGuard<'_, T>;

    /// Runs `f` with shared access. Other readers may run concurrently;
    /// writers are excluded until `f` returns or unwinds.
    fn with_shared<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.read_recover();
        f(&guard)
    }

    /// Runs `f` with exclusive access. All other readers and writers are
    /// excluded until `f` returns or unwinds.
    fn with_exclusive<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.write_recover();
        f(&mut guard)
    }
}

impl<T> RwLockRecovery<T> for RwLock<T> {
    fn read_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering poisoned container lock for read");
            poisoned.into_inner()
        })
    }

    fn write_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering poisoned container lock for write");
            self.clear_poison();
            poisoned.into_inner()
        })
    }
}
