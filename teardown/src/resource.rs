//! Releasable resources.
//!
//! A resource is anything with exactly one teardown operation, expressed by
//! the [`Release`] trait. Calling it twice must be harmless, and that is the
//! resource's own responsibility: containers only promise they will not call
//! it twice themselves.
//!
//! Containers are generic over the resource type. When several kinds of
//! resources must live in one container, wrap them in a [`ResourceHandle`],
//! a shared type-erased handle that compares by identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::ReleaseResult;

/// An entity with a single release (teardown) operation.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use teardown::{Release, ReleaseResult};
///
/// struct Subscription {
///     active: AtomicBool,
/// }
///
/// impl Release for Subscription {
///     fn release(&self) -> ReleaseResult<()> {
///         self.active.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
pub trait Release: Send + Sync {
    /// Tears the resource down.
    fn release(&self) -> ReleaseResult<()>;
}

impl<T: Release + ?Sized> Release for Arc<T> {
    fn release(&self) -> ReleaseResult<()> {
        (**self).release()
    }
}

impl<T: Release + ?Sized> Release for Box<T> {
    fn release(&self) -> ReleaseResult<()> {
        (**self).release()
    }
}

/// Shared, type-erased handle to a resource.
///
/// Two handles are equal when they point at the same resource, so a handle
/// returned by registration can later be used to remove exactly that entry.
#[derive(Clone)]
pub struct ResourceHandle {
    inner: Arc<dyn Release>,
}

impl ResourceHandle {
    /// Wraps a resource in a new handle.
    pub fn new<R: Release + 'static>(resource: R) -> Self {
        Self {
            inner: Arc::new(resource),
        }
    }

    /// Wraps an already shared resource without another allocation.
    pub fn from_arc(resource: Arc<dyn Release>) -> Self {
        Self { inner: resource }
    }

    /// Returns true if both handles refer to the same resource.
    pub fn same_resource(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.inner).cast::<()>()
    }
}

impl<R: Release + 'static> From<Arc<R>> for ResourceHandle {
    fn from(resource: Arc<R>) -> Self {
        Self { inner: resource }
    }
}

impl Release for ResourceHandle {
    fn release(&self) -> ReleaseResult<()> {
        self.inner.release()
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_resource(other)
    }
}

impl Eq for ResourceHandle {}

impl Hash for ResourceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceHandle").field(&self.addr()).finish()
    }
}

type ReleaseFn = Box<dyn FnOnce() -> ReleaseResult<()> + Send>;

/// A resource backed by a closure that runs on the first release only.
///
/// Useful for registering ad-hoc cleanup (unsubscribe, close, unmap) without
/// defining a type for it.
///
/// ```rust
/// use teardown::{Release, ReleaseAction};
///
/// let action = ReleaseAction::new(|| {
///     println!("closing");
///     Ok(())
/// });
/// action.release().unwrap();
/// action.release().unwrap(); // no-op
/// assert!(action.is_released());
/// ```
pub struct ReleaseAction {
    action: Mutex<Option<ReleaseFn>>,
    released: AtomicBool,
}

impl ReleaseAction {
    /// Creates an action that runs `f` when first released.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> ReleaseResult<()> + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(f))),
            released: AtomicBool::new(false),
        }
    }

    /// Returns true once the action has been taken for execution.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Release for ReleaseAction {
    fn release(&self) -> ReleaseResult<()> {
        let action = self.action.lock().take();
        match action {
            Some(f) => {
                self.released.store(true, Ordering::Release);
                f()
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ReleaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseAction")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
