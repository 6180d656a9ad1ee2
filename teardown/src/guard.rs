//! Scope-bound release.
//!
//! Nothing in this crate releases a container or component on its own when it
//! is dropped. Owners that want "release on every exit path" wrap the
//! resource in a [`ReleaseGuard`], which releases it when the guard goes out
//! of scope, on early returns and unwinding included.

use std::fmt;
use std::ops::Deref;

use tracing::{debug, error};

use crate::errors::ReleaseResult;
use crate::resource::Release;

/// Releases the wrapped resource when dropped.
///
/// ```rust
/// use teardown::{Component, ReleaseGuard};
///
/// let component = std::sync::Arc::new(Component::new());
/// {
///     let _guard = ReleaseGuard::new(std::sync::Arc::clone(&component));
///     // ... use the component ...
/// }
/// assert!(component.is_released());
/// ```
pub struct ReleaseGuard<T: Release> {
    // `None` only once `into_inner` has taken the resource out.
    resource: Option<T>,
    armed: bool,
}

impl<T: Release> ReleaseGuard<T> {
    /// Guards `resource`.
    pub const fn new(resource: T) -> Self {
        Self {
            resource: Some(resource),
            armed: true,
        }
    }

    /// Borrows the guarded resource.
    pub fn get(&self) -> &T {
        self.resource
            .as_ref()
            .expect("resource is present until into_inner consumes the guard")
    }

    /// Releases now and returns the result instead of logging it.
    pub fn release(mut self) -> ReleaseResult<()> {
        self.armed = false;
        self.get().release()
    }

    /// Disarms the guard and hands the resource back unreleased.
    pub fn into_inner(mut self) -> T {
        self.armed = false;
        self.resource
            .take()
            .expect("resource is present until into_inner consumes the guard")
    }

    /// Drops the guard and the resource without releasing it.
    pub fn dismiss(mut self) {
        self.armed = false;
    }

    /// Returns true while the guard will release on drop.
    pub const fn is_armed(&self) -> bool {
        self.armed
    }
}

impl<T: Release> Deref for ReleaseGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: Release> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        let Some(resource) = self.resource.as_ref().filter(|_| self.armed) else {
            return;
        };
        debug!("releasing guarded resource at end of scope");
        if let Err(err) = resource.release() {
            error!(error = %err, "guarded resource failed to release at end of scope");
        }
    }
}

impl<T: Release + fmt::Debug> fmt::Debug for ReleaseGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("resource", &self.resource)
            .field("armed", &self.armed)
            .finish()
    }
}
