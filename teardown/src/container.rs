//! Thread-safe, order-preserving aggregate of releasable resources.
//!
//! A [`ResourceContainer`] owns the resources added to it until they are
//! removed or until the container itself is released. Release happens exactly
//! once: the first [`release_all`](ResourceContainer::release_all) empties the
//! container and releases every stored resource in insertion order, and every
//! later call is a no-op.
//!
//! # Concurrency
//!
//! Readers (`contains`, `len`, `get`, `copy_to`, snapshot-taking) share the
//! lock; writers (`add`, `remove`, `clear`, `release_all`) take it
//! exclusively. Resource release operations always run *outside* the lock:
//!
//! - `release_all` marks the container released and drains the sequence under
//!   the exclusive lock, drops the lock, then releases the drained resources.
//!   A release operation may therefore call back into the same container (for
//!   example to remove itself) without deadlocking. While the drained
//!   resources are still being torn down, readers already observe the
//!   released state and get the post-release defaults.
//! - `add` on a released container hands the resource back out of the
//!   critical section and releases it immediately, without storing it.
//!
//! # Enumeration
//!
//! Enumeration uses the snapshot strategy. [`iter`](ResourceContainer::iter)
//! copies the sequence under a brief shared lock and returns an independent
//! iterator over the copy. Mutations made during iteration are not visible to
//! it, and no lock is held while the caller iterates.
//!
//! # Example
//!
//! ```rust
//! use teardown::{ReleaseAction, ResourceContainer, ResourceHandle};
//!
//! let container = ResourceContainer::new();
//! let handle = ResourceHandle::new(ReleaseAction::new(|| Ok(())));
//! container.add(handle.clone()).unwrap();
//! assert_eq!(container.len(), 1);
//!
//! container.release_all().unwrap();
//! assert!(container.is_released());
//! assert!(container.is_empty());
//! assert!(!container.contains(&handle));
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::config::{CapacityHint, ContainerConfig};
use crate::errors::{ContainerError, ContainerResult, ReleaseFailures, ReleaseResult};
use crate::resource::Release;
use crate::sync::RwLockRecovery;

#[derive(Debug)]
struct State<R> {
    items: Vec<R>,
    released: bool,
}

/// A thread-safe, ordered aggregate of releasable resources with
/// release-once semantics.
pub struct ResourceContainer<R> {
    state: RwLock<State<R>>,
    config: ContainerConfig,
}

impl<R: Release> ResourceContainer<R> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates an empty container with room for `capacity` resources.
    pub fn with_capacity(capacity: CapacityHint) -> Self {
        Self::with_config(ContainerConfig::default().with_capacity(capacity))
    }

    /// Creates an empty container from explicit settings.
    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            state: RwLock::new(State {
                items: Vec::with_capacity(config.capacity.into_inner()),
                released: false,
            }),
            config,
        }
    }

    /// Creates a container pre-seeded with `resources`, kept in iteration
    /// order.
    pub fn from_resources(resources: impl IntoIterator<Item = R>) -> Self {
        let container = Self::new();
        container.state.with_exclusive(|state| state.items.extend(resources));
        container
    }

    /// The settings this container was built with.
    pub const fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Adds a resource.
    ///
    /// On a live container the resource is appended and owned from now on.
    /// On a released container it is not stored; its release operation runs
    /// immediately and that result is returned.
    pub fn add(&self, resource: R) -> ReleaseResult<()> {
        let rejected = self.state.with_exclusive(|state| {
            if state.released {
                Some(resource)
            } else {
                state.items.push(resource);
                None
            }
        });

        match rejected {
            Some(resource) => {
                trace!(
                    label = self.config.label_str(),
                    "container already released; releasing added resource immediately"
                );
                resource.release()
            }
            None => Ok(()),
        }
    }

    /// Returns true once [`release_all`](Self::release_all) has started.
    pub fn is_released(&self) -> bool {
        self.state.with_shared(|state| state.released)
    }

    /// Number of stored resources; 0 once released.
    pub fn len(&self) -> usize {
        self.state.with_shared(|state| state.items.len())
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the container without releasing anything.
    ///
    /// The detached resources are dropped; their release operations are not
    /// called. No-op on a released container.
    pub fn clear(&self) {
        let detached = self.state.with_exclusive(|state| std::mem::take(&mut state.items));
        drop(detached);
    }

    /// Releases the container and every resource it holds.
    ///
    /// The first call marks the container released, empties it, and then
    /// releases the drained resources in insertion order outside the lock.
    /// A failing resource does not stop the others from being released; all
    /// failures are returned together once every resource was attempted.
    /// Later calls do nothing and return `Ok(())`.
    pub fn release_all(&self) -> ReleaseResult<()> {
        let drained = self.state.with_exclusive(|state| {
            if state.released {
                return None;
            }
            state.released = true;
            Some(std::mem::take(&mut state.items))
        });

        let Some(drained) = drained else {
            return Ok(());
        };

        let label = self.config.label_str();
        debug!(label, count = drained.len(), "releasing container");

        let mut failures = ReleaseFailures::default();
        for (index, resource) in drained.into_iter().enumerate() {
            if let Err(error) = resource.release() {
                warn!(label, index, %error, "resource release failed");
                failures.push(error);
            }
        }

        debug!(label, failed = failures.len(), "container released");
        failures.into_result()
    }

    /// Copies the current sequence into an owned `Vec`; empty once released.
    pub fn snapshot(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.state.with_shared(|state| state.items.clone())
    }

    /// Iterates a snapshot of the stored resources.
    ///
    /// The shared lock is held only while the snapshot is copied.
    pub fn iter(&self) -> Snapshot<R>
    where
        R: Clone,
    {
        Snapshot {
            inner: self.snapshot().into_iter(),
        }
    }

    /// Reads the resource at `index`.
    ///
    /// Returns `Ok(None)` once the container is released. On a live container
    /// an index past the end is caller misuse and fails with
    /// [`ContainerError::IndexOutOfRange`].
    pub fn get(&self, index: usize) -> ContainerResult<Option<R>>
    where
        R: Clone,
    {
        self.state.with_shared(|state| {
            if state.released {
                return Ok(None);
            }
            state
                .items
                .get(index)
                .cloned()
                .map(Some)
                .ok_or(ContainerError::IndexOutOfRange {
                    index,
                    len: state.items.len(),
                })
        })
    }

    /// Copies the stored resources into `dest`, starting at `offset`.
    ///
    /// Does nothing once the container is released.
    pub fn copy_to(&self, dest: &mut [R], offset: usize) -> ContainerResult<()>
    where
        R: Clone,
    {
        self.state.with_shared(|state| {
            if state.released {
                return Ok(());
            }
            let required = state.items.len();
            let available = dest.len().saturating_sub(offset);
            if offset > dest.len() || required > available {
                return Err(ContainerError::BufferTooSmall {
                    offset,
                    required,
                    available,
                });
            }
            dest[offset..offset + required].clone_from_slice(&state.items);
            Ok(())
        })
    }
}

impl<R: Release + PartialEq> ResourceContainer<R> {
    /// Detaches the first entry equal to `resource`.
    ///
    /// The removed resource is not released. Returns false if nothing matched
    /// or the container is already released.
    pub fn remove(&self, resource: &R) -> bool {
        let removed = self.state.with_exclusive(|state| {
            if state.released {
                return None;
            }
            let index = state.items.iter().position(|item| item == resource)?;
            Some(state.items.remove(index))
        });
        removed.is_some()
    }

    /// Returns true if an entry equal to `resource` is stored.
    pub fn contains(&self, resource: &R) -> bool {
        self.state
            .with_shared(|state| !state.released && state.items.contains(resource))
    }
}

impl<R: Release> Release for ResourceContainer<R> {
    fn release(&self) -> ReleaseResult<()> {
        self.release_all()
    }
}

impl<R: Release> Default for ResourceContainer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Release> FromIterator<R> for ResourceContainer<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::from_resources(iter)
    }
}

impl<'a, R: Release + Clone> IntoIterator for &'a ResourceContainer<R> {
    type Item = R;
    type IntoIter = Snapshot<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<R> fmt::Debug for ResourceContainer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, released) = self
            .state
            .with_shared(|state| (state.items.len(), state.released));
        f.debug_struct("ResourceContainer")
            .field("label", &self.config.label)
            .field("len", &len)
            .field("released", &released)
            .finish()
    }
}

impl<R> Drop for ResourceContainer<R> {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.released && !state.items.is_empty() {
            debug!(
                label = self.config.label_str(),
                count = state.items.len(),
                "container dropped without release; stored resources were not released"
            );
        }
    }
}

/// Iterator over a snapshot of a container's resources.
///
/// Independent of the container: later mutations are not reflected, and
/// iterating holds no lock.
#[derive(Debug, Clone)]
pub struct Snapshot<R> {
    inner: std::vec::IntoIter<R>,
}

impl<R> Iterator for Snapshot<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<R> DoubleEndedIterator for Snapshot<R> {
    fn next_back(&mut self) -> Option<R> {
        self.inner.next_back()
    }
}

impl<R> ExactSizeIterator for Snapshot<R> {}

impl<R> FusedIterator for Snapshot<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReleaseError;
    use crate::resource::{ReleaseAction, ResourceHandle};
    use crate::testing::fixtures::{CountingResource, FailingResource, ReleaseLog};
    use std::sync::{Arc, Weak};

    fn counting(n: usize) -> Vec<CountingResource> {
        (0..n).map(CountingResource::new).collect()
    }

    #[test]
    fn release_all_releases_each_resource_once() {
        let container = ResourceContainer::new();
        let resources = counting(3);
        for resource in &resources {
            container.add(resource.clone()).unwrap();
        }
        assert_eq!(container.len(), 3);

        container.release_all().unwrap();

        assert_eq!(container.len(), 0);
        assert!(resources.iter().all(|r| r.release_count() == 1));
    }

    #[test]
    fn release_all_is_idempotent() {
        let resources = counting(4);
        let container: ResourceContainer<_> = resources.iter().cloned().collect();

        for _ in 0..5 {
            container.release_all().unwrap();
        }

        assert!(resources.iter().all(|r| r.release_count() == 1));
    }

    #[test]
    fn release_follows_insertion_order() {
        let log = ReleaseLog::new();
        let container = ResourceContainer::new();
        for id in [3, 1, 4, 1, 5] {
            container.add(CountingResource::logged(id, &log)).unwrap();
        }

        container.release_all().unwrap();

        assert_eq!(log.entries(), vec![3, 1, 4, 1, 5]);
    }

    #[test]
    fn add_after_release_releases_immediately() {
        let container = ResourceContainer::new();
        container.release_all().unwrap();

        let late = CountingResource::new(4);
        container.add(late.clone()).unwrap();

        assert_eq!(container.len(), 0);
        assert_eq!(late.release_count(), 1);
        assert!(!container.contains(&late));
    }

    #[test]
    fn add_after_release_forwards_release_failure() {
        let container = ResourceContainer::new();
        container.release_all().unwrap();

        let failing = FailingResource::new("late");
        let result = container.add(failing.clone());

        assert!(matches!(result, Err(ReleaseError::Failed { .. })));
        assert_eq!(failing.attempts(), 1);
    }

    #[test]
    fn remove_detaches_without_releasing() {
        let resources = counting(3);
        let container = ResourceContainer::from_resources(resources.clone());

        assert!(container.remove(&resources[1]));
        assert!(!container.remove(&resources[1]));
        container.release_all().unwrap();

        assert_eq!(resources[0].release_count(), 1);
        assert_eq!(resources[1].release_count(), 0);
        assert_eq!(resources[2].release_count(), 1);
    }

    #[test]
    fn remove_takes_only_the_first_match() {
        let duplicate = CountingResource::new(7);
        let container = ResourceContainer::from_resources([
            duplicate.clone(),
            CountingResource::new(8),
            duplicate.clone(),
        ]);

        assert!(container.remove(&duplicate));
        assert_eq!(container.len(), 2);
        assert_eq!(container.get(0).unwrap().map(|r| r.id()), Some(8));
        assert_eq!(container.get(1).unwrap().map(|r| r.id()), Some(7));
    }

    #[test]
    fn clear_detaches_everything_without_releasing() {
        let resources = counting(3);
        let container = ResourceContainer::from_resources(resources.clone());

        container.clear();
        container.release_all().unwrap();

        assert!(container.is_empty());
        assert!(resources.iter().all(|r| r.release_count() == 0));
    }

    #[test]
    fn reads_return_defaults_after_release() {
        let resources = counting(2);
        let container = ResourceContainer::from_resources(resources.clone());
        container.release_all().unwrap();

        assert!(container.is_released());
        assert_eq!(container.len(), 0);
        assert!(!container.contains(&resources[0]));
        assert_eq!(container.get(0), Ok(None));
        assert_eq!(container.get(100), Ok(None));
        assert!(!container.remove(&resources[0]));
        assert_eq!(container.iter().count(), 0);

        let mut dest = counting(1);
        container.copy_to(&mut dest, 5).unwrap();
        assert_eq!(dest[0].id(), 0);
    }

    #[test]
    fn indexed_read_out_of_range_is_an_error() {
        let container = ResourceContainer::from_resources(counting(2));

        assert_eq!(container.get(1).unwrap().map(|r| r.id()), Some(1));
        assert_eq!(
            container.get(2),
            Err(ContainerError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn copy_to_respects_offset_and_capacity() {
        let container = ResourceContainer::from_resources(counting(2));

        let mut dest: Vec<_> = (10..14).map(CountingResource::new).collect();
        container.copy_to(&mut dest, 1).unwrap();
        let ids: Vec<_> = dest.iter().map(CountingResource::id).collect();
        assert_eq!(ids, vec![10, 0, 1, 13]);

        assert_eq!(
            container.copy_to(&mut dest, 3),
            Err(ContainerError::BufferTooSmall {
                offset: 3,
                required: 2,
                available: 1,
            })
        );

        let empty = ResourceContainer::<CountingResource>::new();
        assert!(matches!(
            empty.copy_to(&mut dest, 5),
            Err(ContainerError::BufferTooSmall { offset: 5, .. })
        ));
    }

    #[test]
    fn snapshot_iteration_ignores_later_mutation() {
        let container = ResourceContainer::from_resources(counting(3));

        let mut iter = container.iter();
        assert_eq!(iter.next().map(|r| r.id()), Some(0));
        container.add(CountingResource::new(99)).unwrap();
        container.clear();

        let rest: Vec<_> = iter.map(|r| r.id()).collect();
        assert_eq!(rest, vec![1, 2]);
        assert_eq!((&container).into_iter().len(), 0);
    }

    #[test]
    fn failing_resource_does_not_stop_the_others() {
        let before = CountingResource::new(1);
        let after = CountingResource::new(2);
        let container = ResourceContainer::from_resources([
            ResourceHandle::new(before.clone()),
            ResourceHandle::new(FailingResource::new("first")),
            ResourceHandle::new(FailingResource::new("second")),
            ResourceHandle::new(after.clone()),
        ]);

        let err = container.release_all().unwrap_err();

        assert_eq!(err.failure_count(), 2);
        assert_eq!(before.release_count(), 1);
        assert_eq!(after.release_count(), 1);
        assert!(container.release_all().is_ok());
    }

    #[test]
    fn release_may_reenter_the_container() {
        let container = Arc::new(ResourceContainer::<ResourceHandle>::new());
        let weak: Weak<ResourceContainer<ResourceHandle>> = Arc::downgrade(&container);
        let observed = Arc::new(parking_lot::Mutex::new(None));
        let observed_in = Arc::clone(&observed);

        let reentrant = ResourceHandle::new(ReleaseAction::new(move || {
            if let Some(container) = weak.upgrade() {
                let late = ResourceHandle::new(ReleaseAction::new(|| Ok(())));
                container.add(late.clone())?;
                *observed_in.lock() = Some((container.is_released(), container.len()));
            }
            Ok(())
        }));
        container.add(reentrant).unwrap();

        container.release_all().unwrap();

        assert_eq!(*observed.lock(), Some((true, 0)));
    }

    #[test]
    fn nested_containers_release_depth_first() {
        let log = ReleaseLog::new();
        let inner = Arc::new(ResourceContainer::from_resources([
            CountingResource::logged(2, &log),
            CountingResource::logged(3, &log),
        ]));
        let outer = ResourceContainer::from_resources([
            ResourceHandle::new(CountingResource::logged(1, &log)),
            ResourceHandle::from(Arc::clone(&inner)),
            ResourceHandle::new(CountingResource::logged(4, &log)),
        ]);

        outer.release_all().unwrap();

        assert!(inner.is_released());
        assert_eq!(log.entries(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn capacity_hint_has_no_behavioural_effect() {
        let container = ResourceContainer::with_capacity(CapacityHint::try_new(128).unwrap());
        assert!(container.is_empty());
        container.add(CountingResource::new(0)).unwrap();
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn debug_output_does_not_require_debug_resources() {
        let container = ResourceContainer::from_resources([ReleaseAction::new(|| Ok(()))]);
        let rendered = format!("{container:?}");
        assert!(rendered.contains("len: 1"));
        assert!(rendered.contains("released: false"));
    }
}
