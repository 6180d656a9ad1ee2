//! Component lifecycle: a single Active → Released transition with hooks
//! and notifications.
//!
//! A [`Component`] owns a [`ResourceContainer`] of dependent resources (its
//! *aggregate*) and releases it as part of its own release sequence:
//!
//! 1. return immediately if the component is already released (or is being
//!    released by the current thread);
//! 2. run [`TeardownHooks::before_release`];
//! 3. notify `releasing` observers, which still see `is_released() == false`;
//! 4. mark the component released;
//! 5. release the aggregate (every registered resource, in registration order);
//! 6. run [`TeardownHooks::after_release`];
//! 7. notify `released` observers, which see `is_released() == true`.
//!
//! The sequence runs at most once. Concurrent callers serialize on a release
//! gate: one of them runs the sequence and the others block until it finishes,
//! then return as no-ops. The gate is re-entrant, so a hook, observer, or owned
//! resource that calls back into `release()` on the same thread gets a no-op
//! instead of a deadlock.
//!
//! Failures from hooks, observers, and owned resources do not cut the sequence
//! short. Every step runs, and the collected failures are returned together
//! once the component is fully released. A panic in step 2 or 3 still
//! completes steps 4 and 5 before it propagates.
//!
//! # Example
//!
//! ```rust
//! use teardown::{Component, ReleaseAction};
//!
//! let component = Component::new();
//! component.on_released(|c| {
//!     assert!(c.is_released());
//!     Ok(())
//! });
//! component
//!     .register_for_release(ReleaseAction::new(|| Ok(())))
//!     .unwrap();
//!
//! component.release().unwrap();
//! component.release().unwrap(); // no-op
//! assert_eq!(component.owned_count(), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use crate::config::{CapacityHint, ContainerConfig, Label};
use crate::container::ResourceContainer;
use crate::errors::{Channel, HookPhase, ReleaseFailures, ReleaseResult};
use crate::notify::{ObserverId, Observers};
use crate::resource::{Release, ResourceHandle};

const ACTIVE: u8 = 0;
const RELEASING: u8 = 1;
const RELEASED: u8 = 2;

/// Extension points around a component's release sequence.
///
/// Both hooks default to no-ops. The implementing type is also where a
/// component keeps its own state; it is reachable through
/// [`Component::hooks`] and the guarded accessors.
pub trait TeardownHooks: Sized + Send + Sync + 'static {
    /// Runs before the `releasing` notification, while the component still
    /// reports itself active.
    fn before_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        Ok(())
    }

    /// Runs after the owned aggregate has been released and before the
    /// `released` notification.
    fn after_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHooks;

impl TeardownHooks for NoHooks {}

/// A lifecycle-bearing owner of dependent resources.
pub struct Component<H: TeardownHooks = NoHooks> {
    hooks: H,
    phase: AtomicU8,
    gate: ReentrantMutex<()>,
    aggregate: ResourceContainer<ResourceHandle>,
    releasing: Observers<Component<H>>,
    released: Observers<Component<H>>,
}

impl Component<NoHooks> {
    /// Creates an active component without hooks.
    pub fn new() -> Self {
        Self::with_hooks(NoHooks)
    }

    /// Starts building a component.
    pub fn builder() -> ComponentBuilder<NoHooks> {
        ComponentBuilder::new()
    }
}

impl Default for Component<NoHooks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TeardownHooks> Component<H> {
    /// Creates an active component with the given hooks.
    pub fn with_hooks(hooks: H) -> Self {
        Self::from_parts(hooks, ContainerConfig::default())
    }

    fn from_parts(hooks: H, config: ContainerConfig) -> Self {
        Self {
            hooks,
            phase: AtomicU8::new(ACTIVE),
            gate: ReentrantMutex::new(()),
            aggregate: ResourceContainer::with_config(config),
            releasing: Observers::new(Channel::Releasing),
            released: Observers::new(Channel::Released),
        }
    }

    /// The component's hooks (and state).
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// The label given at construction, if any.
    pub fn label(&self) -> Option<&Label> {
        self.aggregate.config().label.as_ref()
    }

    /// Returns true once the release sequence has marked the component
    /// released. Reads `false` inside `releasing` observers and `true` inside
    /// `released` observers.
    pub fn is_released(&self) -> bool {
        self.phase.load(Ordering::Acquire) == RELEASED
    }

    /// Subscribes to the notification fired just before the component is
    /// marked released.
    pub fn on_releasing<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Self) -> ReleaseResult<()> + Send + Sync + 'static,
    {
        self.releasing.subscribe(observer)
    }

    /// Subscribes to the notification fired once the component and its
    /// aggregate are released.
    pub fn on_released<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Self) -> ReleaseResult<()> + Send + Sync + 'static,
    {
        self.released.subscribe(observer)
    }

    /// Removes a `releasing` observer.
    pub fn unsubscribe_releasing(&self, id: ObserverId) -> bool {
        self.releasing.unsubscribe(id)
    }

    /// Removes a `released` observer.
    pub fn unsubscribe_released(&self, id: ObserverId) -> bool {
        self.released.unsubscribe(id)
    }

    /// Hands `resource` to the component; it is released together with the
    /// component.
    ///
    /// Returns the handle under which it was registered, usable with
    /// [`unregister`](Self::unregister). If the component is already released,
    /// the resource is released immediately and any failure is returned.
    pub fn register_for_release<R: Release + 'static>(
        &self,
        resource: R,
    ) -> ReleaseResult<ResourceHandle> {
        let handle = ResourceHandle::new(resource);
        self.aggregate.add(handle.clone())?;
        Ok(handle)
    }

    /// Registers an existing handle; see
    /// [`register_for_release`](Self::register_for_release).
    pub fn register_handle(&self, handle: ResourceHandle) -> ReleaseResult<()> {
        self.aggregate.add(handle)
    }

    /// Detaches a registered resource without releasing it.
    pub fn unregister(&self, handle: &ResourceHandle) -> bool {
        self.aggregate.remove(handle)
    }

    /// Number of resources currently owned; 0 once released.
    pub fn owned_count(&self) -> usize {
        self.aggregate.len()
    }

    /// Runs the release sequence if it has not run yet.
    ///
    /// Blocks while another thread is releasing the component. Returns every
    /// failure raised by hooks, observers, and owned resources; the component
    /// is fully released either way.
    ///
    /// If `before_release` or a `releasing` observer panics, the component is
    /// still marked released and its aggregate released before the panic
    /// propagates.
    ///
    /// The release gate is held for the whole sequence, including the owned
    /// resources' release operations. A resource whose release blocks on
    /// another thread that calls [`read_if_active`](Self::read_if_active),
    /// [`try_read_if_active`](Self::try_read_if_active) or
    /// [`write_if_active`](Self::write_if_active) on this component
    /// deadlocks. Same-thread calls are fine because the gate is re-entrant.
    pub fn release(&self) -> ReleaseResult<()> {
        let _gate = self.gate.lock();
        if self
            .phase
            .compare_exchange(ACTIVE, RELEASING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let label = self.aggregate.config().label_str();
        debug!(label, owned = self.aggregate.len(), "releasing component");

        let unwinding = FinishOnUnwind::new(self);
        let mut failures = ReleaseFailures::default();
        if let Err(error) = self.hooks.before_release(self) {
            warn!(label, phase = %HookPhase::BeforeRelease, %error, "teardown hook failed");
            failures.push(error);
        }
        failures.extend(self.releasing.notify(self));

        self.phase.store(RELEASED, Ordering::Release);
        failures.record(self.aggregate.release_all());
        unwinding.disarm();

        if let Err(error) = self.hooks.after_release(self) {
            warn!(label, phase = %HookPhase::AfterRelease, %error, "teardown hook failed");
            failures.push(error);
        }
        failures.extend(self.released.notify(self));

        debug!(label, failed = failures.len(), "component released");
        failures.into_result()
    }

    /// Runs `read` unless the component is released, in which case `default`
    /// is returned. Serializes with [`release`](Self::release), so the
    /// component cannot be released while `read` runs.
    pub fn read_if_active<T>(&self, default: T, read: impl FnOnce(&H) -> T) -> T {
        let _gate = self.gate.lock();
        if self.is_released() {
            default
        } else {
            read(&self.hooks)
        }
    }

    /// Like [`read_if_active`](Self::read_if_active) for fallible reads; the
    /// error from `read` is forwarded unchanged.
    pub fn try_read_if_active<T, E>(
        &self,
        default: T,
        read: impl FnOnce(&H) -> Result<T, E>,
    ) -> Result<T, E> {
        let _gate = self.gate.lock();
        if self.is_released() {
            Ok(default)
        } else {
            read(&self.hooks)
        }
    }

    /// Runs `write` unless the component is released. Returns `None` when it
    /// was skipped.
    pub fn write_if_active<T>(&self, write: impl FnOnce(&H) -> T) -> Option<T> {
        let _gate = self.gate.lock();
        if self.is_released() {
            None
        } else {
            Some(write(&self.hooks))
        }
    }
}

/// Completes the mandatory part of a release sequence when an earlier step
/// panics: the component is marked released and its aggregate released.
struct FinishOnUnwind<'a, H: TeardownHooks> {
    component: &'a Component<H>,
    armed: bool,
}

impl<'a, H: TeardownHooks> FinishOnUnwind<'a, H> {
    const fn new(component: &'a Component<H>) -> Self {
        Self {
            component,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<H: TeardownHooks> Drop for FinishOnUnwind<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let component = self.component;
        let label = component.aggregate.config().label_str();
        warn!(label, "release sequence panicked; releasing owned resources");
        component.phase.store(RELEASED, Ordering::Release);
        if let Err(error) = component.aggregate.release_all() {
            warn!(label, %error, "owned resources failed to release after panic");
        }
    }
}

impl<H: TeardownHooks> Release for Component<H> {
    fn release(&self) -> ReleaseResult<()> {
        Self::release(self)
    }
}

impl<H: TeardownHooks + fmt::Debug> fmt::Debug for Component<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("hooks", &self.hooks)
            .field("released", &self.is_released())
            .field("aggregate", &self.aggregate)
            .field("releasing_observers", &self.releasing.len())
            .field("released_observers", &self.released.len())
            .finish()
    }
}

/// Builder for [`Component`].
///
/// ```rust
/// use teardown::config::{CapacityHint, Label};
/// use teardown::Component;
///
/// let component = Component::builder()
///     .label(Label::try_new("session").unwrap())
///     .capacity(CapacityHint::try_new(8).unwrap())
///     .build();
/// assert_eq!(component.label().map(AsRef::as_ref), Some("session"));
/// ```
#[derive(Debug, Default)]
pub struct ComponentBuilder<H = NoHooks> {
    hooks: H,
    config: ContainerConfig,
}

impl ComponentBuilder<NoHooks> {
    /// Creates a builder with no hooks and default settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H> ComponentBuilder<H> {
    /// Sets the hooks (and state) of the component.
    pub fn hooks<T: TeardownHooks>(self, hooks: T) -> ComponentBuilder<T> {
        ComponentBuilder {
            hooks,
            config: self.config,
        }
    }

    /// Sets the label used in log output.
    #[must_use]
    pub fn label(mut self, label: Label) -> Self {
        self.config = self.config.with_label(label);
        self
    }

    /// Sets the capacity hint of the owned aggregate.
    #[must_use]
    pub fn capacity(mut self, capacity: CapacityHint) -> Self {
        self.config = self.config.with_capacity(capacity);
        self
    }

    /// Replaces all aggregate settings.
    #[must_use]
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }
}

impl<H: TeardownHooks> ComponentBuilder<H> {
    /// Builds an active component with an empty aggregate.
    pub fn build(self) -> Component<H> {
        Component::from_parts(self.hooks, self.config)
    }
}
