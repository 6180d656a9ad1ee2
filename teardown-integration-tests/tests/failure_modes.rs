//! Failure mode tests.
//!
//! These tests verify that failing releases, hooks, and observers never stop
//! the rest of a teardown, and that a panic under the container lock leaves
//! the container usable.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use teardown::testing::prelude::*;
use teardown::{Channel, HookPhase};
use tracing_test::traced_test;

#[test]
fn every_failure_is_reported_and_every_resource_released() {
    let log = ReleaseLog::new();
    let first = FailingResource::new("first");
    let second = FailingResource::new("second");
    let container = ResourceContainer::from_resources([
        ResourceHandle::new(CountingResource::logged(1, &log)),
        ResourceHandle::new(first.clone()),
        ResourceHandle::new(CountingResource::logged(2, &log)),
        ResourceHandle::new(second.clone()),
        ResourceHandle::new(CountingResource::logged(3, &log)),
    ]);

    let err = container.release_all().unwrap_err();

    assert_eq!(log.entries(), vec![1, 2, 3]);
    assert_eq!((first.attempts(), second.attempts()), (1, 1));
    match err {
        ReleaseError::Aggregate(failures) => {
            let names: Vec<_> = failures
                .iter()
                .map(|failure| match failure {
                    ReleaseError::Failed { resource, .. } => resource.as_str(),
                    other => panic!("unexpected failure {other:?}"),
                })
                .collect();
            assert_eq!(names, vec!["first", "second"]);
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
}

#[test]
fn second_release_after_failure_is_a_quiet_noop() {
    let failing = FailingResource::new("once");
    let container = ResourceContainer::from_resources([failing.clone()]);

    assert!(container.release_all().is_err());
    assert!(container.release_all().is_ok());
    assert_eq!(failing.attempts(), 1);
}

struct Flaky;

impl TeardownHooks for Flaky {
    fn before_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        Err(ReleaseError::hook(HookPhase::BeforeRelease, "not ready"))
    }

    fn after_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        Err(ReleaseError::hook(HookPhase::AfterRelease, "flush failed"))
    }
}

#[test]
fn failing_hooks_and_observers_leave_component_released() {
    let component = Component::with_hooks(Flaky);
    let owned = CountingResource::new(1);
    component.register_for_release(owned.clone()).unwrap();
    component.on_releasing(|_| Err(ReleaseError::observer(Channel::Releasing, "veto")));

    let err = component.release().unwrap_err();

    assert!(component.is_released());
    assert_eq!(owned.release_count(), 1);
    let failures: Vec<_> = match err {
        ReleaseError::Aggregate(failures) => failures.into_iter().collect(),
        other => vec![other],
    };
    assert_eq!(
        failures,
        vec![
            ReleaseError::hook(HookPhase::BeforeRelease, "not ready"),
            ReleaseError::observer(Channel::Releasing, "veto"),
            ReleaseError::hook(HookPhase::AfterRelease, "flush failed"),
        ]
    );
    assert!(component.release().is_ok());
}

/// Resource whose equality check panics, used to poison the container lock
/// from inside `remove`.
#[derive(Debug, Clone)]
struct PanicOnCompare(CountingResource);

impl Release for PanicOnCompare {
    fn release(&self) -> ReleaseResult<()> {
        self.0.release()
    }
}

impl PartialEq for PanicOnCompare {
    fn eq(&self, _other: &Self) -> bool {
        panic!("comparison exploded");
    }
}

#[test]
fn panic_under_the_lock_does_not_disable_the_container() {
    let stored = PanicOnCompare(CountingResource::new(1));
    let container = Arc::new(ResourceContainer::from_resources([stored.clone()]));

    let poisoner = Arc::clone(&container);
    let needle = stored.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || poisoner.remove(&needle)));
    assert!(outcome.is_err());

    assert_eq!(container.len(), 1);
    container.release_all().unwrap();
    assert!(container.is_released());
    assert_eq!(stored.0.release_count(), 1);
}

#[test]
fn panicking_release_leaves_container_released() {
    let container = Arc::new(ResourceContainer::<ResourceHandle>::new());
    container
        .add(ResourceHandle::new(ReleaseAction::new(|| {
            panic!("release exploded")
        })))
        .unwrap();

    let releaser = Arc::clone(&container);
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || releaser.release_all()));
    assert!(outcome.is_err());

    assert!(container.is_released());
    assert_eq!(container.len(), 0);
    let late = CountingResource::new(9);
    container.add(ResourceHandle::new(late.clone())).unwrap();
    assert_eq!(late.release_count(), 1);
}

#[test]
#[traced_test]
fn failed_releases_are_logged() {
    let container = ResourceContainer::from_resources([FailingResource::new("logged")]);
    let _ = container.release_all();

    assert!(logs_contain("resource release failed"));
    assert!(logs_contain("simulated failure"));
}

/// Hooks whose `before_release` panics
struct PanickingBeforeRelease;

impl TeardownHooks for PanickingBeforeRelease {
    fn before_release(&self, _component: &Component<Self>) -> ReleaseResult<()> {
        panic!("before-release exploded")
    }
}

#[test]
fn panicking_hook_still_releases_owned_resources() {
    let component = Arc::new(Component::with_hooks(PanickingBeforeRelease));
    let owned = CountingResource::new(1);
    component.register_for_release(owned.clone()).unwrap();

    let releaser = Arc::clone(&component);
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || releaser.release()));
    assert!(outcome.is_err());

    assert!(component.is_released());
    assert_eq!(owned.release_count(), 1);
    assert_eq!(component.owned_count(), 0);

    component.release().unwrap();
    assert_eq!(owned.release_count(), 1);

    let late = CountingResource::new(2);
    component.register_for_release(late.clone()).unwrap();
    assert_eq!(late.release_count(), 1);
    assert_eq!(component.owned_count(), 0);
}

#[test]
fn panicking_releasing_observer_still_releases_owned_resources() {
    let component = Arc::new(Component::new());
    let owned = CountingResource::new(1);
    component.register_for_release(owned.clone()).unwrap();
    component.on_releasing(|_| panic!("observer exploded"));

    let releaser = Arc::clone(&component);
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || releaser.release()));
    assert!(outcome.is_err());

    assert!(component.is_released());
    assert_eq!(owned.release_count(), 1);
}
