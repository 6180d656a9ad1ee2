//! `teardown` - deterministic, thread-safe resource release
//!
//! This library gives components a release-once contract. A
//! [`ResourceContainer`] owns a set of releasable resources and releases them
//! all, in registration order, exactly once. A [`Component`] wraps one such
//! container, adds a single Active → Released transition, and notifies
//! observers around it. Everything is safe to call from any number of threads,
//! and every call on something already released is a well-defined no-op.
//!
//! # Example
//!
//! ```rust
//! use teardown::prelude::*;
//!
//! # fn main() -> ReleaseResult<()> {
//! let session = Component::new();
//! session.register_for_release(ReleaseAction::new(|| {
//!     // close the socket
//!     Ok(())
//! }))?;
//! session.on_released(|s| {
//!     assert!(s.is_released());
//!     Ok(())
//! });
//!
//! session.release()?;
//! session.release()?; // already released: no-op
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is released implicitly when a container or component is dropped.
//! Use [`ReleaseGuard`] for release at scope exit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod container;
pub mod errors;
pub mod guard;
pub mod lifecycle;
pub mod notify;
pub mod resource;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{CapacityHint, ContainerConfig, Label};
pub use container::{ResourceContainer, Snapshot};
pub use errors::{
    Channel, ContainerError, ContainerResult, HookPhase, ReleaseError, ReleaseFailures,
    ReleaseResult,
};
pub use guard::ReleaseGuard;
pub use lifecycle::{Component, ComponentBuilder, NoHooks, TeardownHooks};
pub use notify::{ObserverId, Observers};
pub use resource::{Release, ReleaseAction, ResourceHandle};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Component, ContainerError, Release, ReleaseAction, ReleaseError, ReleaseGuard,
        ReleaseResult, ResourceContainer, ResourceHandle, TeardownHooks,
    };
}
