//! Testing utilities for code built on teardown.
//!
//! Enabled with the `testing` feature.
//!
//! - [`fixtures`]: resources that record how and in which order they were
//!   released, and resources that always fail
//! - [`generators`]: `proptest` strategies for container operation sequences
//!
//! ```rust,ignore
//! use teardown::testing::prelude::*;
//!
//! let resource = CountingResource::new(1);
//! let container = ResourceContainer::new();
//! container.add(resource.clone())?;
//! container.release_all()?;
//! assert_eq!(resource.release_count(), 1);
//! ```

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::fixtures::*;
    pub use super::generators::*;
    pub use crate::prelude::*;
}
