//! Error types for teardown.
//!
//! Errors fall into three groups:
//!
//! - **Release failures** ([`ReleaseError`]): a resource, hook, or observer
//!   failed while a container or component was being torn down. These are
//!   never swallowed, but they never stop the rest of the teardown either.
//!   Every remaining resource is still released and the failures are reported
//!   together through [`ReleaseFailures`].
//! - **Misuse** ([`ContainerError`]): the caller asked for something that
//!   cannot exist, such as an index past the end of a live container.
//! - **Already released**: not an error at all. Operations on a released
//!   container or component are silent no-ops or return defaults.
//!
//! # Example
//!
//! ```rust
//! use teardown::errors::{ReleaseError, ReleaseFailures};
//!
//! let mut failures = ReleaseFailures::default();
//! failures.push(ReleaseError::failed("socket", "peer already closed"));
//! failures.push(ReleaseError::failed("buffer", "double unmap"));
//!
//! match failures.into_result() {
//!     Err(ReleaseError::Aggregate(all)) => assert_eq!(all.len(), 2),
//!     other => panic!("expected an aggregate failure, got {other:?}"),
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// Which extension hook of a component failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// The hook that runs before the `releasing` notification.
    BeforeRelease,
    /// The hook that runs after the owned aggregate has been released.
    AfterRelease,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeRelease => f.write_str("before-release"),
            Self::AfterRelease => f.write_str("after-release"),
        }
    }
}

/// Which notification channel an observer was subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fired before the component is marked released.
    Releasing,
    /// Fired after the component and its aggregate are released.
    Released,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Releasing => f.write_str("releasing"),
            Self::Released => f.write_str("released"),
        }
    }
}

/// Errors raised while releasing resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// A resource's own release operation failed.
    #[error("Release of {resource} failed: {reason}")]
    Failed {
        /// Short description of the resource
        resource: String,
        /// Why the release failed
        reason: String,
    },

    /// A component extension hook failed.
    #[error("Teardown hook {phase} failed: {reason}")]
    Hook {
        /// The hook that failed
        phase: HookPhase,
        /// Why the hook failed
        reason: String,
    },

    /// An observer of a component notification failed.
    #[error("Observer on {channel} channel failed: {reason}")]
    Observer {
        /// The channel the observer was subscribed to
        channel: Channel,
        /// Why the observer failed
        reason: String,
    },

    /// More than one failure happened during a single teardown.
    #[error("{0}")]
    Aggregate(ReleaseFailures),
}

impl ReleaseError {
    /// Shorthand for [`ReleaseError::Failed`].
    pub fn failed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ReleaseError::Hook`].
    pub fn hook(phase: HookPhase, reason: impl Into<String>) -> Self {
        Self::Hook {
            phase,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ReleaseError::Observer`].
    pub fn observer(channel: Channel, reason: impl Into<String>) -> Self {
        Self::Observer {
            channel,
            reason: reason.into(),
        }
    }

    /// Number of individual failures this error stands for.
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Aggregate(failures) => failures.len(),
            _ => 1,
        }
    }
}

/// Ordered collection of failures gathered during one teardown.
///
/// Teardown keeps going after a failure, so a single call can produce several
/// errors. They are kept in the order they happened. Nested aggregates are
/// flattened on [`push`](Self::push).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFailures {
    errors: Vec<ReleaseError>,
}

impl ReleaseFailures {
    /// Records a failure.
    pub fn push(&mut self, error: ReleaseError) {
        match error {
            ReleaseError::Aggregate(nested) => self.errors.extend(nested.errors),
            other => self.errors.push(other),
        }
    }

    /// Records the failure of `result`, if any.
    pub fn record(&mut self, result: ReleaseResult<()>) {
        if let Err(error) = result {
            self.push(error);
        }
    }

    /// Returns true if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates the failures in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, ReleaseError> {
        self.errors.iter()
    }

    /// Converts into a result: `Ok` when empty, the single error when there
    /// is exactly one, otherwise [`ReleaseError::Aggregate`].
    pub fn into_result(mut self) -> ReleaseResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ReleaseError::Aggregate(self)),
        }
    }
}

impl fmt::Display for ReleaseFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} release failures", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl Extend<ReleaseError> for ReleaseFailures {
    fn extend<I: IntoIterator<Item = ReleaseError>>(&mut self, iter: I) {
        for error in iter {
            self.push(error);
        }
    }
}

impl IntoIterator for ReleaseFailures {
    type Item = ReleaseError;
    type IntoIter = std::vec::IntoIter<ReleaseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReleaseFailures {
    type Item = &'a ReleaseError;
    type IntoIter = std::slice::Iter<'a, ReleaseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Caller misuse of a live container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Indexed read past the end of the live sequence.
    #[error("Index {index} out of range for container of length {len}")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// Length of the sequence at the time of the read
        len: usize,
    },

    /// `copy_to` target cannot hold the sequence at the given offset.
    #[error("Buffer too small: need {required} slots from offset {offset}, have {available}")]
    BufferTooSmall {
        /// Offset the copy was asked to start at
        offset: usize,
        /// Number of slots the copy needs
        required: usize,
        /// Number of slots available from the offset
        available: usize,
    },
}

/// Type alias for release operation results
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Type alias for container read results
pub type ContainerResult<T> = Result<T, ContainerError>;
