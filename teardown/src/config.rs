//! Configuration for containers and components.
//!
//! Configuration values use `nutype` validation so an invalid value can never
//! be constructed. None of the settings change release semantics: the
//! capacity is an allocation hint and the label only shows up in logs.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Initial capacity reserved for a container's sequence.
///
/// Validated to be at most 1,048,576 entries so a misconfigured hint cannot
/// trigger a huge upfront allocation.
#[nutype(
    validate(less_or_equal = 1_048_576),
    default = 0,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct CapacityHint(usize);

/// Human-readable name attached to a container or component in log output.
///
/// Labels are trimmed, non-empty, and at most 64 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct Label(String);

/// Construction settings for a [`ResourceContainer`](crate::ResourceContainer).
///
/// ```rust
/// use teardown::config::{CapacityHint, ContainerConfig, Label};
///
/// let config = ContainerConfig::default()
///     .with_capacity(CapacityHint::try_new(64).unwrap())
///     .with_label(Label::try_new("socket-pool").unwrap());
/// assert_eq!(config.capacity.into_inner(), 64);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Initial capacity of the sequence
    pub capacity: CapacityHint,
    /// Optional name used in log fields
    pub label: Option<Label>,
}

impl ContainerConfig {
    /// Sets the capacity hint.
    #[must_use]
    pub fn with_capacity(mut self, capacity: CapacityHint) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub(crate) fn label_str(&self) -> &str {
        self.label.as_ref().map_or("", |label| label.as_ref())
    }
}
