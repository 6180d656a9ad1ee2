//! Resources for observing release behaviour in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{ReleaseError, ReleaseResult};
use crate::resource::Release;

/// Shared, ordered record of released resource ids.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLog {
    entries: Arc<Mutex<Vec<usize>>>,
}

impl ReleaseLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an id.
    pub fn record(&self, id: usize) {
        self.entries.lock().push(id);
    }

    /// Copy of the ids recorded so far, in release order.
    pub fn entries(&self) -> Vec<usize> {
        self.entries.lock().clone()
    }
}

/// A resource that counts how many times it has been released.
///
/// Clones share the counter, so a test can keep one clone and hand another
/// to a container. Equality compares ids only.
#[derive(Debug, Clone)]
pub struct CountingResource {
    id: usize,
    releases: Arc<AtomicUsize>,
    log: Option<ReleaseLog>,
}

impl CountingResource {
    /// Creates a resource with the given id.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            releases: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    /// Creates a resource that also records its id in `log` on every release.
    pub fn logged(id: usize, log: &ReleaseLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::new(id)
        }
    }

    /// The resource id.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// How many times `release` was called on any clone.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Release for CountingResource {
    fn release(&self) -> ReleaseResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(self.id);
        }
        Ok(())
    }
}

impl PartialEq for CountingResource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CountingResource {}

impl std::hash::Hash for CountingResource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A resource whose release always fails.
#[derive(Debug, Clone)]
pub struct FailingResource {
    name: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingResource {
    /// Creates a failing resource; `name` appears in the error.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many release attempts were made on any clone.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Release for FailingResource {
    fn release(&self) -> ReleaseResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ReleaseError::failed(self.name.clone(), "simulated failure"))
    }
}

impl PartialEq for FailingResource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
