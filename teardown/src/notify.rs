//! Ordered observer lists for component notifications.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::warn;
use uuid::Uuid;

use crate::errors::{Channel, ReleaseFailures, ReleaseResult};
use crate::sync::RwLockRecovery;

/// Identifies a subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

type Callback<S> = Arc<dyn Fn(&S) -> ReleaseResult<()> + Send + Sync>;

/// Observers of one notification channel, fired in registration order.
///
/// Notification runs over a snapshot of the list, so an observer may
/// subscribe or unsubscribe (itself or others) while being notified; the
/// change takes effect from the next notification.
pub struct Observers<S: ?Sized> {
    channel: Channel,
    entries: RwLock<Vec<(ObserverId, Callback<S>)>>,
}

impl<S: ?Sized> Observers<S> {
    /// Creates an empty observer list for `channel`.
    pub const fn new(channel: Channel) -> Self {
        Self {
            channel,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// The channel these observers listen on.
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Appends an observer and returns its id.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&S) -> ReleaseResult<()> + Send + Sync + 'static,
    {
        let id = ObserverId::new();
        self.entries
            .with_exclusive(|entries| entries.push((id, Arc::new(observer))));
        id
    }

    /// Removes the observer with `id`. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.entries.with_exclusive(|entries| {
            let before = entries.len();
            entries.retain(|(entry, _)| *entry != id);
            entries.len() != before
        })
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.entries.with_shared(Vec::len)
    }

    /// Returns true when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every observer with `source`, in registration order.
    ///
    /// A failing observer does not prevent the later ones from running.
    pub fn notify(&self, source: &S) -> ReleaseFailures {
        let snapshot: Vec<Callback<S>> = self
            .entries
            .with_shared(|entries| entries.iter().map(|(_, f)| Arc::clone(f)).collect());

        let mut failures = ReleaseFailures::default();
        for observer in snapshot {
            if let Err(error) = observer(source) {
                warn!(channel = %self.channel, %error, "observer failed");
                failures.push(error);
            }
        }
        failures
    }
}

impl<S: ?Sized> fmt::Debug for Observers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("channel", &self.channel)
            .field("len", &self.len())
            .finish()
    }
}
