use std::{
    collections::HashMap,
    fmt::Display,
    sync::Mutex,
};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::record::TelemetryRecord;

/// Identity of one connected subscriber.
/// Used for logging and removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handle to one live subscriber connection.
///
/// The sender feeds the connection's writer task; the connection itself
/// is owned by whoever accepted it.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    pub(crate) sender: mpsc::Sender<TelemetryRecord>,
}

impl Subscriber {
    /// This subscriber's identity.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// The set of currently connected subscribers.
///
/// Mutated by the connection side (insert on accept, remove on
/// disconnect) and read by the broadcaster. Every operation takes the
/// internal lock for its own duration only, so an in-flight broadcast
/// never blocks adds or removes.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    inner: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Always succeeds.
    pub fn add(&self, sender: mpsc::Sender<TelemetryRecord>) -> SubscriberId {
        let id = SubscriberId::new();
        let subscriber = Subscriber { id, sender };

        self.inner
            .lock()
            .expect("Registry lock should not be poisoned")
            .insert(id, subscriber);

        id
    }

    /// Deregister a subscriber.
    /// Removing an id which is absent (e.g. already removed by a failed
    /// broadcast) is a no-op.
    pub fn remove(&self, id: SubscriberId) {
        self.inner
            .lock()
            .expect("Registry lock should not be poisoned")
            .remove(&id);
    }

    /// A point-in-time copy of the registered subscribers.
    ///
    /// Subscribers added or removed after the snapshot is taken may or
    /// may not see the broadcast it is used for.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.inner
            .lock()
            .expect("Registry lock should not be poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Whether this id is currently registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner
            .lock()
            .expect("Registry lock should not be poisoned")
            .contains_key(&id)
    }

    /// How many subscribers are currently registered.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("Registry lock should not be poisoned")
            .len()
    }

    /// True if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
