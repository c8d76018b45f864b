// ============================================================================
// Per-Entity Event Channels
// ============================================================================
//
// Every registered entity owns one `EventDispatcher`: an ordered list of typed
// subscriptions. The registry drops the dispatcher when the entity leaves, so
// anything holding a `WeakDispatcher` sees the channel disappear with it.
//
// ============================================================================

use crate::connection::Connection;
use crate::core::Result;
use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, Weak};

/// Lifecycle events an entity channel can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Baseline captured, entity is in sync with the database
    Fresh,
    BeforeSave,
    AfterSave,
    BeforeDelete,
    AfterDelete,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Fresh,
        EventKind::BeforeSave,
        EventKind::AfterSave,
        EventKind::BeforeDelete,
        EventKind::AfterDelete,
    ];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Fresh => write!(f, "entity.fresh"),
            EventKind::BeforeSave => write!(f, "entity.beforeSave"),
            EventKind::AfterSave => write!(f, "entity.afterSave"),
            EventKind::BeforeDelete => write!(f, "entity.beforeDelete"),
            EventKind::AfterDelete => write!(f, "entity.afterDelete"),
        }
    }
}

/// Event payload handed to the registry when firing.
///
/// Persistence events carry the connection the statement ran on.
/// `inserted` is set only when the save issued an INSERT.
pub enum Event<'c> {
    Fresh,
    BeforeSave,
    AfterSave {
        connection: &'c mut dyn Connection,
        inserted: bool,
    },
    BeforeDelete,
    AfterDelete { connection: &'c mut dyn Connection },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Fresh => EventKind::Fresh,
            Event::BeforeSave => EventKind::BeforeSave,
            Event::AfterSave { .. } => EventKind::AfterSave,
            Event::BeforeDelete => EventKind::BeforeDelete,
            Event::AfterDelete { .. } => EventKind::AfterDelete,
        }
    }
}

/// What user callbacks receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: EventKind,
    pub entity: EntityId,
    pub table: String,
}

pub type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Listeners the registry itself wires onto a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalListener {
    /// Writes generated keys back after a save
    LastInsertId,
    /// Forwards the event to the entity's own `Accessor::on_event`
    Entity,
}

#[derive(Clone)]
pub enum Listener {
    Internal(InternalListener),
    Callback(Callback),
}

struct Subscription {
    kind: EventKind,
    listener: Listener,
}

/// Ordered, typed subscription list for one entity.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a callback to one event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Result<()>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(kind, Listener::Callback(Arc::new(callback)))
    }

    pub(crate) fn on_internal(&self, kind: EventKind, listener: InternalListener) -> Result<()> {
        self.subscribe(kind, Listener::Internal(listener))
    }

    fn subscribe(&self, kind: EventKind, listener: Listener) -> Result<()> {
        let mut subscriptions = self.subscriptions.write()?;
        subscriptions.push(Subscription { kind, listener });
        Ok(())
    }

    /// Snapshot of the listeners for `kind`, in subscription order.
    pub fn listeners(&self, kind: EventKind) -> Result<Vec<Listener>> {
        let subscriptions = self.subscriptions.read()?;
        Ok(subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.listener.clone())
            .collect())
    }

    pub fn listener_count(&self, kind: EventKind) -> Result<usize> {
        Ok(self.listeners(kind)?.len())
    }

    pub fn has_internal(&self, kind: EventKind, listener: InternalListener) -> Result<bool> {
        Ok(self
            .listeners(kind)?
            .iter()
            .any(|l| matches!(l, Listener::Internal(i) if *i == listener)))
    }

    /// Runs user callbacks for the notification's kind.
    ///
    /// Internal listeners need registry access and are skipped here; see
    /// `Registry::fire_event`. Returns the number of callbacks invoked.
    pub fn notify(&self, notification: &Notification) -> Result<usize> {
        let mut invoked = 0;
        for listener in self.listeners(notification.kind)? {
            if let Listener::Callback(callback) = listener {
                callback(notification);
                invoked += 1;
            }
        }
        Ok(invoked)
    }

    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher(Arc::downgrade(&self.subscriptions))
    }

    pub fn same_channel(&self, other: &EventDispatcher) -> bool {
        Arc::ptr_eq(&self.subscriptions, &other.subscriptions)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.subscriptions.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("EventDispatcher")
            .field("subscriptions", &count)
            .finish()
    }
}

/// Non-owning handle to an entity channel.
#[derive(Clone)]
pub struct WeakDispatcher(Weak<RwLock<Vec<Subscription>>>);

impl WeakDispatcher {
    pub fn upgrade(&self) -> Option<EventDispatcher> {
        self.0
            .upgrade()
            .map(|subscriptions| EventDispatcher { subscriptions })
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WeakDispatcher").field(&self.is_alive()).finish()
    }
}
