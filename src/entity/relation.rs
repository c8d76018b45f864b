use super::EntityId;
use crate::events::{EventDispatcher, WeakDispatcher};
use std::sync::Mutex;

/// Back-reference from a relation to the entity that owns it.
///
/// The dispatcher is held weakly: once the parent leaves its registry the
/// link no longer resolves to a channel.
#[derive(Debug, Clone)]
pub struct ParentLink {
    pub entity: EntityId,
    pub hash_code: String,
    pub table: String,
    pub dispatcher: WeakDispatcher,
}

impl ParentLink {
    pub fn dispatcher(&self) -> Option<EventDispatcher> {
        self.dispatcher.upgrade()
    }
}

/// A relation field declared by an [`Accessor`](super::Accessor).
pub trait Relation: Send + Sync {
    /// Binds the relation to its parent entity.
    fn set_parent(&self, parent: ParentLink);

    fn parent(&self) -> Option<ParentLink>;
}

/// Plain relation holder that only remembers its parent.
#[derive(Debug, Default)]
pub struct RelationHandle {
    parent: Mutex<Option<ParentLink>>,
}

impl RelationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.parent().is_some()
    }
}

impl Relation for RelationHandle {
    fn set_parent(&self, parent: ParentLink) {
        // a poisoned slot is overwritten
        let mut slot = self.parent.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(parent);
    }

    fn parent(&self) -> Option<ParentLink> {
        self.parent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
