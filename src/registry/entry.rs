use super::{Action, EntityState};
use crate::core::{FieldMap, Identifiers};
use crate::events::EventDispatcher;
use std::time::Instant;

/// Bookkeeping the registry keeps for one entity.
///
/// Only the registry creates entries. A clone obtained through
/// `Registry::data` shares the original's event channel.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) identifiers: Identifiers,
    pub(crate) state: EntityState,
    pub(crate) initial_values: FieldMap,
    pub(crate) registered_at: Instant,
    pub(crate) pending_action: Option<Action>,
    pub(crate) action_priority: Option<u64>,
    pub(crate) dispatcher: EventDispatcher,
}

impl Entry {
    pub(crate) fn new(identifiers: Identifiers, state: EntityState) -> Self {
        Self {
            identifiers,
            state,
            initial_values: FieldMap::new(),
            registered_at: Instant::now(),
            pending_action: None,
            action_priority: None,
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn identifiers(&self) -> &Identifiers {
        &self.identifiers
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn initial_values(&self) -> &FieldMap {
        &self.initial_values
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    pub fn pending_action(&self) -> Option<Action> {
        self.pending_action
    }

    pub fn action_priority(&self) -> Option<u64> {
        self.action_priority
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Action and priority, when the entity is scheduled
    pub(crate) fn scheduled(&self) -> Option<(Action, u64)> {
        self.pending_action.zip(self.action_priority)
    }
}
