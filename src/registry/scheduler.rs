// ============================================================================
// Action Scheduling
// ============================================================================
//
// Every `mark_for_action` call consumes one priority slot from a counter that
// only goes down. The worker queue pops the lowest slot first, i.e. the most
// recently marked entity runs first. Slots are never reused, so two workers
// can never tie.
//
// ============================================================================

use super::{EntityState, Registry};
use crate::core::{DbError, Identifiers, Result};
use crate::entity::{Accessor, EntityRef, ParentLink};
use crate::workers::{DeleteWorker, SaveWorker, Worker, WorkersQueue};
use log::debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Save,
    Delete,
}

impl FromStr for Action {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "save" => Ok(Action::Save),
            "delete" => Ok(Action::Delete),
            other => Err(DbError::UnknownAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Save => write!(f, "save"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

impl<E: Accessor + 'static> Registry<E> {
    /// Schedules `action` for `entity`, registering it first if needed.
    ///
    /// Returns the priority slot assigned to this call.
    ///
    /// # Errors
    /// Returns `PriorityExhausted` once every slot has been handed out
    pub fn mark_for_action(&mut self, entity: &EntityRef<E>, action: Action) -> Result<u64> {
        let priority = self.priority.ok_or_else(|| {
            DbError::PriorityExhausted(format!(
                "registry '{}' handed out every slot below {}",
                self.config.table_name, self.config.initial_priority
            ))
        })?;

        if !self.contains(entity) {
            self.store(entity, Identifiers::new(), EntityState::Unknown)?;
        }

        let entry = self.entry_mut(entity)?;
        entry.pending_action = Some(action);
        entry.action_priority = Some(priority);
        self.priority = priority.checked_sub(1);

        debug!(
            "Marked {} for {} with priority {}",
            entity.id(),
            action,
            priority
        );
        Ok(priority)
    }

    /// String form of [`mark_for_action`](Self::mark_for_action).
    ///
    /// # Errors
    /// Returns `UnknownAction` for anything but `"save"` or `"delete"`
    pub fn mark_for_action_named(&mut self, entity: &EntityRef<E>, action: &str) -> Result<u64> {
        let action = action.parse()?;
        self.mark_for_action(entity, action)
    }

    /// Drops the pending action of a member; no-op otherwise.
    pub(crate) fn clear_action(&mut self, entity: &EntityRef<E>) {
        if let Ok(entry) = self.entry_mut(entity) {
            entry.pending_action = None;
            entry.action_priority = None;
        }
    }

    /// Builds the ordered queue of workers for every scheduled entity.
    ///
    /// Diffs each scheduled entity (applying state transitions) and binds
    /// changed relation fields to their parent. Nothing is executed.
    pub fn workers_queue(&mut self) -> Result<WorkersQueue<E>> {
        let scheduled: Vec<(EntityRef<E>, Action, u64)> = self
            .iter()
            .filter_map(|(entity, entry)| {
                entry
                    .scheduled()
                    .map(|(action, priority)| (entity.clone(), action, priority))
            })
            .collect();

        let mut queue = WorkersQueue::new();
        for (entity, action, priority) in scheduled {
            let changes = self.changed_values(&entity)?;
            self.bind_relations(&entity, changes.keys())?;

            let worker: Box<dyn Worker<E>> = match action {
                Action::Save => Box::new(SaveWorker::new(entity, priority, self.id)),
                Action::Delete => Box::new(DeleteWorker::new(entity, priority, self.id)),
            };
            queue.push(worker);
        }

        debug!(
            "Registry '{}' queued {} worker(s)",
            self.config.table_name,
            queue.len()
        );
        Ok(queue)
    }

    fn bind_relations<'a>(
        &self,
        entity: &EntityRef<E>,
        changed: impl Iterator<Item = &'a String>,
    ) -> Result<()> {
        let relations = entity.relations()?;
        if relations.is_empty() {
            return Ok(());
        }

        let link = ParentLink {
            entity: entity.id(),
            hash_code: entity.hash_code(),
            table: self.config.table_name.clone(),
            dispatcher: self.event_dispatcher(entity)?.downgrade(),
        };
        for field in changed {
            if let Some(relation) = relations.get(field) {
                relation.set_parent(link.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldMap, Value};

    #[derive(Debug)]
    struct Counter {
        n: i64,
    }

    impl Accessor for Counter {
        fn fields(&self) -> Result<FieldMap> {
            Ok(FieldMap::from([("n".to_string(), Value::Integer(self.n))]))
        }

        fn set_field(&mut self, _name: &str, value: Value) -> Result<()> {
            self.n = value.as_i64().unwrap_or_default();
            Ok(())
        }
    }

    fn counter() -> EntityRef<Counter> {
        EntityRef::new(Counter { n: 0 })
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("save".parse::<Action>().unwrap(), Action::Save);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        assert!(matches!(
            "archive".parse::<Action>().unwrap_err(),
            DbError::UnknownAction(_)
        ));
        assert_eq!(Action::Delete.to_string(), "delete");
    }

    #[test]
    fn test_priorities_strictly_decrease() {
        let mut registry = Registry::new("counters");
        let a = counter();
        let b = counter();

        let p1 = registry.mark_for_action(&a, Action::Save).unwrap();
        let p2 = registry.mark_for_action(&b, Action::Save).unwrap();
        let p3 = registry.mark_for_action(&a, Action::Delete).unwrap();

        assert_eq!(p1, u64::MAX);
        assert!(p2 < p1);
        assert!(p3 < p2);
        assert_eq!(registry.data(&a).unwrap().action_priority(), Some(p3));
        assert_eq!(registry.data(&a).unwrap().pending_action(), Some(Action::Delete));
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut registry = Registry::with_config(
            crate::registry::RegistryConfig::new("counters").initial_priority(1),
        );
        assert_eq!(registry.mark_for_action(&counter(), Action::Save).unwrap(), 1);
        assert_eq!(registry.mark_for_action(&counter(), Action::Save).unwrap(), 0);

        let late = counter();
        let err = registry.mark_for_action(&late, Action::Save).unwrap_err();
        assert!(matches!(err, DbError::PriorityExhausted(_)));
        // failed call does not register
        assert!(!registry.contains(&late));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_named_action() {
        let mut registry = Registry::new("counters");
        let c = counter();
        assert!(matches!(
            registry.mark_for_action_named(&c, "upsert").unwrap_err(),
            DbError::UnknownAction(_)
        ));
        assert!(!registry.contains(&c));

        registry.mark_for_action_named(&c, "delete").unwrap();
        assert_eq!(registry.data(&c).unwrap().pending_action(), Some(Action::Delete));
    }

    #[test]
    fn test_clear_action() {
        let mut registry = Registry::new("counters");
        let c = counter();
        registry.mark_for_action(&c, Action::Save).unwrap();
        registry.clear_action(&c);
        assert!(registry.pending().is_empty());
        assert!(registry.workers_queue().unwrap().is_empty());
    }
}
