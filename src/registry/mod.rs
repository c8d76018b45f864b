// ============================================================================
// Entity Registry
// ============================================================================
//
// Identity map + lifecycle state machine + change detector + action
// scheduler for the entities of one table.
//
// - Identity Store: entries keyed by `EntityId`, never by value
// - State Machine: see `state.rs`
// - Change Detector: see `diff.rs`
// - Action Scheduler: see `scheduler.rs`
//
// The registry is single-owner and synchronous. Anything that talks to a
// database (workers, the generated-key listener) borrows it mutably for the
// duration of the call.
//
// ============================================================================

pub mod config;
pub mod diff;
pub mod entry;
pub mod scheduler;
pub mod state;

pub use config::RegistryConfig;
pub use diff::compute_diff;
pub use entry::Entry;
pub use scheduler::Action;
pub use state::EntityState;

use crate::connection::Connection;
use crate::core::{DbError, FieldMap, Identifiers, Result, Value};
use crate::entity::{Accessor, EntityId, EntityRef};
use crate::events::{Event, EventDispatcher, EventKind, InternalListener, Listener, Notification};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Key used when an entity is stored without identifiers
pub const HASH_IDENTIFIER: &str = "%hash%";

/// Global registry counter
static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registry instance; workers remember the one that built them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::SeqCst))
    }
}

struct Slot<E> {
    entity: EntityRef<E>,
    entry: Entry,
}

pub struct Registry<E> {
    id: RegistryId,
    config: RegistryConfig,
    store: BTreeMap<EntityId, Slot<E>>,
    /// Next priority slot; `None` once every slot has been handed out
    priority: Option<u64>,
}

impl<E: Accessor> Registry<E> {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self::with_config(RegistryConfig::new(table_name))
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            id: RegistryId::next(),
            priority: Some(config.initial_priority),
            config,
            store: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Identity store
    // ------------------------------------------------------------------

    /// Registers `entity` unless it is already present.
    ///
    /// Empty `identifiers` are replaced by a single `%hash%` key derived from
    /// the entity's identity.
    ///
    /// # Errors
    /// Returns error if `state` is `Unregistered`
    pub fn store(
        &mut self,
        entity: &EntityRef<E>,
        identifiers: Identifiers,
        state: EntityState,
    ) -> Result<()> {
        self.store_with_baseline(entity, identifiers, state, FieldMap::new())
    }

    /// Like [`store`](Self::store), seeding the entry's baseline with
    /// `initial_values` (e.g. the row a hydrator just loaded).
    ///
    /// The seeded baseline is kept as-is; no `Fresh` event is emitted.
    pub fn store_with_baseline(
        &mut self,
        entity: &EntityRef<E>,
        identifiers: Identifiers,
        state: EntityState,
        initial_values: FieldMap,
    ) -> Result<()> {
        if self.contains(entity) {
            return Ok(());
        }

        if !state.is_storable() {
            return Err(DbError::InvalidState(format!(
                "cannot store {} as '{}'",
                entity.id(),
                state
            )));
        }

        let identifiers = if identifiers.is_empty() {
            Identifiers::from([(
                HASH_IDENTIFIER.to_string(),
                Value::Text(entity.hash_code()),
            )])
        } else {
            identifiers
        };

        let mut entry = Entry::new(identifiers, state);
        entry.initial_values = initial_values;
        if self.config.auto_increment {
            entry
                .dispatcher
                .on_internal(EventKind::AfterSave, InternalListener::LastInsertId)?;
        }
        for kind in EventKind::ALL {
            entry.dispatcher.on_internal(kind, InternalListener::Entity)?;
        }

        debug!(
            "Registry '{}' stored {} as '{}'",
            self.config.table_name,
            entity.id(),
            state
        );
        self.store.insert(
            entity.id(),
            Slot {
                entity: entity.clone(),
                entry,
            },
        );
        Ok(())
    }

    /// Shorthand for `store(entity, {}, Unknown)`.
    pub fn register(&mut self, entity: &EntityRef<E>) -> Result<()> {
        self.store(entity, Identifiers::new(), EntityState::Unknown)
    }

    /// Finds the entity whose identifiers equal `identifiers` exactly.
    pub fn get(&self, identifiers: &Identifiers) -> Option<EntityRef<E>> {
        self.store
            .values()
            .find(|slot| &slot.entry.identifiers == identifiers)
            .map(|slot| slot.entity.clone())
    }

    pub fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.store.contains_key(&entity.id())
    }

    /// Detaches `entity` and drops its event channel. No-op for non-members.
    pub fn remove(&mut self, entity: &EntityRef<E>) -> &mut Self {
        if self.store.remove(&entity.id()).is_some() {
            debug!(
                "Registry '{}' removed {}",
                self.config.table_name,
                entity.id()
            );
        }
        self
    }

    pub fn remove_by_identifiers(&mut self, identifiers: &Identifiers) -> &mut Self {
        if let Some(entity) = self.get(identifiers) {
            self.remove(&entity);
        }
        self
    }

    /// Bookkeeping for `entity`.
    ///
    /// # Errors
    /// Returns `UnregisteredEntity` if the entity is not a member
    pub fn data(&self, entity: &EntityRef<E>) -> Result<&Entry> {
        self.store
            .get(&entity.id())
            .map(|slot| &slot.entry)
            .ok_or_else(|| self.unregistered(entity))
    }

    /// Replaces the bookkeeping for `entity`; silently ignored for
    /// non-members.
    pub fn set_data(&mut self, entity: &EntityRef<E>, data: Entry) {
        if let Some(slot) = self.store.get_mut(&entity.id()) {
            slot.entry = data;
        }
    }

    pub(crate) fn entry_mut(&mut self, entity: &EntityRef<E>) -> Result<&mut Entry> {
        let table = &self.config.table_name;
        self.store
            .get_mut(&entity.id())
            .map(|slot| &mut slot.entry)
            .ok_or_else(|| unregistered(table, entity.id()))
    }

    fn unregistered(&self, entity: &EntityRef<E>) -> DbError {
        unregistered(&self.config.table_name, entity.id())
    }

    pub fn state(&self, entity: &EntityRef<E>) -> EntityState {
        self.store
            .get(&entity.id())
            .map(|slot| slot.entry.state)
            .unwrap_or(EntityState::Unregistered)
    }

    /// Every registered entity, in registration-handle order.
    pub fn entities(&self) -> Vec<EntityRef<E>> {
        self.store.values().map(|slot| slot.entity.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityRef<E>, &Entry)> {
        self.store.values().map(|slot| (&slot.entity, &slot.entry))
    }

    /// Entities that currently have a pending action.
    pub fn pending(&self) -> Vec<EntityRef<E>> {
        self.iter()
            .filter(|(_, entry)| entry.pending_action.is_some())
            .map(|(entity, _)| entity.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// # Errors
    /// Returns `UnregisteredEntity` if the entity is not a member
    pub fn event_dispatcher(&self, entity: &EntityRef<E>) -> Result<&EventDispatcher> {
        Ok(&self.data(entity)?.dispatcher)
    }

    fn notification(&self, entity: &EntityRef<E>, kind: EventKind) -> Notification {
        Notification {
            kind,
            entity: entity.id(),
            table: self.config.table_name.clone(),
        }
    }

    /// Emits a connection-less event to the entity hook and user callbacks.
    pub(crate) fn notify(&self, entity: &EntityRef<E>, kind: EventKind) -> Result<()> {
        let listeners = self.event_dispatcher(entity)?.listeners(kind)?;
        let notification = self.notification(entity, kind);
        for listener in listeners {
            match listener {
                Listener::Internal(InternalListener::Entity) => entity.write()?.on_event(kind),
                Listener::Internal(InternalListener::LastInsertId) => {}
                Listener::Callback(callback) => callback(&notification),
            }
        }
        Ok(())
    }

    /// Delivers `event` to the entity's channel, running internal listeners
    /// and user callbacks in subscription order.
    pub async fn fire_event(&mut self, entity: &EntityRef<E>, event: Event<'_>) -> Result<()> {
        let kind = event.kind();
        let listeners = self.event_dispatcher(entity)?.listeners(kind)?;
        let notification = self.notification(entity, kind);

        // generated keys are only fetched right after an INSERT
        let mut connection = match event {
            Event::AfterSave {
                connection,
                inserted: true,
            } => Some(connection),
            _ => None,
        };

        for listener in listeners {
            match listener {
                Listener::Internal(InternalListener::LastInsertId) => {
                    if let Some(connection) = connection.as_deref_mut() {
                        self.assign_generated_keys(entity, connection).await?;
                    }
                }
                Listener::Internal(InternalListener::Entity) => entity.write()?.on_event(kind),
                Listener::Callback(callback) => callback(&notification),
            }
        }
        Ok(())
    }

    /// Writes the driver's last insert id onto every empty auto-increment
    /// column of `entity`, then re-baselines it.
    ///
    /// Returns whether anything was written.
    pub async fn assign_generated_keys(
        &mut self,
        entity: &EntityRef<E>,
        connection: &mut dyn Connection,
    ) -> Result<bool> {
        let table = connection.table(&self.config.table_name).await?;

        let mut written = false;
        for column in table.auto_increment_columns() {
            if !entity.field(&column.name)?.is_empty() {
                continue;
            }

            let last_insert_id = connection.last_insert_id().await?;
            if last_insert_id.is_empty() {
                warn!(
                    "No generated key available for '{}.{}' on {}",
                    table.name(),
                    column.name,
                    entity.id()
                );
                continue;
            }

            entity.set_field(&column.name, last_insert_id)?;
            written = true;
        }

        if written {
            self.define_initial_values(entity)?;
        }
        Ok(written)
    }
}

fn unregistered(table: &str, entity: EntityId) -> DbError {
    DbError::UnregisteredEntity(format!("{}#{}", table, entity))
}

impl<E> std::fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("table", &self.config.table_name)
            .field("entries", &self.store.len())
            .field("priority", &self.priority)
            .finish()
    }
}
