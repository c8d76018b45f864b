// ============================================================================
// Persistence Workers
// ============================================================================
//
// A worker is one scheduled write for one entity. Workers are built by
// `Registry::workers_queue`, remember which registry built them, and get that
// registry back (mutably) when executed so they can re-baseline, clear the
// pending action, or detach the entity.
//
// ============================================================================

pub mod delete;
pub mod queue;
pub mod save;

pub use delete::DeleteWorker;
pub use queue::WorkersQueue;
pub use save::SaveWorker;

use crate::connection::Connection;
use crate::core::{DbError, FieldMap, Identifiers, Result, TableInfo};
use crate::entity::{Accessor, EntityRef, Relation};
use crate::registry::{Action, Registry, RegistryId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait Worker<E>: Send + Sync {
    fn entity(&self) -> &EntityRef<E>;

    fn action(&self) -> Action;

    /// Priority slot the entity was marked with
    fn priority(&self) -> u64;

    /// Registry that built this worker
    fn registry(&self) -> RegistryId;

    /// Performs the write and the registry bookkeeping that follows it.
    async fn execute(&self, registry: &mut Registry<E>, connection: &mut dyn Connection)
    -> Result<()>;
}

/// Fails unless `registry` is the one the worker was built by and still
/// holds the worker's entity.
fn ensure_attached<E: Accessor + 'static>(
    worker: &dyn Worker<E>,
    registry: &Registry<E>,
) -> Result<()> {
    if worker.registry() != registry.id() {
        return Err(DbError::ExecutionError(format!(
            "{} worker for {} belongs to another registry than '{}'",
            worker.action(),
            worker.entity().id(),
            registry.table_name()
        )));
    }
    registry.data(worker.entity())?;
    Ok(())
}

/// Primary key filter for `entity`: baseline values first, current values
/// for keys that were never synchronized.
fn key_filter<E: Accessor>(
    registry: &Registry<E>,
    entity: &EntityRef<E>,
    table: &TableInfo,
) -> Result<Identifiers> {
    let baseline = registry.data(entity)?.initial_values();

    let mut keys = Identifiers::new();
    for name in table.identifier_keys()? {
        let value = match baseline.get(name) {
            Some(value) if !value.is_null() => value.clone(),
            _ => entity.field(name)?,
        };
        keys.insert(name.to_string(), value);
    }
    Ok(keys)
}

/// Drops relation fields and anything the table has no column for.
fn persistable(
    fields: FieldMap,
    table: &TableInfo,
    relations: &BTreeMap<String, Arc<dyn Relation>>,
) -> FieldMap {
    fields
        .into_iter()
        .filter(|(name, _)| table.has_column(name) && !relations.contains_key(name))
        .collect()
}
