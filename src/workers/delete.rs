use super::{Worker, ensure_attached, key_filter};
use crate::connection::{Connection, Statement};
use crate::core::{Result, Value};
use crate::entity::{Accessor, EntityRef};
use crate::events::Event;
use crate::registry::{Action, Registry, RegistryId};
use async_trait::async_trait;
use tracing::debug;

/// Deletes one entity's row by primary key and detaches the entity from its
/// registry. Entities whose keys were never assigned are only detached.
pub struct DeleteWorker<E> {
    entity: EntityRef<E>,
    priority: u64,
    registry: RegistryId,
}

impl<E> DeleteWorker<E> {
    pub fn new(entity: EntityRef<E>, priority: u64, registry: RegistryId) -> Self {
        Self {
            entity,
            priority,
            registry,
        }
    }
}

#[async_trait]
impl<E: Accessor + 'static> Worker<E> for DeleteWorker<E> {
    fn entity(&self) -> &EntityRef<E> {
        &self.entity
    }

    fn action(&self) -> Action {
        Action::Delete
    }

    fn priority(&self) -> u64 {
        self.priority
    }

    fn registry(&self) -> RegistryId {
        self.registry
    }

    async fn execute(
        &self,
        registry: &mut Registry<E>,
        connection: &mut dyn Connection,
    ) -> Result<()> {
        ensure_attached(self, registry)?;
        let entity = &self.entity;

        registry.fire_event(entity, Event::BeforeDelete).await?;

        let table = connection.table(registry.table_name()).await?;
        let keys = key_filter(registry, entity, &table)?;
        if keys.values().all(Value::is_empty) {
            debug!(entity = %entity.id(), "never persisted, detaching only");
        } else {
            let statement = Statement::Delete {
                table: table.name().to_string(),
                keys,
            };
            debug!(%statement, "delete worker executing");
            connection.execute(statement).await?;
        }

        registry
            .fire_event(
                entity,
                Event::AfterDelete {
                    connection: &mut *connection,
                },
            )
            .await?;
        registry.remove(entity);
        Ok(())
    }
}
