use super::{Worker, ensure_attached, key_filter, persistable};
use crate::connection::{Connection, Statement};
use crate::core::{Result, Value};
use crate::entity::{Accessor, EntityRef};
use crate::events::Event;
use crate::registry::{Action, EntityState, Registry, RegistryId};
use async_trait::async_trait;
use tracing::debug;

/// Inserts or updates one entity depending on its lifecycle state:
///
/// | state                 | statement                                               |
/// |-----------------------|---------------------------------------------------------|
/// | NEW                   | INSERT every persistable field                          |
/// | any, keys all empty   | INSERT every persistable field                          |
/// | CHANGED               | UPDATE the changed fields, keyed by the baseline keys   |
/// | UNKNOWN               | UPDATE every non-key field                              |
/// | FRESH                 | nothing                                                 |
///
/// Afterwards `AfterSave` fires (generated keys are written back only after
/// an INSERT), the entity is re-baselined and its pending action is cleared.
pub struct SaveWorker<E> {
    entity: EntityRef<E>,
    priority: u64,
    registry: RegistryId,
}

impl<E> SaveWorker<E> {
    pub fn new(entity: EntityRef<E>, priority: u64, registry: RegistryId) -> Self {
        Self {
            entity,
            priority,
            registry,
        }
    }
}

impl<E: Accessor + 'static> SaveWorker<E> {
    async fn statement(
        &self,
        registry: &mut Registry<E>,
        connection: &mut dyn Connection,
    ) -> Result<Option<Statement>> {
        let entity = &self.entity;
        let table = connection.table(registry.table_name()).await?;
        let relations = entity.relations()?;
        let table_name = table.name().to_string();

        let state = registry.state(entity);
        if state == EntityState::Unregistered {
            return Ok(None);
        }

        let insert = |values| Statement::Insert {
            table: table_name.clone(),
            values,
        };
        if state == EntityState::New {
            return Ok(Some(insert(persistable(entity.fields()?, &table, &relations))));
        }

        // never persisted, whatever the state says
        let keys = key_filter(registry, entity, &table)?;
        if keys.values().all(Value::is_empty) {
            return Ok(Some(insert(persistable(entity.fields()?, &table, &relations))));
        }

        let statement = match state {
            EntityState::Changed => {
                let values = persistable(registry.changed_values(entity)?, &table, &relations);
                (!values.is_empty()).then(|| Statement::Update {
                    table: table_name.clone(),
                    keys,
                    values,
                })
            }
            EntityState::Unknown => {
                let mut values = persistable(entity.fields()?, &table, &relations);
                values.retain(|name, _| !keys.contains_key(name));
                (!values.is_empty()).then(|| Statement::Update {
                    table: table_name.clone(),
                    keys,
                    values,
                })
            }
            _ => None,
        };
        Ok(statement)
    }
}

#[async_trait]
impl<E: Accessor + 'static> Worker<E> for SaveWorker<E> {
    fn entity(&self) -> &EntityRef<E> {
        &self.entity
    }

    fn action(&self) -> Action {
        Action::Save
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

        registry.fire_event(entity, Event::BeforeSave).await?;

        let inserted = match self.statement(registry, connection).await? {
            Some(statement) => {
                debug!(%statement, "save worker executing");
                let inserted = statement.is_insert();
                let affected = connection.execute(statement).await?;
                debug!(affected, entity = %entity.id(), "save worker done");
                inserted
            }
            None => {
                debug!(entity = %entity.id(), "nothing to write");
                false
            }
        };

        registry
            .fire_event(
                entity,
                Event::AfterSave {
                    connection: &mut *connection,
                    inserted,
                },
            )
            .await?;
        registry.define_initial_values(entity)?;
        registry.clear_action(entity);
        Ok(())
    }
}
