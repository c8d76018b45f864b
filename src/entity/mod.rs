// ============================================================================
// Entity Handles & Field Access
// ============================================================================
//
// The registry never looks inside a domain object by itself. It works on
// shared handles (`EntityRef`) whose identity is a process-wide `EntityId`,
// and reads/writes fields through the `Accessor` trait implemented by the
// domain type.
//
// ============================================================================

pub mod json;
pub mod relation;

pub use json::{json_fields, set_json_field};
pub use relation::{ParentLink, Relation, RelationHandle};

use crate::core::{FieldMap, Result, Value};
use crate::events::EventKind;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global entity handle counter
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a live domain object.
///
/// Two handles share an id only if one is a clone of the other; objects with
/// identical field values still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity_{}", self.0)
    }
}

/// Field-level view of a domain object.
///
/// `fields` must be deterministic: two calls without an intervening mutation
/// return equal maps.
pub trait Accessor: Send + Sync {
    /// Flat snapshot of every tracked field.
    fn fields(&self) -> Result<FieldMap>;

    /// Writes one field back onto the object.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Reads one field; unknown fields read as `NULL`.
    fn field(&self, name: &str) -> Result<Value> {
        Ok(self.fields()?.remove(name).unwrap_or(Value::Null))
    }

    /// Fields that hold relations to other entities, keyed by field name.
    fn relations(&self) -> BTreeMap<String, Arc<dyn Relation>> {
        BTreeMap::new()
    }

    /// Lifecycle hook, called for every event on the entity's channel.
    fn on_event(&mut self, _kind: EventKind) {}
}

/// Shared, identity-carrying handle to a domain object.
pub struct EntityRef<E> {
    id: EntityId,
    inner: Arc<RwLock<E>>,
}

impl<E> EntityRef<E> {
    pub fn new(entity: E) -> Self {
        Self {
            id: EntityId::next(),
            inner: Arc::new(RwLock::new(entity)),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Deterministic identity hash, stable for the lifetime of the handle.
    pub fn hash_code(&self) -> String {
        format!("{:032x}", self.id.0)
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, E>> {
        Ok(self.inner.read()?)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, E>> {
        Ok(self.inner.write()?)
    }

    pub fn ptr_eq(&self, other: &EntityRef<E>) -> bool {
        self.id == other.id
    }
}

impl<E: Accessor> EntityRef<E> {
    pub fn fields(&self) -> Result<FieldMap> {
        self.read()?.fields()
    }

    pub fn field(&self, name: &str) -> Result<Value> {
        self.read()?.field(name)
    }

    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write()?.set_field(name, value.into())
    }

    pub fn relations(&self) -> Result<BTreeMap<String, Arc<dyn Relation>>> {
        Ok(self.read()?.relations())
    }
}

impl<E> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef").field("id", &self.id).finish()
    }
}
