// ============================================================================
// ORM Registry Library
// ============================================================================
//
// Change tracking and persistence ordering for live domain objects: an
// identity map per table, a lifecycle state machine, a snapshot diff engine
// and a scheduler that turns "save this / delete that" into an ordered queue
// of persistence workers.
//
// ============================================================================

pub mod connection;
pub mod core;
pub mod entity;
pub mod events;
pub mod prelude;
pub mod registry;
pub mod workers;

pub use connection::{Connection, MemoryConnection, Statement};
pub use core::{ColumnInfo, DbError, FieldMap, Identifiers, Result, TableInfo, Value, identifiers};
pub use entity::{Accessor, EntityId, EntityRef, ParentLink, Relation, RelationHandle};
pub use events::{Event, EventDispatcher, EventKind, Notification, WeakDispatcher};
pub use registry::{Action, EntityState, Entry, HASH_IDENTIFIER, Registry, RegistryConfig};
pub use workers::{DeleteWorker, SaveWorker, Worker, WorkersQueue};
