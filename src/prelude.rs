//! Everything an application needs to track and flush entities.
//!
//! ```
//! use orm_registry::prelude::*;
//! ```

pub use crate::connection::{Connection, Statement};
pub use crate::core::{DbError, FieldMap, Identifiers, Result, Value, identifiers};
pub use crate::entity::{Accessor, EntityRef, Relation, json_fields, set_json_field};
pub use crate::events::{EventKind, Notification};
pub use crate::registry::{Action, EntityState, Registry, RegistryConfig};
pub use crate::workers::{Worker, WorkersQueue};
