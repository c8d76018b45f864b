// ============================================================================
// Connection Capability
// ============================================================================
//
// Everything the registry and its workers need from a database: column
// metadata, the driver's last generated key, and execution of the three
// row-level statements a unit of work produces.
//
// ============================================================================

pub mod memory;
pub mod statement;

pub use memory::MemoryConnection;
pub use statement::Statement;

use crate::core::{Result, TableInfo, Value};
use async_trait::async_trait;

#[async_trait]
pub trait Connection: Send + Sync {
    /// Column metadata for `name`.
    async fn table(&self, name: &str) -> Result<TableInfo>;

    /// Key generated by the most recent insert on this connection.
    async fn last_insert_id(&self) -> Result<Value>;

    /// Runs one statement and returns the number of affected rows.
    async fn execute(&mut self, statement: Statement) -> Result<u64>;
}
