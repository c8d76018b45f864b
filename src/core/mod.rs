pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{ColumnInfo, FieldMap, Identifiers, TableInfo, identifiers};
pub use value::Value;
