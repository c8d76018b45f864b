use super::{DbError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat field name -> value snapshot of an entity.
pub type FieldMap = BTreeMap<String, Value>;

/// Key set used to look an entity up. Keys are always kept sorted.
pub type Identifiers = BTreeMap<String, Value>;

/// Builds an `Identifiers` map from `(name, value)` pairs in any order.
pub fn identifiers<K, V, I>(pairs: I) -> Identifiers
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            auto_increment: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Column metadata for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    name: String,
    columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    pub fn auto_increment_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|col| col.auto_increment)
    }

    /// Names of the primary key columns.
    ///
    /// # Errors
    /// Returns error if the table declares no primary key at all
    pub fn identifier_keys(&self) -> Result<Vec<&str>> {
        let keys: Vec<&str> = self
            .columns
            .iter()
            .filter(|col| col.primary_key)
            .map(|col| col.name.as_str())
            .collect();

        if keys.is_empty() {
            return Err(DbError::ExecutionError(format!(
                "Table '{}' lacks identifiers",
                self.name
            )));
        }
        Ok(keys)
    }
}
