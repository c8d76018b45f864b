// ============================================================================
// Row Statements
// ============================================================================
//
// Workers never build SQL text. They describe the write as a `Statement` and
// leave rendering and execution to the connection.
//
// ============================================================================

use crate::core::{FieldMap, Identifiers};

/// A single row-level write produced by a worker
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Insert a new row
    Insert { table: String, values: FieldMap },

    /// Update the rows matching `keys`
    Update {
        table: String,
        keys: Identifiers,
        values: FieldMap,
    },

    /// Delete the rows matching `keys`
    Delete { table: String, keys: Identifiers },
}

impl Statement {
    /// Get the table name affected by this statement
    pub fn table_name(&self) -> &str {
        match self {
            Statement::Insert { table, .. } => table,
            Statement::Update { table, .. } => table,
            Statement::Delete { table, .. } => table,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Statement::Insert { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Statement::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Statement::Delete { .. })
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list(map: &FieldMap, sep: &str) -> String {
            map.iter()
                .map(|(k, v)| format!("{} = {}", k, v))
                .collect::<Vec<_>>()
                .join(sep)
        }

        match self {
            Statement::Insert { table, values } => {
                let columns: Vec<&str> = values.keys().map(|k| k.as_str()).collect();
                let values: Vec<String> = values.values().map(|v| v.to_string()).collect();
                write!(
                    f,
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    values.join(", ")
                )
            }
            Statement::Update {
                table,
                keys,
                values,
            } => write!(
                f,
                "UPDATE {} SET {} WHERE {}",
                table,
                list(values, ", "),
                list(keys, " AND ")
            ),
            Statement::Delete { table, keys } => {
                write!(f, "DELETE FROM {} WHERE {}", table, list(keys, " AND "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Value, identifiers};

    #[test]
    fn test_statement_table_name() {
        let stmt = Statement::Delete {
            table: "users".to_string(),
            keys: identifiers([("id", 1i64)]),
        };
        assert_eq!(stmt.table_name(), "users");
        assert!(stmt.is_delete());
        assert!(!stmt.is_insert());
    }

    #[test]
    fn test_statement_display() {
        let stmt = Statement::Update {
            table: "users".to_string(),
            keys: identifiers([("id", 1i64)]),
            values: FieldMap::from([("name".to_string(), Value::Text("Bob".into()))]),
        };
        assert_eq!(stmt.to_string(), "UPDATE users SET name = Bob WHERE id = 1");
    }
}
