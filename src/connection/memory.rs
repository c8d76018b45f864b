use super::{Connection, Statement};
use crate::core::{DbError, FieldMap, Identifiers, Result, TableInfo, Value};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Rows of one in-memory table plus its key generator
#[derive(Debug, Clone)]
struct MemoryTable {
    info: TableInfo,
    rows: BTreeMap<usize, FieldMap>,
    next_row_id: usize,
    next_auto_id: i64,
}

impl MemoryTable {
    fn new(info: TableInfo) -> Self {
        Self {
            info,
            rows: BTreeMap::new(),
            next_row_id: 0,
            next_auto_id: 1,
        }
    }

    fn validate_columns(&self, values: &FieldMap) -> Result<()> {
        for name in values.keys() {
            if !self.info.has_column(name) {
                return Err(DbError::ColumnNotFound(
                    name.clone(),
                    self.info.name().to_string(),
                ));
            }
        }
        Ok(())
    }

    fn matching(&self, keys: &Identifiers) -> Vec<usize> {
        self.rows
            .iter()
            .filter(|(_, row)| {
                keys.iter()
                    .all(|(k, v)| row.get(k).is_some_and(|current| current == v))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn check_uniqueness(&self, row: &FieldMap, ignore_id: Option<usize>) -> Result<()> {
        let keys: Vec<&str> = self
            .info
            .columns()
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let probe: Identifiers = keys
            .iter()
            .map(|k| (k.to_string(), row.get(*k).cloned().unwrap_or(Value::Null)))
            .collect();
        if probe.values().any(Value::is_null) {
            return Ok(());
        }

        if self
            .matching(&probe)
            .into_iter()
            .any(|id| Some(id) != ignore_id)
        {
            return Err(DbError::ConstraintViolation(format!(
                "Duplicate primary key in table '{}'",
                self.info.name()
            )));
        }
        Ok(())
    }

    /// Returns the generated key, if any
    fn insert(&mut self, mut values: FieldMap) -> Result<Option<Value>> {
        self.validate_columns(&values)?;

        let mut generated = None;
        let auto_columns: Vec<String> = self
            .info
            .auto_increment_columns()
            .map(|c| c.name.clone())
            .collect();
        for column in auto_columns {
            let empty = values.get(&column).is_none_or(Value::is_empty);
            if empty {
                let id = Value::Integer(self.next_auto_id);
                self.next_auto_id += 1;
                values.insert(column, id.clone());
                generated = Some(id);
            } else if let Some(explicit) = values.get(&column).and_then(Value::as_i64) {
                self.next_auto_id = self.next_auto_id.max(explicit + 1);
            }
        }

        for column in self.info.columns() {
            values.entry(column.name.clone()).or_insert(Value::Null);
        }

        self.check_uniqueness(&values, None)?;

        let row_id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(row_id, values);
        Ok(generated)
    }

    fn update(&mut self, keys: &Identifiers, values: &FieldMap) -> Result<u64> {
        self.validate_columns(values)?;

        let ids = self.matching(keys);
        for id in &ids {
            let mut candidate = self.rows[id].clone();
            for (k, v) in values {
                candidate.insert(k.clone(), v.clone());
            }
            self.check_uniqueness(&candidate, Some(*id))?;
            self.rows.insert(*id, candidate);
        }
        Ok(ids.len() as u64)
    }

    fn delete(&mut self, keys: &Identifiers) -> u64 {
        let ids = self.matching(keys);
        for id in &ids {
            self.rows.remove(id);
        }
        ids.len() as u64
    }
}

/// In-process connection used for tests and demos.
///
/// Keeps rows per table, generates auto-increment keys and records every
/// statement it executed.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    tables: HashMap<String, MemoryTable>,
    last_insert_id: Option<Value>,
    executed: Vec<Statement>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, info: TableInfo) -> Result<()> {
        let name = info.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(DbError::ExecutionError(format!(
                "Table '{}' already exists",
                name
            )));
        }
        self.tables.insert(name, MemoryTable::new(info));
        Ok(())
    }

    pub fn with_table(mut self, info: TableInfo) -> Result<Self> {
        self.create_table(info)?;
        Ok(self)
    }

    /// Current rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<FieldMap>> {
        Ok(self.get_table(table)?.rows.values().cloned().collect())
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.get_table(table)?.rows.len())
    }

    /// Statements executed so far, oldest first.
    pub fn executed(&self) -> &[Statement] {
        &self.executed
    }

    fn get_table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn get_table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn table(&self, name: &str) -> Result<TableInfo> {
        Ok(self.get_table(name)?.info.clone())
    }

    async fn last_insert_id(&self) -> Result<Value> {
        Ok(self.last_insert_id.clone().unwrap_or(Value::Null))
    }

    async fn execute(&mut self, statement: Statement) -> Result<u64> {
        let affected = match &statement {
            Statement::Insert { table, values } => {
                let generated = self.get_table_mut(table)?.insert(values.clone())?;
                if generated.is_some() {
                    self.last_insert_id = generated;
                }
                1
            }
            Statement::Update {
                table,
                keys,
                values,
            } => self.get_table_mut(table)?.update(keys, values)?,
            Statement::Delete { table, keys } => self.get_table_mut(table)?.delete(keys),
        };

        self.executed.push(statement);
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnInfo, identifiers};

    fn users() -> TableInfo {
        TableInfo::new(
            "users",
            vec![
                ColumnInfo::new("id").primary_key().auto_increment(),
                ColumnInfo::new("name"),
            ],
        )
    }

    fn insert(name: &str) -> Statement {
        Statement::Insert {
            table: "users".to_string(),
            values: FieldMap::from([("name".to_string(), Value::from(name))]),
        }
    }

    #[tokio::test]
    async fn test_insert_generates_keys() {
        let mut conn = MemoryConnection::new().with_table(users()).unwrap();

        assert_eq!(conn.last_insert_id().await.unwrap(), Value::Null);
        conn.execute(insert("Alice")).await.unwrap();
        assert_eq!(conn.last_insert_id().await.unwrap(), Value::Integer(1));
        conn.execute(insert("Bob")).await.unwrap();
        assert_eq!(conn.last_insert_id().await.unwrap(), Value::Integer(2));

        let rows = conn.rows("users").unwrap();
        assert_eq!(rows[1]["id"], Value::Integer(2));
        assert_eq!(rows[1]["name"], Value::Text("Bob".into()));
    }

    #[tokio::test]
    async fn test_update_and_delete_by_keys() {
        let mut conn = MemoryConnection::new().with_table(users()).unwrap();
        conn.execute(insert("Alice")).await.unwrap();
        conn.execute(insert("Bob")).await.unwrap();

        let updated = conn
            .execute(Statement::Update {
                table: "users".to_string(),
                keys: identifiers([("id", 2i64)]),
                values: FieldMap::from([("name".to_string(), Value::from("Robert"))]),
            })
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(conn.rows("users").unwrap()[1]["name"], Value::from("Robert"));

        let deleted = conn
            .execute(Statement::Delete {
                table: "users".to_string(),
                keys: identifiers([("id", 1i64)]),
            })
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(conn.row_count("users").unwrap(), 1);
        assert_eq!(conn.executed().len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_primary_key_rejected() {
        let mut conn = MemoryConnection::new().with_table(users()).unwrap();
        let explicit = Statement::Insert {
            table: "users".to_string(),
            values: FieldMap::from([
                ("id".to_string(), Value::Integer(5)),
                ("name".to_string(), Value::from("Alice")),
            ]),
        };
        conn.execute(explicit.clone()).await.unwrap();
        let err = conn.execute(explicit).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        // generator continues after explicit keys
        conn.execute(insert("Bob")).await.unwrap();
        assert_eq!(conn.last_insert_id().await.unwrap(), Value::Integer(6));
    }

    #[tokio::test]
    async fn test_unknown_table_and_column() {
        let mut conn = MemoryConnection::new().with_table(users()).unwrap();
        assert!(matches!(
            conn.table("nope").await.unwrap_err(),
            DbError::TableNotFound(_)
        ));

        let err = conn
            .execute(Statement::Insert {
                table: "users".to_string(),
                values: FieldMap::from([("age".to_string(), Value::Integer(3))]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(_, _)));
    }
}
