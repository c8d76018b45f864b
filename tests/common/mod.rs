#![allow(dead_code)]

use orm_registry::{
    Accessor, ColumnInfo, DbError, EventKind, FieldMap, MemoryConnection, Relation,
    RelationHandle, Result, TableInfo, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Plain serde entity: every field is a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
}

impl User {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: None,
        }
    }
}

impl Accessor for User {
    fn fields(&self) -> Result<FieldMap> {
        orm_registry::entity::json_fields(self)
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        orm_registry::entity::set_json_field(self, name, value)
    }
}

/// Entity with a one-to-many relation exposed as the `posts` field.
#[derive(Debug)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub posts: Vec<String>,
    pub posts_link: Arc<RelationHandle>,
}

impl Author {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            posts: Vec::new(),
            posts_link: Arc::new(RelationHandle::new()),
        }
    }
}

impl Accessor for Author {
    fn fields(&self) -> Result<FieldMap> {
        Ok(FieldMap::from([
            ("id".to_string(), Value::from(self.id)),
            ("name".to_string(), Value::Text(self.name.clone())),
            ("posts".to_string(), Value::Integer(self.posts.len() as i64)),
        ]))
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "id" => self.id = value.as_i64(),
            "name" => self.name = value.to_string(),
            other => {
                return Err(DbError::ColumnNotFound(
                    other.to_string(),
                    "authors".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn relations(&self) -> BTreeMap<String, Arc<dyn Relation>> {
        let link: Arc<dyn Relation> = self.posts_link.clone();
        BTreeMap::from([("posts".to_string(), link)])
    }
}

/// User that records the lifecycle events it receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip)]
    pub seen: Vec<EventKind>,
}

impl Member {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            seen: Vec::new(),
        }
    }
}

impl Accessor for Member {
    fn fields(&self) -> Result<FieldMap> {
        orm_registry::entity::json_fields(self)
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let seen = std::mem::take(&mut self.seen);
        let result = orm_registry::entity::set_json_field(self, name, value);
        self.seen = seen;
        result
    }

    fn on_event(&mut self, kind: EventKind) {
        self.seen.push(kind);
    }
}

pub fn users_table() -> TableInfo {
    TableInfo::new(
        "users",
        vec![
            ColumnInfo::new("id").primary_key().auto_increment(),
            ColumnInfo::new("name"),
            ColumnInfo::new("email"),
        ],
    )
}

pub fn authors_table() -> TableInfo {
    TableInfo::new(
        "authors",
        vec![
            ColumnInfo::new("id").primary_key().auto_increment(),
            ColumnInfo::new("name"),
        ],
    )
}

pub fn connection() -> MemoryConnection {
    let mut conn = MemoryConnection::new();
    conn.create_table(users_table()).unwrap();
    conn.create_table(authors_table()).unwrap();
    conn
}
