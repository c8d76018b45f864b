use super::Worker;
use crate::connection::Connection;
use crate::core::Result;
use crate::entity::Accessor;
use crate::registry::Registry;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::{Instrument, info_span};

struct Queued<E> {
    // min-heap on the priority slot: the most recently marked sits on top
    key: Reverse<u64>,
    worker: Box<dyn Worker<E>>,
}

impl<E> PartialEq for Queued<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E> Eq for Queued<E> {}

impl<E> PartialOrd for Queued<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Queued<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Workers ordered most-recently-marked first.
pub struct WorkersQueue<E> {
    heap: BinaryHeap<Queued<E>>,
}

impl<E: Accessor + 'static> WorkersQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, worker: Box<dyn Worker<E>>) {
        self.heap.push(Queued {
            key: Reverse(worker.priority()),
            worker,
        });
    }

    pub fn pop(&mut self) -> Option<Box<dyn Worker<E>>> {
        self.heap.pop().map(|queued| queued.worker)
    }

    pub fn peek(&self) -> Option<&dyn Worker<E>> {
        self.heap.peek().map(|queued| queued.worker.as_ref())
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Runs every worker in queue order, stopping at the first failure.
    ///
    /// Returns the number of workers executed.
    ///
    /// # Example
    ///
    /// ```
    /// use orm_registry::prelude::*;
    /// use orm_registry::{ColumnInfo, MemoryConnection, TableInfo};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize)]
    /// struct Post {
    ///     id: Option<i64>,
    ///     title: String,
    /// }
    ///
    /// impl Accessor for Post {
    ///     fn fields(&self) -> Result<FieldMap> {
    ///         json_fields(self)
    ///     }
    ///
    ///     fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
    ///         set_json_field(self, name, value)
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let mut conn = MemoryConnection::new().with_table(TableInfo::new(
    ///     "posts",
    ///     vec![ColumnInfo::new("id").primary_key().auto_increment(), ColumnInfo::new("title")],
    /// ))?;
    /// let mut registry = Registry::new("posts");
    /// let post = EntityRef::new(Post { id: None, title: "Hello".into() });
    ///
    /// registry.mark_for_action(&post, Action::Save)?;
    /// let queue = registry.workers_queue()?;
    /// assert_eq!(queue.execute_all(&mut registry, &mut conn).await?, 1);
    /// assert_eq!(post.read()?.id, Some(1));
    /// # Ok::<(), DbError>(())
    /// # }).unwrap();
    /// ```
    pub async fn execute_all(
        self,
        registry: &mut Registry<E>,
        connection: &mut dyn Connection,
    ) -> Result<usize> {
        let mut executed = 0;
        for worker in self {
            let span = info_span!(
                "worker",
                table = %registry.table_name(),
                action = %worker.action(),
                entity = %worker.entity().id(),
                priority = worker.priority(),
            );
            worker.execute(registry, connection).instrument(span).await?;
            executed += 1;
        }
        Ok(executed)
    }
}

impl<E: Accessor + 'static> Default for WorkersQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Accessor + 'static> Iterator for WorkersQueue<E> {
    type Item = Box<dyn Worker<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}
