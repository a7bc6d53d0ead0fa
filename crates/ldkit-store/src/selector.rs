//! Batched selection queries (§4.8). Unlike the Fetcher, each task
//! compiles to its own query (a run phase materializes one query per
//! task, not one per batch); the Loader still runs every pending task
//! concurrently within a round.

use std::mem;
use std::sync::Mutex;

use async_trait::async_trait;
use ldkit_query::{compile, Query};
use ldkit_shape::Property;
use ldkit_value::Value;
use tokio::sync::oneshot;

use crate::connection::TripleStoreConnection;
use crate::error::StoreError;
use crate::worker::Worker;

/// A `Query` payload threaded through [`ldkit_value::Value::Generic`]
/// (the host-object use case `Generic` exists for) so the Retriever can
/// recognize and dispatch an embedded query without the value algebra
/// needing to understand the query's shape.
#[derive(Debug, Clone)]
pub struct QueryPayload {
    pub is_virtual: bool,
    pub id: Option<String>,
    pub property: Property,
    pub query: Query,
}

struct SelectTask {
    is_virtual: bool,
    id: Option<String>,
    property: Property,
    query: Query,
    reply: oneshot::Sender<Value>,
}

#[derive(Default)]
pub struct Selector {
    pending: Mutex<Vec<SelectTask>>,
}

impl Selector {
    pub fn new() -> Selector {
        Selector::default()
    }

    pub fn request(
        &self,
        is_virtual: bool,
        id: Option<String>,
        property: Property,
        query: Query,
    ) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(SelectTask { is_virtual, id, property, query, reply: tx });
        rx
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Convenience wrapper for a [`QueryPayload`] pulled out of a
    /// [`ldkit_value::Generic`] model field.
    pub fn request_payload(&self, payload: QueryPayload) -> oneshot::Receiver<Value> {
        self.request(payload.is_virtual, payload.id, payload.property, payload.query)
    }
}

#[async_trait]
impl Worker for Selector {
    #[tracing::instrument(level = "debug", skip(self, connection))]
    async fn run(&self, connection: &dyn TripleStoreConnection) -> Result<bool, StoreError> {
        let batch: Vec<SelectTask> = mem::take(&mut *self.pending.lock().unwrap());
        if batch.is_empty() {
            return Ok(false);
        }

        for task in batch {
            let compiled = compile(task.is_virtual, task.id.as_deref(), &task.property, &task.query);
            let rows = connection.select(&compiled.text).await?;

            let result = match task.query.specs_ref() {
                None => Value::array(rows.into_iter().filter_map(|row| row.get(&compiled.root_variable.trim_start_matches('?').to_owned()).cloned()).collect()),
                Some(specs) => Value::array(
                    rows.into_iter()
                        .map(|row| {
                            let mut fields = indexmap::IndexMap::new();
                            for column in specs.columns() {
                                let value = row.get(column.name()).cloned().unwrap_or(Value::Nil);
                                fields.insert(column.name().to_owned(), value);
                            }
                            Value::object(fields)
                        })
                        .collect(),
                ),
            };

            let _ = task.reply.send(result);
        }

        Ok(true)
    }

    fn name(&self) -> &'static str {
        "selector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;
    use ldkit_value::Value;

    #[tokio::test]
    async fn each_task_materializes_its_own_query() {
        let selector = Selector::new();
        let property = Property::new("name").forward("p:name");
        let query = Query::new(Value::Nil).limit(10).offset(0);

        let rx = selector.request(false, Some("urn:a".to_owned()), property, query);
        assert_eq!(selector.pending_count(), 1);

        let store = MemoryTripleStore::new();
        let mut row = crate::connection::TupleRow::new();
        row.insert("root".to_owned(), Value::string("alice"));
        store.push_select_response(vec![row]);

        assert!(selector.run(&store).await.unwrap());
        assert_eq!(store.select_log().len(), 1);
        assert_eq!(rx.await.unwrap(), Value::array(vec![Value::string("alice")]));
    }
}
