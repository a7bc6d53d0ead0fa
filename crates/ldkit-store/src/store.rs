//! The public facade of §6: wires a [`TripleStoreConnection`] driver to
//! the Loader/Fetcher/Selector/Updater/Retriever/Writer machinery behind
//! one call per operation, each driven to completion before returning.

use std::future::Future;
use std::sync::Arc;

use ldkit_shape::Shape;
use ldkit_value::Value;

use crate::connection::TripleStoreConnection;
use crate::error::StoreResult;
use crate::fetcher::Fetcher;
use crate::loader::Loader;
use crate::retriever::Retriever;
use crate::selector::Selector;
use crate::updater::Updater;
use crate::worker::Worker;
use crate::writer::Writer;

/// Tuning knobs a driver implementation cares about. `default_graph` and
/// `batch_size_hint` are carried through for drivers that scope queries to
/// a named graph or cap statement counts per round; the in-memory test
/// driver ([`crate::testing::MemoryTripleStore`]) ignores both.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub default_graph: Option<String>,
    pub batch_size_hint: usize,
    pub max_rounds: usize,
}

impl Default for StoreConfig {
    fn default() -> StoreConfig {
        StoreConfig { default_graph: None, batch_size_hint: 256, max_rounds: 16 }
    }
}

/// Marker pinned into [`ACTIVE_TRANSACTION`] while a transaction is open.
/// Its only job is to be present or absent; nested `Store` calls observe
/// it through [`Store::transactional`] and skip their own begin/commit.
struct StoreTransaction;

tokio::task_local! {
    static ACTIVE_TRANSACTION: StoreTransaction;
}

/// A single dispatchable unit for [`Store::execute`], mirroring the seven
/// named operations below.
pub enum StoreTask<'a> {
    Retrieve { shape: &'a Shape, id: &'a str, model: &'a Value },
    Create { shape: &'a Shape, value: &'a Value },
    Update { shape: &'a Shape, value: &'a Value },
    Mutate { shape: &'a Shape, value: &'a Value },
    Delete { shape: &'a Shape, value: &'a Value },
    Insert { shape: &'a Shape, value: &'a Value },
    Remove { shape: &'a Shape, value: &'a Value },
    Modify { shape: &'a Shape, insert: &'a Value, remove: &'a Value },
}

pub enum StoreOutcome {
    Retrieved(Value),
    Affected(i64),
}

#[derive(Clone)]
pub struct Store {
    connection: Arc<dyn TripleStoreConnection>,
    config: StoreConfig,
}

impl Store {
    pub fn open(connection: Arc<dyn TripleStoreConnection>, config: StoreConfig) -> Store {
        Store { connection, config }
    }

    /// Dispatches a [`StoreTask`], pinning one transaction across it even
    /// when the task's own method would otherwise open its own.
    pub async fn execute(&self, task: StoreTask<'_>) -> StoreResult<StoreOutcome> {
        self.transactional(async {
            match task {
                StoreTask::Retrieve { shape, id, model } => self.retrieve(shape, id, model).await.map(StoreOutcome::Retrieved),
                StoreTask::Create { shape, value } => self.create(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Update { shape, value } => self.update(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Mutate { shape, value } => self.mutate(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Delete { shape, value } => self.delete(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Insert { shape, value } => self.insert(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Remove { shape, value } => self.remove(shape, value).await.map(StoreOutcome::Affected),
                StoreTask::Modify { shape, insert, remove } => self.modify(shape, insert, remove).await.map(StoreOutcome::Affected),
            }
        })
        .await
    }

    pub async fn retrieve(&self, shape: &Shape, id: &str, model: &Value) -> StoreResult<Value> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let selector = Arc::new(Selector::new());
            let retriever = Retriever::new(fetcher.as_ref(), selector.as_ref());
            let business = retriever.retrieve(shape, Some(id), model);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>, selector.clone() as Arc<dyn Worker>], vec![], business).await
        })
        .await
    }

    pub async fn create(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.create(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn update(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.update(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn mutate(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.mutate(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn delete(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.delete(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn insert(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.insert(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn remove(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.remove(shape, value);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    pub async fn modify(&self, shape: &Shape, insert: &Value, remove: &Value) -> StoreResult<i64> {
        self.transactional(async {
            let fetcher = Arc::new(Fetcher::new());
            let updater = Arc::new(Updater::new());
            let writer = Writer::new(fetcher.as_ref(), updater.as_ref());
            let business = writer.modify(shape, insert, remove);
            self.drive(vec![fetcher.clone() as Arc<dyn Worker>], vec![updater.clone() as Arc<dyn Worker>], business).await
        })
        .await
    }

    async fn drive<T>(
        &self,
        readers: Vec<Arc<dyn Worker>>,
        writers: Vec<Arc<dyn Worker>>,
        business: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        let loader = Loader::new(self.connection.clone(), readers, writers, self.config.max_rounds);
        let (result, _rounds) = tokio::try_join!(business, loader.drive())?;
        Ok(result)
    }

    async fn transactional<T>(&self, body: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        if ACTIVE_TRANSACTION.try_with(|_| ()).is_ok() {
            return body.await;
        }

        self.connection.begin().await?;
        match ACTIVE_TRANSACTION.scope(StoreTransaction, body).await {
            Ok(value) => {
                self.connection.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.connection.rollback().await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;
    use ldkit_shape::Property;
    use indexmap::IndexMap;

    fn store_with(responses: Vec<Vec<crate::connection::TupleRow>>) -> Store {
        let memory = MemoryTripleStore::new();
        for response in responses {
            memory.push_select_response(response);
        }
        Store::open(Arc::new(memory), StoreConfig::default())
    }

    #[tokio::test]
    async fn retrieve_pulls_a_missing_field_through_the_fetcher() {
        let mut row = crate::connection::TupleRow::new();
        row.insert("k".to_owned(), Value::integral(0));
        row.insert("v".to_owned(), Value::string("alice"));
        let store = store_with(vec![vec![row]]);

        let shape = Shape::new().with_property(Property::new("name").forward("p:name"));
        let model = Value::object(IndexMap::new());

        let result = store.retrieve(&shape, "urn:a", &model).await.unwrap();
        assert_eq!(result.get_field("name").unwrap(), Value::array(vec![Value::string("alice")]));
    }

    #[tokio::test]
    async fn create_inserts_when_the_resource_is_absent() {
        // No scripted select response: the existence check sees an empty
        // result set and treats the resource as new.
        let store = store_with(vec![]);
        let shape = Shape::new().with_property(Property::new("name").forward("p:name"));

        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute("urn:a").unwrap());
        fields.insert("name".to_owned(), Value::string("alice"));
        let value = Value::object(fields);

        let count = store.create(&shape, &value).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn execute_dispatches_to_the_matching_operation() {
        let memory = MemoryTripleStore::new();
        let store = Store::open(Arc::new(memory), StoreConfig::default());
        let shape = Shape::new().with_property(Property::new("name").forward("p:name"));

        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute("urn:a").unwrap());
        fields.insert("name".to_owned(), Value::string("alice"));
        let value = Value::object(fields);

        let outcome = store.execute(StoreTask::Create { shape: &shape, value: &value }).await.unwrap();
        assert!(matches!(outcome, StoreOutcome::Affected(1)));
    }
}
