//! Batched triple-pattern reads (§4.7). Callers register a key and get
//! back a future immediately; the next Loader round snapshots every
//! pending key, emits one UNION tuple query, and completes every future
//! from the grouped result rows.

use std::mem;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use ldkit_shape::Property;
use ldkit_value::Value;
use tokio::sync::oneshot;

use crate::connection::TripleStoreConnection;
use crate::error::StoreError;
use crate::worker::Worker;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FetchKey {
    SubjectExistence(String),
    ObjectExistence(String),
    Forward { resource: String, predicate: String },
    Reverse { resource: String, predicate: String },
}

impl FetchKey {
    fn is_existence(&self) -> bool {
        matches!(self, FetchKey::SubjectExistence(_) | FetchKey::ObjectExistence(_))
    }

    fn values_row(&self, index: usize) -> String {
        match self {
            FetchKey::SubjectExistence(resource) => format!("({index} <{resource}> UNDEF false)"),
            FetchKey::ObjectExistence(resource) => format!("({index} <{resource}> UNDEF true)"),
            FetchKey::Forward { resource, predicate } => format!("({index} <{resource}> <{predicate}> false)"),
            FetchKey::Reverse { resource, predicate } => format!("({index} <{resource}> <{predicate}> true)"),
        }
    }
}

#[derive(Default)]
pub struct Fetcher {
    pending: Mutex<IndexMap<FetchKey, Vec<oneshot::Sender<Value>>>>,
}

impl Fetcher {
    pub fn new() -> Fetcher {
        Fetcher::default()
    }

    /// A boolean existence future for `id` as a subject.
    pub fn request_existence(&self, id: impl Into<String>) -> oneshot::Receiver<Value> {
        self.register(FetchKey::SubjectExistence(id.into()))
    }

    /// A boolean existence future for `id` as an object.
    pub fn request_reverse_existence(&self, id: impl Into<String>) -> oneshot::Receiver<Value> {
        self.register(FetchKey::ObjectExistence(id.into()))
    }

    /// A future of the values reachable from `id` along `property`'s
    /// forward or reverse predicate. `None` if the property declares
    /// neither direction.
    pub fn request(&self, id: &str, property: &Property) -> Option<oneshot::Receiver<Value>> {
        let key = match (property.forward_predicate(), property.reverse_predicate()) {
            (Some(predicate), _) => FetchKey::Forward { resource: id.to_owned(), predicate: predicate.to_owned() },
            (None, Some(predicate)) => FetchKey::Reverse { resource: id.to_owned(), predicate: predicate.to_owned() },
            (None, None) => return None,
        };
        Some(self.register(key))
    }

    fn register(&self, key: FetchKey) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().entry(key).or_default().push(tx);
        rx
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[async_trait]
impl Worker for Fetcher {
    #[tracing::instrument(level = "debug", skip(self, connection))]
    async fn run(&self, connection: &dyn TripleStoreConnection) -> Result<bool, StoreError> {
        let batch: IndexMap<FetchKey, Vec<oneshot::Sender<Value>>> = {
            let mut guard = self.pending.lock().unwrap();
            mem::take(&mut *guard)
        };
        if batch.is_empty() {
            return Ok(false);
        }

        let keys: Vec<FetchKey> = batch.keys().cloned().collect();
        let values_rows: Vec<String> = keys.iter().enumerate().map(|(index, key)| key.values_row(index)).collect();
        let query = format!(
            "SELECT ?k ?i ?p ?v ?r WHERE {{ VALUES (?k ?i ?p ?r) {{ {} }} \
             {{ ?i ?p ?v . }} UNION {{ ?v ?p ?i . }} }}",
            values_rows.join(" ")
        );

        let rows = connection.select(&query).await?;

        let mut grouped: IndexMap<usize, Vec<Value>> = IndexMap::new();
        for row in rows {
            let index = match row.get("k").and_then(Value::as_i64) {
                Some(k) => k as usize,
                None => continue,
            };
            if let Some(value) = row.get("v") {
                grouped.entry(index).or_default().push(value.clone());
            }
        }

        for (index, (key, senders)) in batch.into_iter().enumerate() {
            let matched = grouped.remove(&index).unwrap_or_default();
            let result = if key.is_existence() {
                Value::bit(!matched.is_empty())
            } else if matched.is_empty() {
                Value::Nil
            } else {
                Value::array(matched)
            };
            for sender in senders {
                let _ = sender.send(result.clone());
            }
        }

        Ok(true)
    }

    fn name(&self) -> &'static str {
        "fetcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;

    #[tokio::test]
    async fn four_distinct_keys_complete_in_one_batched_query() {
        let fetcher = Fetcher::new();
        let property = Property::new("name").forward("p:name");

        let rx_a = fetcher.request("urn:a", &property).unwrap();
        let rx_b = fetcher.request("urn:b", &property).unwrap();
        let rx_c = fetcher.request("urn:c", &property).unwrap();
        let rx_d = fetcher.request_existence("urn:e");

        assert_eq!(fetcher.pending_count(), 4);

        let store = MemoryTripleStore::new();
        let mut row = crate::connection::TupleRow::new();
        row.insert("k".to_owned(), Value::integral(0));
        row.insert("v".to_owned(), Value::string("alice"));
        store.push_select_response(vec![row]);

        let produced_work = fetcher.run(&store).await.unwrap();
        assert!(produced_work);

        assert_eq!(store.select_log().len(), 1);
        assert_eq!(store.select_log()[0].matches("(0 ").count(), 1);
        assert!(store.select_log()[0].contains("VALUES (?k ?i ?p ?r)"));

        assert_eq!(rx_a.await.unwrap(), Value::array(vec![Value::string("alice")]));
        assert_eq!(rx_b.await.unwrap(), Value::Nil);
        assert_eq!(rx_c.await.unwrap(), Value::Nil);
        assert_eq!(rx_d.await.unwrap(), Value::bit(false));
    }

    #[tokio::test]
    async fn empty_batch_reports_no_work() {
        let fetcher = Fetcher::new();
        let store = MemoryTripleStore::new();
        assert!(!fetcher.run(&store).await.unwrap());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::MemoryTripleStore;
    use proptest::prelude::*;

    proptest! {
        // §8 property 7: for any number of distinct existence keys, one
        // batched run completes all of them; a store with no matching
        // rows (unreachable keys) completes every one with Nil/false.
        #[test]
        fn one_run_completes_every_pending_existence_key(ids in prop::collection::vec("[a-z]{1,6}", 1..8)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let fetcher = Fetcher::new();
                let receivers: Vec<_> = ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| fetcher.request_existence(format!("urn:{id}-{i}")))
                    .collect();

                let store = MemoryTripleStore::new();
                let produced_work = fetcher.run(&store).await.unwrap();
                prop_assert!(produced_work);

                for rx in receivers {
                    prop_assert_eq!(rx.await.unwrap(), Value::bit(false));
                }
                Ok(())
            })?;
        }
    }
}
