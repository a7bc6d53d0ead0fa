//! Walks a model value against a shape, pulling missing property edges
//! through the Fetcher and dispatching embedded query payloads to the
//! Selector (§4.11).
//!
//! A field whose model sub-value is a prepared [`ldkit_query::Query`]
//! threaded through as a [`ldkit_value::Generic`] payload (the use case
//! `Generic` exists for) is dispatched to the Selector instead of being
//! walked as a plain literal.

use std::future::Future;
use std::pin::Pin;

use futures::future::try_join_all;
use indexmap::IndexMap;
use ldkit_shape::{Property, Shape};
use ldkit_value::{Generic, Value};
use tokio::sync::oneshot;

use crate::error::StoreResult;
use crate::fetcher::Fetcher;
use crate::selector::{QueryPayload, Selector};

pub const QUERY_PAYLOAD_TYPE: &str = "ldkit_query::Query";

pub struct Retriever<'a> {
    fetcher: &'a Fetcher,
    selector: &'a Selector,
}

impl<'a> Retriever<'a> {
    pub fn new(fetcher: &'a Fetcher, selector: &'a Selector) -> Retriever<'a> {
        Retriever { fetcher, selector }
    }

    /// Retrieves `model` under `shape`. `id` is the resource at the root
    /// of this retrieval; virtual shapes never consult the Fetcher and
    /// instead prune the model's own literals into synthetic values.
    pub fn retrieve<'f>(
        &'f self,
        shape: &'f Shape,
        id: Option<&'f str>,
        model: &'f Value,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Value>> + 'f>> {
        Box::pin(async move {
            if let Some(payload) = model.as_generic().and_then(Generic::downcast_ref::<QueryPayload>) {
                let receiver = self.selector.request_payload(payload.clone());
                return Ok(receiver.await.unwrap_or(Value::Nil));
            }

            match model {
                // Every item's own fetches are registered with the Fetcher
                // and Selector before any of them is awaited, so N array
                // elements needing the same edge collapse into the single
                // batched query the Loader's next round issues (§4.7, §8
                // property 7), rather than one round trip per element.
                Value::Array(items) => {
                    let retrievals = items.iter().map(|item| self.retrieve(shape, id, item));
                    let results = try_join_all(retrievals).await?;
                    Ok(Value::array(results).prune())
                }
                Value::Object(fields) => self.retrieve_object(shape, id, fields).await,
                other => Ok(other.clone().prune()),
            }
        })
    }

    async fn retrieve_object(&self, shape: &Shape, id: Option<&str>, fields: &IndexMap<String, Value>) -> StoreResult<Value> {
        if shape.is_virtual_shape() {
            return Ok(Value::object(fields.clone()).prune());
        }

        let mut resolved = IndexMap::new();
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            resolved.insert("@id".to_owned(), Value::uri_absolute(id)?);
        }

        // Phase 1: register every property's fetch/selector task without
        // awaiting any of them, so the Fetcher sees the whole object's
        // pending keys as one batch once the Loader's next round runs.
        let mut pending: Vec<(&Property, Option<oneshot::Receiver<Value>>)> = Vec::with_capacity(shape.properties().count());
        for property in shape.properties() {
            if let Some(inline) = fields.get(property.name()) {
                if let Some(payload) = inline.as_generic().and_then(Generic::downcast_ref::<QueryPayload>) {
                    pending.push((property, Some(self.selector.request_payload(payload.clone()))));
                    continue;
                }
            }
            let receiver = id.filter(|id| !id.is_empty()).and_then(|id| self.fetcher.request(id, property));
            pending.push((property, receiver));
        }

        // Phase 2: await each registered task and assemble the result.
        for (property, receiver) in pending {
            let fetched = match receiver {
                Some(receiver) => receiver.await.unwrap_or(Value::Nil),
                None => Value::Nil,
            };

            let value = match (fields.get(property.name()), fetched) {
                (Some(inline), Value::Nil) => inline.clone(),
                (_, fetched_value) => fetched_value,
            };

            if value.is_empty() {
                continue;
            }

            let value = match property.nested_shape() {
                Some(Ok(nested)) => self.retrieve(&nested, None, &value).await?,
                _ => value,
            };

            resolved.insert(property.name().to_owned(), value);
        }

        Ok(Value::object(resolved).prune())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;
    use crate::worker::Worker;
    use ldkit_shape::Property;

    #[tokio::test]
    async fn virtual_shapes_prune_the_model_without_consulting_the_fetcher() {
        let fetcher = Fetcher::new();
        let selector = Selector::new();
        let retriever = Retriever::new(&fetcher, &selector);

        let shape = Shape::default().is_virtual(true);
        let mut fields = IndexMap::new();
        fields.insert("label".to_owned(), Value::string("hello"));
        fields.insert("count".to_owned(), Value::integral(0));
        let model = Value::object(fields);

        let result = retriever.retrieve(&shape, Some("urn:a"), &model).await.unwrap();
        assert_eq!(result.get_field("label").unwrap(), Value::string("hello"));
        assert!(result.get_field("count").unwrap_or(Value::Nil).is_empty());
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn concrete_shapes_pull_missing_fields_through_the_fetcher() {
        let fetcher = Fetcher::new();
        let selector = Selector::new();
        let shape = Shape::default().with_property(Property::new("name").forward("p:name"));
        let retriever = Retriever::new(&fetcher, &selector);

        let model = Value::object(IndexMap::new());
        let retrieval = retriever.retrieve(&shape, Some("urn:a"), &model);

        let store = MemoryTripleStore::new();
        let mut row = crate::connection::TupleRow::new();
        row.insert("k".to_owned(), Value::integral(0));
        row.insert("v".to_owned(), Value::string("alice"));
        store.push_select_response(vec![row]);

        let (result, produced_work) = tokio::join!(retrieval, async {
            // Give the retriever a chance to register its fetch before running it.
            tokio::task::yield_now().await;
            fetcher.run(&store).await
        });
        assert!(produced_work.unwrap());
        let result = result.unwrap();
        assert_eq!(result.get_field("@id").unwrap(), Value::uri_absolute("urn:a").unwrap());
        assert_eq!(result.get_field("name").unwrap(), Value::array(vec![Value::string("alice")]));
    }
}
