//! Writer: resolves a model value into concrete resources and schedules
//! their triples on the Updater, cascading through embedded properties
//! (§4.12).
//!
//! Every public operation here is unconditional at the Updater level (it
//! schedules tasks; it does not itself drive the Loader). A caller — the
//! [`crate::store::Store`] facade — joins the returned future against a
//! [`crate::loader::Loader`] so that existence checks and embedded-edge
//! reads resolve before the writes they gate are scheduled.

use std::future::Future;
use std::pin::Pin;

use ldkit_shape::{Property, Shape};
use ldkit_validate::{is_valid, validate};
use ldkit_value::{is_reserved, Value};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::fetcher::Fetcher;
use crate::updater::{Task, Updater};

const RDF_TYPE: &str = "rdf:type";

/// Flattens a Writer input value into its constituent resources: an Array
/// flattens one level, a bare Object or Uri is a single resource, `Nil` is
/// none of them (§4.12 "resolve the input value into a list of resource
/// objects").
fn flatten_resources(value: &Value) -> Vec<&Value> {
    match value {
        Value::Nil => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// The subject id of a resource, whether given as a full `@id`-bearing
/// Object or a bare Uri.
fn resource_id(resource: &Value) -> Option<&str> {
    resource.id().or_else(|| resource.as_uri())
}

/// Every absolute-Uri id reachable from a fetched edge value: an Array of
/// Uris/Objects, or a single one.
fn edge_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(resource_id).map(str::to_owned).collect(),
        other => resource_id(other).map(|s| vec![s.to_owned()]).unwrap_or_default(),
    }
}

/// The RDF object term a property edge triple carries for `item`: the
/// referent's `@id` for an Object, the value itself for a literal.
fn edge_value(item: &Value) -> Option<Value> {
    match item {
        Value::Object(fields) => fields.get("@id").cloned(),
        Value::Nil => None,
        other => Some(other.clone()),
    }
}

/// Synthesizes a `urn:uuid:` id for an embedded child that doesn't carry
/// its own `@id` (§4.12 "synthesize fresh URN-UUID ids for anonymous
/// children").
fn ensure_child_id(item: Value) -> StoreResult<Value> {
    match item {
        Value::Object(mut fields) => {
            if fields.get("@id").and_then(Value::as_uri).is_none() {
                let fresh = Value::uri_absolute(format!("urn:uuid:{}", Uuid::new_v4()))?;
                fields.insert("@id".to_owned(), fresh);
            }
            Ok(Value::Object(fields))
        }
        other => Ok(other),
    }
}

pub struct Writer<'a> {
    fetcher: &'a Fetcher,
    updater: &'a Updater,
}

impl<'a> Writer<'a> {
    pub fn new(fetcher: &'a Fetcher, updater: &'a Updater) -> Writer<'a> {
        Writer { fetcher, updater }
    }

    /// Only when *no* listed resource currently exists; inserts full
    /// object triples and returns the count created, or 0 (all-or-nothing,
    /// Design Note §9 Open Question b).
    pub async fn create(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.check_trace(shape, false, value)?;
        let resources = flatten_resources(value);
        if resources.is_empty() {
            return Ok(0);
        }

        let mut existence = Vec::with_capacity(resources.len());
        for resource in &resources {
            if let Some(id) = resource_id(resource) {
                existence.push(self.fetcher.request_existence(id));
            }
        }
        let mut any_exists = false;
        for rx in existence {
            if rx.await.unwrap_or(Value::Nil).as_bit().unwrap_or(false) {
                any_exists = true;
            }
        }
        if any_exists {
            return Ok(0);
        }

        for resource in &resources {
            self.insert_resource(shape, resource).await?;
        }
        Ok(resources.len() as i64)
    }

    /// Only when *all* listed resources exist. Removes each resource's
    /// non-foreign triples, then inserts the new value.
    pub async fn update(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.check_trace(shape, false, value)?;
        let resources = flatten_resources(value);
        if resources.is_empty() {
            return Ok(0);
        }

        let mut existence = Vec::with_capacity(resources.len());
        for resource in &resources {
            existence.push(resource_id(resource).map(|id| self.fetcher.request_existence(id)));
        }
        let mut all_exist = true;
        for rx in existence {
            match rx {
                Some(rx) => {
                    if !rx.await.unwrap_or(Value::Nil).as_bit().unwrap_or(false) {
                        all_exist = false;
                    }
                }
                None => all_exist = false,
            }
        }
        if !all_exist {
            return Ok(0);
        }

        for resource in &resources {
            let id = resource_id(resource).expect("checked above").to_owned();
            let _ = self.updater.delete(Task { resource: Some(id.clone()), predicate: Some(RDF_TYPE.to_owned()), value: None });
            for property in shape.properties() {
                if property.is_foreign() {
                    continue;
                }
                self.remove_property_edge(&id, property)?;
            }
            self.insert_resource(shape, resource).await?;
        }
        Ok(resources.len() as i64)
    }

    /// For each field present in the input, removes only that property's
    /// triples (cascading embedded referents) and inserts the new value.
    /// Validates in delta mode: fields absent from the input are not
    /// required.
    pub async fn mutate(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.check_trace(shape, true, value)?;
        let resources = flatten_resources(value);
        let mut count = 0;
        for resource in &resources {
            let Some(id) = resource_id(resource) else { continue };
            let Some(fields) = resource.as_object() else { continue };
            for (name, field_value) in fields {
                if is_reserved(name) {
                    continue;
                }
                let Some(property) = shape.property(name) else { continue };
                self.replace_property(id, &property, field_value).await?;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Removes all incident triples of each resource, cascading into
    /// embedded properties' referents.
    pub async fn delete(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        let resources = flatten_resources(value);
        let mut count = 0;
        for resource in &resources {
            if let Some(id) = resource_id(resource) {
                self.delete_resource(shape, id).await?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Unconditional insert: schedules each present field's edge triples
    /// (cascading embedded inserts) without removing anything first.
    pub async fn insert(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        self.check_trace(shape, true, value)?;
        let resources = flatten_resources(value);
        let mut count = 0;
        for resource in &resources {
            if resource_id(resource).is_none() {
                continue;
            }
            let Some(fields) = resource.as_object() else { continue };
            for (name, field_value) in fields {
                if is_reserved(name) || field_value.is_empty() {
                    continue;
                }
                let Some(property) = shape.property(name) else { continue };
                self.insert_property(resource_id(resource).expect("checked above"), &property, field_value).await?;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Unconditional remove: deletes exactly the edge triples named by the
    /// input's present fields, cascading a delete into embedded referents.
    pub async fn remove(&self, shape: &Shape, value: &Value) -> StoreResult<i64> {
        let resources = flatten_resources(value);
        let mut count = 0;
        for resource in &resources {
            let Some(id) = resource_id(resource) else { continue };
            let Some(fields) = resource.as_object() else { continue };
            for (name, field_value) in fields {
                if is_reserved(name) {
                    continue;
                }
                let Some(property) = shape.property(name) else { continue };
                self.remove_property_values(id, &property, field_value).await?;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Runs [`Writer::insert`] then [`Writer::remove`], returning the
    /// larger of the two resource counts touched.
    pub async fn modify(&self, shape: &Shape, insert: &Value, remove: &Value) -> StoreResult<i64> {
        let inserted = self.insert(shape, insert).await?;
        let removed = self.remove(shape, remove).await?;
        Ok(inserted.max(removed))
    }

    // ---- shared cascade helpers -----------------------------------------

    fn check_trace(&self, shape: &Shape, delta: bool, value: &Value) -> StoreResult<()> {
        let trace = validate(shape, delta, value);
        if is_valid(&trace) {
            Ok(())
        } else {
            Err(StoreError::Validation { trace })
        }
    }

    fn insert_resource<'f>(&'f self, shape: &'f Shape, resource: &'f Value) -> Pin<Box<dyn Future<Output = StoreResult<()>> + 'f>> {
        Box::pin(async move {
            let Some(id) = resource_id(resource) else {
                return Err(StoreError::UnsupportedModel { reason: "resource has no @id".to_owned() });
            };

            let mut classes: Vec<&ldkit_shape::Type> = shape.declared_class().into_iter().collect();
            classes.extend(shape.implicit_classes());
            for class in classes {
                let class_uri = Value::uri_absolute(class.uri())?;
                let _ = self.updater.insert(Task {
                    resource: Some(id.to_owned()),
                    predicate: Some(RDF_TYPE.to_owned()),
                    value: Some(class_uri),
                });
            }

            let Some(fields) = resource.as_object() else { return Ok(()) };
            for property in shape.properties() {
                let Some(field_value) = fields.get(property.name()) else { continue };
                if field_value.is_empty() {
                    continue;
                }
                self.insert_property(id, property, field_value).await?;
            }
            Ok(())
        })
    }

    fn insert_property<'f>(&'f self, id: &'f str, property: &'f Property, value: &'f Value) -> Pin<Box<dyn Future<Output = StoreResult<()>> + 'f>> {
        Box::pin(async move {
            let items: Vec<Value> = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };

            for item in items {
                let item = if property.is_embedded() { ensure_child_id(item)? } else { item };

                if let Some(object) = edge_value(&item) {
                    if let Some(predicate) = property.forward_predicate() {
                        let _ = self.updater.insert(Task {
                            resource: Some(id.to_owned()),
                            predicate: Some(predicate.to_owned()),
                            value: Some(object.clone()),
                        });
                    } else if let Some(predicate) = property.reverse_predicate() {
                        if let Some(child_id) = resource_id(&item) {
                            let _ = self.updater.insert(Task {
                                resource: Some(child_id.to_owned()),
                                predicate: Some(predicate.to_owned()),
                                value: Some(Value::uri_absolute(id)?),
                            });
                        }
                    }
                }

                if property.is_embedded() {
                    if let Some(Ok(nested)) = property.nested_shape() {
                        self.insert_resource(&nested, &item).await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Schedules a wildcard removal of every triple this resource holds
    /// for `property`'s predicate(s), in either direction.
    fn remove_property_edge(&self, id: &str, property: &Property) -> StoreResult<()> {
        if let Some(predicate) = property.forward_predicate() {
            let _ = self.updater.delete(Task { resource: Some(id.to_owned()), predicate: Some(predicate.to_owned()), value: None });
        }
        if let Some(predicate) = property.reverse_predicate() {
            let _ = self.updater.delete(Task {
                resource: None,
                predicate: Some(predicate.to_owned()),
                value: Some(Value::uri_absolute(id)?),
            });
        }
        Ok(())
    }

    /// Field-level upsert of a single property: reads (for embedded
    /// cascade), removes the existing edge, then inserts the new value.
    async fn replace_property(&self, id: &str, property: &Property, new_value: &Value) -> StoreResult<()> {
        if property.is_embedded() {
            if let Some(rx) = self.fetcher.request(id, property) {
                let old = rx.await.unwrap_or(Value::Nil);
                if let Some(Ok(nested)) = property.nested_shape() {
                    for child_id in edge_ids(&old) {
                        self.delete_resource(&nested, &child_id).await?;
                    }
                }
            }
        }
        self.remove_property_edge(id, property)?;
        if !new_value.is_empty() {
            self.insert_property(id, property, new_value).await?;
        }
        Ok(())
    }

    /// Removes exactly the edge instances named by `value` (not a
    /// wildcard), cascading a delete into embedded referents.
    fn remove_property_values<'f>(
        &'f self,
        id: &'f str,
        property: &'f Property,
        value: &'f Value,
    ) -> Pin<Box<dyn Future<Output = StoreResult<()>> + 'f>> {
        Box::pin(async move {
            let items: Vec<Value> = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            for item in items {
                let Some(object) = edge_value(&item) else { continue };
                if let Some(predicate) = property.forward_predicate() {
                    let _ = self.updater.delete(Task {
                        resource: Some(id.to_owned()),
                        predicate: Some(predicate.to_owned()),
                        value: Some(object.clone()),
                    });
                } else if let Some(predicate) = property.reverse_predicate() {
                    if let Some(child_id) = resource_id(&item) {
                        let _ = self.updater.delete(Task {
                            resource: Some(child_id.to_owned()),
                            predicate: Some(predicate.to_owned()),
                            value: Some(Value::uri_absolute(id)?),
                        });
                    }
                }
                if property.is_embedded() {
                    if let (Some(Ok(nested)), Some(child_id)) = (property.nested_shape(), resource_id(&item)) {
                        self.delete_resource(&nested, child_id).await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Reads a resource's embedded edges, schedules the wildcard removal
    /// of its own triples, then recurses into each embedded referent.
    fn delete_resource<'f>(&'f self, shape: &'f Shape, id: &'f str) -> Pin<Box<dyn Future<Output = StoreResult<()>> + 'f>> {
        Box::pin(async move {
            let mut embedded_reads = Vec::new();
            for property in shape.properties() {
                if property.is_embedded() {
                    if let Some(rx) = self.fetcher.request(id, property) {
                        embedded_reads.push((property, rx));
                    }
                }
            }

            let _ = self.updater.delete(Task { resource: Some(id.to_owned()), predicate: None, value: None });
            for property in shape.properties() {
                if property.forward_predicate().is_none() {
                    if let Some(predicate) = property.reverse_predicate() {
                        let _ = self.updater.delete(Task {
                            resource: None,
                            predicate: Some(predicate.to_owned()),
                            value: Some(Value::uri_absolute(id)?),
                        });
                    }
                }
            }

            for (property, rx) in embedded_reads {
                let old = rx.await.unwrap_or(Value::Nil);
                if let Some(Ok(nested)) = property.nested_shape() {
                    for child_id in edge_ids(&old) {
                        self.delete_resource(&nested, &child_id).await?;
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;
    use crate::worker::Worker;
    use indexmap::IndexMap;
    use ldkit_shape::NestedShape;

    fn object_with_id(id: &str) -> Value {
        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute(id).unwrap());
        Value::object(fields)
    }

    #[tokio::test]
    async fn create_is_skipped_when_the_resource_already_exists() {
        let fetcher = Fetcher::new();
        let updater = Updater::new();
        let writer = Writer::new(&fetcher, &updater);
        let shape = Shape::new();

        let value = object_with_id("urn:a");
        let create_fut = writer.create(&shape, &value);

        let store = MemoryTripleStore::new();
        let mut row = crate::connection::TupleRow::new();
        row.insert("k".to_owned(), Value::integral(0));
        row.insert("v".to_owned(), Value::Nil);
        store.push_select_response(vec![row]);

        let (count, produced_work) = tokio::join!(create_fut, async {
            tokio::task::yield_now().await;
            fetcher.run(&store).await
        });
        assert!(produced_work.unwrap());
        assert_eq!(count.unwrap(), 0);
        assert_eq!(updater.pending_count(), 0);
    }

    #[tokio::test]
    async fn insert_schedules_class_and_property_triples() {
        let fetcher = Fetcher::new();
        let updater = Updater::new();
        let writer = Writer::new(&fetcher, &updater);

        let name_property = Property::new("name").forward("p:name");
        let shape = Shape::new().clazz(ldkit_shape::Type::new("ex:Person", "http://example.org/Person")).with_property(name_property);

        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute("urn:a").unwrap());
        fields.insert("name".to_owned(), Value::string("alice"));
        let value = Value::object(fields);

        let count = writer.insert(&shape, &value).await.unwrap();
        assert_eq!(count, 1);

        let store = MemoryTripleStore::new();
        assert!(updater.run(&store).await.unwrap());
        let log = store.update_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("INSERT DATA"));
        assert!(log[0].contains("p:name"));
    }

    #[tokio::test]
    async fn embedded_insert_synthesizes_a_urn_uuid_id_for_an_anonymous_child() {
        let fetcher = Fetcher::new();
        let updater = Updater::new();
        let writer = Writer::new(&fetcher, &updater);

        let child_shape = NestedShape::constant(Shape::new());
        let has_property = Property::new("has").forward("p:has").embedded(true).shape(child_shape);
        let shape = Shape::new().with_property(has_property);

        let mut child_fields = IndexMap::new();
        child_fields.insert("label".to_owned(), Value::string("child"));
        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute("urn:a").unwrap());
        fields.insert("has".to_owned(), Value::object(child_fields));
        let value = Value::object(fields);

        writer.insert(&shape, &value).await.unwrap();

        let store = MemoryTripleStore::new();
        assert!(updater.run(&store).await.unwrap());
        let log = store.update_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("p:has"));
        assert!(log[0].contains("urn:uuid:"));
    }

    #[tokio::test]
    async fn delete_cascades_into_an_embedded_referent() {
        let fetcher = Fetcher::new();
        let updater = Updater::new();
        let writer = Writer::new(&fetcher, &updater);

        let child_shape = NestedShape::constant(Shape::new());
        let has_property = Property::new("has").forward("p:has").embedded(true).shape(child_shape);
        let shape = Shape::new().with_property(has_property);

        let store = MemoryTripleStore::new();
        let mut row = crate::connection::TupleRow::new();
        row.insert("k".to_owned(), Value::integral(0));
        row.insert("v".to_owned(), Value::uri_absolute("urn:b").unwrap());
        store.push_select_response(vec![row]);

        let value = object_with_id("urn:a");
        let delete_fut = writer.delete(&shape, &value);

        // Round 1: the fetcher resolves "has"'s referent (urn:b); round 2:
        // the updater flushes both the parent's and the child's deletion,
        // which `delete_resource` only schedules once that read completes.
        let (count, _, _) = tokio::join!(delete_fut, async { fetcher.run(&store).await }, async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            updater.run(&store).await
        });
        assert_eq!(count.unwrap(), 1);

        let log = store.update_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("urn:a"));
        assert!(log[0].contains("urn:b"));
    }

    #[tokio::test]
    async fn mutate_only_touches_fields_present_in_the_input() {
        let fetcher = Fetcher::new();
        let updater = Updater::new();
        let writer = Writer::new(&fetcher, &updater);

        let shape = Shape::new()
            .with_property(Property::new("name").forward("p:name"))
            .with_property(Property::new("age").forward("p:age"));

        let mut fields = IndexMap::new();
        fields.insert("@id".to_owned(), Value::uri_absolute("urn:a").unwrap());
        fields.insert("name".to_owned(), Value::string("alice"));
        let value = Value::object(fields);

        writer.mutate(&shape, &value).await.unwrap();

        let store = MemoryTripleStore::new();
        assert!(updater.run(&store).await.unwrap());
        let log = store.update_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("p:name"));
        assert!(!log[0].contains("p:age"));
    }
}
