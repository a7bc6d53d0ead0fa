//! The triple store driver contract of §6: connection lifecycle, quad
//! mutation, and SPARQL 1.1 tuple query/update execution.

use async_trait::async_trait;
use indexmap::IndexMap;
use ldkit_value::Value;

use crate::error::DriverError;

/// One `(subject, predicate, object, graph?)` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    pub object: Value,
    pub graph: Option<String>,
}

impl Quad {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Value) -> Quad {
        Quad { subject: subject.into(), predicate: predicate.into(), object, graph: None }
    }

    pub fn in_graph(mut self, graph: impl Into<String>) -> Quad {
        self.graph = Some(graph.into());
        self
    }
}

/// One row of a SPARQL 1.1 SELECT result, keyed by binding name (without
/// the leading `?`).
pub type TupleRow = IndexMap<String, Value>;

#[async_trait]
pub trait TripleStoreConnection: Send + Sync {
    async fn begin(&self) -> Result<(), DriverError>;
    async fn commit(&self) -> Result<(), DriverError>;
    async fn rollback(&self) -> Result<(), DriverError>;

    async fn add_quad(&self, quad: Quad) -> Result<(), DriverError>;
    async fn remove_quad(&self, quad: Quad) -> Result<(), DriverError>;

    /// Executes a SPARQL 1.1 SELECT, returning its result rows.
    async fn select(&self, query: &str) -> Result<Vec<TupleRow>, DriverError>;

    /// Executes a SPARQL 1.1 UPDATE (DELETE WHERE / INSERT DATA, etc).
    async fn update(&self, update: &str) -> Result<(), DriverError>;
}
