//! Query, Criterion, Expression, Specs and Probe: the selection-query
//! vocabulary a [`crate::flake::Flake`] groups and the planner compiles
//! (§3, §4.6).

use indexmap::IndexMap;
use ldkit_value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transform {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// A named computation that is neither a recognized aggregate nor the
    /// identity transform, e.g. a store-side computed column.
    Computed(String),
}

impl Transform {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Transform::Count | Transform::Sum | Transform::Avg | Transform::Min | Transform::Max)
    }
}

/// A transform pipeline applied to a property-name path. `pipeline` empty
/// means "the value at `path` itself".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pipeline: Vec<Transform>,
    path: String,
    /// Set when this path targets a property whose shape declares
    /// `languageIn` containing `*`: ordering should compare the lexical
    /// form rather than the tagged literal, since no single language
    /// collation applies.
    language_wildcard: bool,
}

impl Expression {
    pub fn path(path: impl Into<String>) -> Expression {
        Expression { pipeline: Vec::new(), path: path.into(), language_wildcard: false }
    }

    pub fn with_transform(mut self, transform: Transform) -> Expression {
        self.pipeline.push(transform);
        self
    }

    pub fn with_language_wildcard(mut self, language_wildcard: bool) -> Expression {
        self.language_wildcard = language_wildcard;
        self
    }

    pub fn path_str(&self) -> &str {
        &self.path
    }

    pub fn pipeline(&self) -> &[Transform] {
        &self.pipeline
    }

    pub fn is_aggregate(&self) -> bool {
        self.pipeline.iter().any(Transform::is_aggregate)
    }

    pub fn is_computed(&self) -> bool {
        !self.pipeline.is_empty()
    }

    pub fn is_language_wildcard(&self) -> bool {
        self.language_wildcard
    }

    fn rebased(&self, path: String) -> Expression {
        Expression { pipeline: self.pipeline.clone(), path, language_wildcard: self.language_wildcard }
    }
}

/// One selection criterion. A node is *required* (§4.5) when any local
/// criterion is a filter: `lt`/`gt`/`lte`/`gte`/`like`, or an `any` whose
/// alternates exclude `Nil`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criterion {
    pub lt: Option<Value>,
    pub gt: Option<Value>,
    pub lte: Option<Value>,
    pub gte: Option<Value>,
    pub like: Option<String>,
    pub any: Option<Vec<Value>>,
    pub focus: Option<Vec<Value>>,
    /// Signed priority; negative means descending. Absolute value breaks
    /// ties between multiple explicit orderings.
    pub order: Option<i32>,
}

impl Criterion {
    pub fn is_filter(&self) -> bool {
        self.lt.is_some()
            || self.gt.is_some()
            || self.lte.is_some()
            || self.gte.is_some()
            || self.like.is_some()
            || self.any.as_ref().is_some_and(|alts| !alts.contains(&Value::Nil))
    }
}

#[derive(Debug, Clone)]
pub struct Probe {
    name: String,
    expression: Expression,
    model: Value,
}

impl Probe {
    pub fn new(name: impl Into<String>, expression: Expression, model: Value) -> Probe {
        Probe { name: name.into(), expression, model }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn model(&self) -> &Value {
        &self.model
    }
}

#[derive(Debug, Clone, Default)]
pub struct Specs {
    columns: Vec<Probe>,
}

impl Specs {
    pub fn new(columns: Vec<Probe>) -> Specs {
        Specs { columns }
    }

    pub fn columns(&self) -> &[Probe] {
        &self.columns
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    model: Value,
    criteria: IndexMap<Expression, Criterion>,
    specs: Option<Specs>,
    offset: i64,
    limit: i64,
}

impl Query {
    pub fn new(model: Value) -> Query {
        Query { model, criteria: IndexMap::new(), specs: None, offset: 0, limit: -1 }
    }

    pub fn criterion(mut self, expression: Expression, criterion: Criterion) -> Query {
        self.criteria.insert(expression, criterion);
        self
    }

    pub fn specs(mut self, specs: Specs) -> Query {
        self.specs = Some(specs);
        self
    }

    pub fn offset(mut self, offset: i64) -> Query {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: i64) -> Query {
        self.limit = limit;
        self
    }

    pub fn model_value(&self) -> &Value {
        &self.model
    }

    pub fn criteria_map(&self) -> &IndexMap<Expression, Criterion> {
        &self.criteria
    }

    pub fn specs_ref(&self) -> Option<&Specs> {
        self.specs.as_ref()
    }

    pub fn offset_value(&self) -> i64 {
        self.offset
    }

    pub fn limit_value(&self) -> i64 {
        self.limit
    }
}

/// Splits `path` on its leading `.`-separated segment, used by
/// [`crate::flake::Flake::build`] to partition criteria by property edge.
pub(crate) fn split_leading_segment(path: &str) -> Option<(String, String)> {
    if path.is_empty() {
        return None;
    }
    match path.split_once('.') {
        Some((head, rest)) => Some((head.to_owned(), rest.to_owned())),
        None => Some((path.to_owned(), String::new())),
    }
}

impl Expression {
    pub(crate) fn split_at_first_segment(&self) -> Option<(String, Expression)> {
        split_leading_segment(&self.path).map(|(head, rest)| (head, self.rebased(rest)))
    }
}
