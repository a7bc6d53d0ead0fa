//! Shape: an immutable, SHACL-style constraint record (§3, §4.4).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ldkit_value::{Locale, Value};

use crate::property::Property;
use crate::types::Type;

/// A user-supplied validation predicate: returns `None` when the value
/// satisfies the constraint, `Some(trace_fragment)` otherwise (§4.3
/// "constraints").
#[derive(Clone)]
pub struct Constraint(Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>);

impl Constraint {
    pub fn new(f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Constraint {
        Constraint(Arc::new(f))
    }

    pub fn evaluate(&self, value: &Value) -> Option<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constraint(..)")
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    inner: Arc<ShapeInner>,
}

#[derive(Debug, Default)]
struct ShapeInner {
    is_virtual: bool,
    id_property: Option<String>,
    type_property: Option<String>,
    clazz: Option<Type>,
    classes: Vec<Type>,
    datatype: Option<Value>,
    min_exclusive: Option<Value>,
    max_exclusive: Option<Value>,
    min_inclusive: Option<Value>,
    max_inclusive: Option<Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    in_values: Option<Vec<Value>>,
    language_in: Option<Vec<Locale>>,
    unique_lang: bool,
    min_count: Option<usize>,
    max_count: Option<usize>,
    has_value: Option<Vec<Value>>,
    properties: IndexMap<String, Property>,
    constraints: Vec<Constraint>,
    closed: bool,
}

impl Default for Shape {
    fn default() -> Self {
        Shape::new()
    }
}

impl Shape {
    pub fn new() -> Shape {
        Shape { inner: Arc::new(ShapeInner::default()) }
    }

    fn with(&self, f: impl FnOnce(&mut ShapeInner)) -> Shape {
        let mut inner = self.inner.clone_fields();
        f(&mut inner);
        Shape { inner: Arc::new(inner) }
    }

    pub fn is_virtual(&self, virtual_: bool) -> Shape {
        self.with(|i| i.is_virtual = virtual_)
    }

    pub fn id_property(&self, name: impl Into<String>) -> Shape {
        self.with(|i| i.id_property = Some(name.into()))
    }

    pub fn type_property(&self, name: impl Into<String>) -> Shape {
        self.with(|i| i.type_property = Some(name.into()))
    }

    pub fn clazz(&self, clazz: Type) -> Shape {
        self.with(|i| i.clazz = Some(clazz))
    }

    pub fn classes(&self, classes: impl IntoIterator<Item = Type>) -> Shape {
        self.with(|i| i.classes = classes.into_iter().collect())
    }

    pub fn datatype(&self, datatype: Value) -> Shape {
        self.with(|i| i.datatype = Some(datatype))
    }

    pub fn min_exclusive(&self, v: Value) -> Shape {
        self.with(|i| i.min_exclusive = Some(v))
    }

    pub fn max_exclusive(&self, v: Value) -> Shape {
        self.with(|i| i.max_exclusive = Some(v))
    }

    pub fn min_inclusive(&self, v: Value) -> Shape {
        self.with(|i| i.min_inclusive = Some(v))
    }

    pub fn max_inclusive(&self, v: Value) -> Shape {
        self.with(|i| i.max_inclusive = Some(v))
    }

    pub fn min_length(&self, n: usize) -> Shape {
        self.with(|i| i.min_length = Some(n))
    }

    pub fn max_length(&self, n: usize) -> Shape {
        self.with(|i| i.max_length = Some(n))
    }

    pub fn pattern(&self, pattern: impl Into<String>) -> Shape {
        self.with(|i| i.pattern = Some(pattern.into()))
    }

    pub fn in_values(&self, values: impl IntoIterator<Item = Value>) -> Shape {
        self.with(|i| i.in_values = Some(values.into_iter().collect()))
    }

    pub fn language_in(&self, locales: impl IntoIterator<Item = Locale>) -> Shape {
        self.with(|i| i.language_in = Some(locales.into_iter().collect()))
    }

    pub fn unique_lang(&self, v: bool) -> Shape {
        self.with(|i| i.unique_lang = v)
    }

    pub fn min_count(&self, n: usize) -> Shape {
        self.with(|i| i.min_count = Some(n))
    }

    pub fn max_count(&self, n: usize) -> Shape {
        self.with(|i| i.max_count = Some(n))
    }

    pub fn has_value(&self, values: impl IntoIterator<Item = Value>) -> Shape {
        self.with(|i| i.has_value = Some(values.into_iter().collect()))
    }

    pub fn with_property(&self, property: Property) -> Shape {
        self.with(|i| {
            i.properties.insert(property.name().to_owned(), property);
        })
    }

    pub fn constraint(&self, constraint: Constraint) -> Shape {
        self.with(|i| i.constraints.push(constraint))
    }

    pub fn closed(&self, closed: bool) -> Shape {
        self.with(|i| i.closed = closed)
    }

    // ---- accessors ---------------------------------------------------

    pub fn property(&self, name: &str) -> Option<Property> {
        self.inner.properties.get(name).cloned()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.inner.properties.values()
    }

    pub fn is_virtual_shape(&self) -> bool {
        self.inner.is_virtual
    }

    pub fn id_property_name(&self) -> Option<&str> {
        self.inner.id_property.as_deref()
    }

    pub fn type_property_name(&self) -> Option<&str> {
        self.inner.type_property.as_deref()
    }

    pub fn declared_class(&self) -> Option<&Type> {
        self.inner.clazz.as_ref()
    }

    pub fn implicit_classes(&self) -> &[Type] {
        &self.inner.classes
    }

    pub fn datatype_expectation(&self) -> Option<&Value> {
        self.inner.datatype.as_ref()
    }

    pub fn min_exclusive_bound(&self) -> Option<&Value> {
        self.inner.min_exclusive.as_ref()
    }

    pub fn max_exclusive_bound(&self) -> Option<&Value> {
        self.inner.max_exclusive.as_ref()
    }

    pub fn min_inclusive_bound(&self) -> Option<&Value> {
        self.inner.min_inclusive.as_ref()
    }

    pub fn max_inclusive_bound(&self) -> Option<&Value> {
        self.inner.max_inclusive.as_ref()
    }

    pub fn min_length_bound(&self) -> Option<usize> {
        self.inner.min_length
    }

    pub fn max_length_bound(&self) -> Option<usize> {
        self.inner.max_length
    }

    pub fn pattern_source(&self) -> Option<&str> {
        self.inner.pattern.as_deref()
    }

    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.inner.in_values.as_deref()
    }

    pub fn allowed_languages(&self) -> Option<&[Locale]> {
        self.inner.language_in.as_deref()
    }

    pub fn requires_unique_lang(&self) -> bool {
        self.inner.unique_lang
    }

    pub fn min_count_bound(&self) -> Option<usize> {
        self.inner.min_count
    }

    pub fn max_count_bound(&self) -> Option<usize> {
        self.inner.max_count
    }

    pub fn required_values(&self) -> Option<&[Value]> {
        self.inner.has_value.as_deref()
    }

    pub fn user_constraints(&self) -> &[Constraint] {
        &self.inner.constraints
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }
}

impl ShapeInner {
    fn clone_fields(&self) -> ShapeInner {
        ShapeInner {
            is_virtual: self.is_virtual,
            id_property: self.id_property.clone(),
            type_property: self.type_property.clone(),
            clazz: self.clazz.clone(),
            classes: self.classes.clone(),
            datatype: self.datatype.clone(),
            min_exclusive: self.min_exclusive.clone(),
            max_exclusive: self.max_exclusive.clone(),
            min_inclusive: self.min_inclusive.clone(),
            max_inclusive: self.max_inclusive.clone(),
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            in_values: self.in_values.clone(),
            language_in: self.language_in.clone(),
            unique_lang: self.unique_lang,
            min_count: self.min_count,
            max_count: self.max_count,
            has_value: self.has_value.clone(),
            properties: self.properties.clone(),
            constraints: self.constraints.clone(),
            closed: self.closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_are_immutable_and_chainable() {
        let base = Shape::new();
        let named = base.clone().with_property(Property::new("name").forward("p:name"));

        assert!(base.property("name").is_none());
        assert_eq!(named.property("name").unwrap().forward_predicate(), Some("p:name"));
    }

    #[test]
    fn closed_and_class_fields_round_trip() {
        let shape = Shape::new().closed(true).clazz(Type::new("ex:Person", "http://example.org/Person"));
        assert!(shape.is_closed());
        assert_eq!(shape.declared_class().unwrap().curie(), "ex:Person");
    }
}
