//! Drives a [`Shape`]'s declared constraints over a [`Value`], producing a
//! trace value shaped like the input (§4.3).
//!
//! Trace convention: a constraint failure at the current node is recorded
//! as a string under the reserved `"*"` key; per-index sub-traces (for
//! array elements) and per-field sub-traces (for object properties) are
//! stored under their own keys. An empty trace — pruned down to `Nil` —
//! means the value is valid.

use std::collections::HashSet;

use indexmap::IndexMap;
use ldkit_shape::{Property, Shape};
use ldkit_value::{compare, is_reserved, Locale, Temporal, TemporalAmount, Value};

const LOCAL: &str = "*";

/// Validates `value` against `shape`. In delta mode, `minCount` is waived
/// for altogether-empty containers (partial-update semantics).
#[tracing::instrument(level = "debug", skip(shape, value), fields(delta))]
pub fn validate(shape: &Shape, delta: bool, value: &Value) -> Value {
    validate_scoped(shape, delta, value, true)
}

pub fn is_valid(trace: &Value) -> bool {
    trace.is_empty()
}

fn validate_scoped(shape: &Shape, delta: bool, value: &Value, recurse_properties: bool) -> Value {
    let mut messages = container_messages(shape, delta, value);
    let mut children: IndexMap<String, Value> = IndexMap::new();

    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let item_trace = validate_item(shape, delta, item, recurse_properties);
                if !item_trace.is_empty() {
                    children.insert(index.to_string(), item_trace);
                }
            }
        }
        other => {
            let item_trace = validate_item(shape, delta, other, recurse_properties);
            absorb(item_trace, &mut messages, &mut children);
        }
    }

    for constraint in shape.user_constraints() {
        if let Some(result) = constraint.evaluate(value) {
            absorb(result, &mut messages, &mut children);
        }
    }

    assemble(messages, children)
}

fn container_messages(shape: &Shape, delta: bool, value: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    let count = container_count(value);

    if let Some(min) = shape.min_count_bound() {
        if !(delta && count == 0) && count < min {
            messages.push(format!("minCount({min})"));
        }
    }
    if let Some(max) = shape.max_count_bound() {
        if count > max {
            messages.push(format!("maxCount({max})"));
        }
    }
    if shape.requires_unique_lang() {
        if let Value::Array(items) = value {
            let mut seen = HashSet::new();
            for item in items {
                if let Some((locale, _)) = item.as_text() {
                    if !locale.is_root() && !seen.insert(locale.as_str().to_owned()) {
                        messages.push(format!("uniqueLang({locale})"));
                    }
                }
            }
        }
    }
    if let Some(required) = shape.required_values() {
        let present: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Nil => Vec::new(),
            other => vec![other],
        };
        let missing: Vec<String> =
            required.iter().filter(|r| !present.iter().any(|p| *p == r)).map(|r| r.encode(None)).collect();
        if !missing.is_empty() {
            messages.push(format!("hasValue({})", missing.join(", ")));
        }
    }

    messages
}

fn container_count(value: &Value) -> usize {
    match value {
        Value::Nil => 0,
        Value::Array(items) => items.len(),
        _ => 1,
    }
}

/// Value-level rules (datatype, classes, bounds, length, pattern, `in`,
/// `languageIn`) plus, when `recurse_properties` is set, the `closed` and
/// `properties` rules for an `item` that happens to be an Object.
fn validate_item(shape: &Shape, delta: bool, item: &Value, recurse_properties: bool) -> Value {
    let mut messages = Vec::new();

    if let Some(expected) = shape.datatype_expectation() {
        if !matches_case(item, expected) {
            messages.push(format!("datatype({})", case_label(expected)));
        }
    }

    if (shape.declared_class().is_some() || !shape.implicit_classes().is_empty()) && item.as_object().is_some() {
        let missing = missing_classes(shape, item);
        if !missing.is_empty() {
            messages.push(format!("classes({})", missing.join(", ")));
        }
    }

    if let Some(bound) = shape.min_exclusive_bound() {
        check_bound(item, bound, "minExclusive", false, true, &mut messages);
    }
    if let Some(bound) = shape.max_exclusive_bound() {
        check_bound(item, bound, "maxExclusive", true, true, &mut messages);
    }
    if let Some(bound) = shape.min_inclusive_bound() {
        check_bound(item, bound, "minInclusive", false, false, &mut messages);
    }
    if let Some(bound) = shape.max_inclusive_bound() {
        check_bound(item, bound, "maxInclusive", true, false, &mut messages);
    }

    if let Some(min) = shape.min_length_bound() {
        let len = item.encode(None).chars().count();
        if len < min {
            messages.push(format!("minLength({min})"));
        }
    }
    if let Some(max) = shape.max_length_bound() {
        let len = item.encode(None).chars().count();
        if len > max {
            messages.push(format!("maxLength({max})"));
        }
    }

    if let Some(pattern) = shape.pattern_source() {
        match fancy_regex::Regex::new(pattern) {
            Ok(re) => {
                let text = item.encode(None);
                if !re.is_match(&text).unwrap_or(false) {
                    messages.push(format!("pattern({pattern})"));
                }
            }
            Err(_) => messages.push(format!("pattern({pattern}): invalid regex")),
        }
    }

    if let Some(allowed) = shape.allowed_values() {
        if !allowed.contains(item) {
            messages.push("in".to_string());
        }
    }

    if let Some(langs) = shape.allowed_languages() {
        if let Some((locale, _)) = item.as_text() {
            if !language_allowed(locale, langs) {
                messages.push(format!("languageIn({locale})"));
            }
        }
    }

    let mut fields_trace: IndexMap<String, Value> = IndexMap::new();
    if let Value::Object(fields) = item {
        if shape.is_closed() {
            for name in fields.keys() {
                if !is_reserved(name) && shape.property(name).is_none() {
                    messages.push(format!("closed({name})"));
                }
            }
        }
        if recurse_properties {
            for property in shape.properties() {
                if property.is_hidden() {
                    continue;
                }
                let field_value = fields.get(property.name()).cloned().unwrap_or(Value::Nil);
                let sub_trace = validate_property(property, delta, &field_value);
                if !sub_trace.is_empty() {
                    fields_trace.insert(property.name().to_owned(), sub_trace);
                }
            }
        }
    }

    assemble(messages, fields_trace)
}

fn validate_property(property: &Property, delta: bool, value: &Value) -> Value {
    match property.nested_shape() {
        None => Value::Nil,
        Some(Ok(nested)) => validate_scoped(&nested, delta, value, property.is_embedded()),
        Some(Err(err)) => Value::string(format!("{err}")),
    }
}

fn language_allowed(locale: &Locale, allowed: &[Locale]) -> bool {
    allowed.iter().any(|l| l.as_str() == locale.as_str() || l.as_str() == "*")
}

fn check_bound(value: &Value, bound: &Value, label: &str, is_max: bool, exclusive: bool, messages: &mut Vec<String>) {
    match compare(value, bound) {
        None => messages.push(format!("{label}(incomparable)")),
        Some(ordering) => {
            use std::cmp::Ordering::*;
            let fails = match (is_max, exclusive) {
                (true, true) => ordering != Less,
                (true, false) => ordering == Greater,
                (false, true) => ordering != Greater,
                (false, false) => ordering == Less,
            };
            if fails {
                messages.push(format!("{label}({})", bound.encode(None)));
            }
        }
    }
}

fn missing_classes(shape: &Shape, value: &Value) -> Vec<String> {
    let mut required = Vec::new();
    if let Some(clazz) = shape.declared_class() {
        required.push(clazz);
    }
    required.extend(shape.implicit_classes());
    if required.is_empty() {
        return Vec::new();
    }

    let declared: HashSet<&str> = match value.as_object().and_then(|fields| fields.get("@type")) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_uri).collect(),
        Some(Value::Uri(u)) => std::iter::once(u.as_str()).collect(),
        _ => HashSet::new(),
    };

    required.into_iter().filter(|t| !declared.contains(t.uri())).map(|t| t.curie().to_owned()).collect()
}

fn case_label(v: &Value) -> &'static str {
    match v {
        Value::Nil => "Nil",
        Value::Bit(_) => "Bit",
        Value::Integral(_) => "Integral",
        Value::Floating(_) => "Floating",
        Value::Integer(_) => "Integer",
        Value::Decimal(_) => "Decimal",
        Value::String(_) => "String",
        Value::Uri(_) => "Uri",
        Value::Temporal(t) => temporal_family(t),
        Value::TemporalAmount(t) => temporal_amount_family(t),
        Value::Text(..) => "Text",
        Value::Data(..) => "Data",
        Value::Object(_) => "Object",
        Value::Array(_) => "Array",
        Value::Generic(_) => "Generic",
    }
}

fn temporal_family(t: &Temporal) -> &'static str {
    t.family()
}

fn temporal_amount_family(t: &TemporalAmount) -> &'static str {
    t.family()
}

fn matches_case(value: &Value, expected_model: &Value) -> bool {
    case_label(value) == case_label(expected_model)
}

fn absorb(trace_fragment: Value, messages: &mut Vec<String>, children: &mut IndexMap<String, Value>) {
    if let Value::Object(fields) = trace_fragment {
        for (key, v) in fields {
            if key == LOCAL {
                if let Some(s) = v.as_str() {
                    messages.push(s.to_owned());
                }
            } else {
                children.insert(key, v);
            }
        }
    } else if let Some(s) = trace_fragment.as_str() {
        messages.push(s.to_owned());
    }
}

fn assemble(messages: Vec<String>, children: IndexMap<String, Value>) -> Value {
    let mut trace = IndexMap::new();
    if !messages.is_empty() {
        trace.insert(LOCAL.to_owned(), Value::string(messages.join(" / ")));
    }
    for (key, value) in children {
        trace.insert(key, value);
    }
    Value::object(trace).prune()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;

    #[test]
    fn valid_value_produces_an_empty_trace() {
        let shape = Shape::new().min_count(1).max_count(2);
        let trace = validate(&shape, false, &Value::array(vec![Value::string("xa")]));
        assert!(is_valid(&trace));
    }

    /// S2 — a shape `{minCount:1, maxCount:2, pattern:"^x"}` over `name`
    /// given `{name: ["xa", "yb", "xc"]}` should flag both the container's
    /// maxCount violation and the one non-matching element.
    #[test]
    fn reports_container_and_per_element_failures() {
        let name_shape = Shape::new().min_count(1).max_count(2).pattern("^x");
        let name_property = Property::new("name").forward("p:name").shape(ldkit_shape::NestedShape::constant(name_shape));
        let root_shape = Shape::new().with_property(name_property);

        let mut fields = Map::new();
        fields.insert(
            "name".to_owned(),
            Value::array(vec![Value::string("xa"), Value::string("yb"), Value::string("xc")]),
        );
        let trace = validate(&root_shape, false, &Value::object(fields));

        let name_trace = trace.get_field("name").unwrap();
        let local = name_trace.get_field("*").unwrap();
        assert!(local.as_str().unwrap().contains("maxCount(2)"));

        let element_trace = name_trace.get_field("1").unwrap();
        assert!(element_trace.get_field("*").unwrap().as_str().unwrap().contains("pattern(^x)"));
    }

    #[test]
    fn delta_mode_waives_min_count_for_empty_containers() {
        let shape = Shape::new().min_count(1);
        let trace = validate(&shape, true, &Value::Nil);
        assert!(is_valid(&trace));

        let strict_trace = validate(&shape, false, &Value::Nil);
        assert!(!is_valid(&strict_trace));
    }

    #[test]
    fn closed_shape_rejects_undeclared_fields() {
        let shape = Shape::new().closed(true).with_property(Property::new("name"));
        let mut fields = Map::new();
        fields.insert("name".to_owned(), Value::string("ok"));
        fields.insert("extra".to_owned(), Value::integral(1));
        let trace = validate(&shape, false, &Value::object(fields));
        assert!(trace.get_field("*").unwrap().as_str().unwrap().contains("closed(extra)"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // §8 property 3: validate(shape, v) is empty iff v's element count
        // falls within [minCount, maxCount].
        #[test]
        fn min_max_count_validity_matches_the_bound(len in 0usize..6, min in 0usize..4, max in 0usize..4) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let shape = Shape::new().min_count(min).max_count(max);
            let items: Vec<Value> = (0..len).map(|i| Value::integral(i as i64)).collect();
            let trace = validate(&shape, false, &Value::array(items));
            let within_bounds = len >= min && len <= max;
            prop_assert_eq!(is_valid(&trace), within_bounds);
        }
    }
}
