//! Compiles a `(virtual, id, property, query)` tuple into a single
//! SPARQL-like string plus a structured description of the variables it
//! introduced (§4.6).

use indexmap::IndexMap;
use ldkit_shape::Property;
use ldkit_value::Value;

use crate::flake::Flake;
use crate::model::{Criterion, Expression, Query, Transform};

pub const ROOT: &str = "root";

#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub text: String,
    pub root_variable: String,
    pub variables: IndexMap<String, String>,
}

/// Derives the SPARQL variable name for a dotted path directly from its
/// text, rather than from an incrementing counter: two calls compiling the
/// same query always produce the same variable names.
pub fn path_variable(path: &str) -> String {
    if path.is_empty() {
        format!("?{ROOT}")
    } else {
        format!("?{}", path.replace('.', "_"))
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Uri(uri) => format!("<{uri}>"),
        Value::String(s) => format!("{:?}", s),
        other => format!("{:?}", other.encode(None)),
    }
}

#[tracing::instrument(level = "debug", skip(property, query))]
pub fn compile(is_virtual: bool, id: Option<&str>, property: &Property, query: &Query) -> CompiledQuery {
    let mut variables = IndexMap::new();
    variables.insert(String::new(), path_variable(""));
    let root = path_variable("");

    let mut patterns = Vec::new();

    if !is_virtual {
        if let Some(id) = id {
            match (property.forward_predicate(), property.reverse_predicate()) {
                (Some(forward), _) => patterns.push(format!("<{id}> <{forward}> {root} .")),
                (None, Some(reverse)) => patterns.push(format!("{root} <{reverse}> <{id}> .")),
                (None, None) => {}
            }
        }
    }

    if let Some(Ok(nested)) = property.nested_shape() {
        if let Some(clazz) = nested.declared_class() {
            patterns.push(format!("{root} rdf:type/rdfs:subClassOf* <{}> .", clazz.uri()));
        }
    }

    let flake = Flake::build(query.criteria_map());
    let mut having = Vec::new();
    emit_flake(&flake, &root, "", &mut patterns, &mut having, &mut variables);

    let mut text = String::from("SELECT ");
    text.push_str(&compile_projection(query, &root));
    text.push_str(" WHERE { ");
    text.push_str(&patterns.join(" "));
    text.push_str(" }");

    if let Some(group_by) = compile_group_by(query, &root) {
        text.push(' ');
        text.push_str(&group_by);
    }

    if !having.is_empty() {
        text.push_str(" HAVING (");
        text.push_str(&having.join(" && "));
        text.push(')');
    }

    let order = compile_order(query, &root);
    if !order.is_empty() {
        text.push_str(" ORDER BY ");
        text.push_str(&order.join(" "));
    }

    text.push_str(&format!(" LIMIT {} OFFSET {}", query.limit_value().max(0), query.offset_value().max(0)));

    CompiledQuery { text, root_variable: root, variables }
}

fn emit_flake(
    flake: &Flake,
    parent_variable: &str,
    parent_path: &str,
    patterns: &mut Vec<String>,
    having: &mut Vec<String>,
    variables: &mut IndexMap<String, String>,
) {
    for (expression, criterion) in flake.local() {
        if let Some(clause) = compile_criterion(expression, criterion, parent_variable) {
            if expression.is_aggregate() {
                having.push(clause);
            } else {
                patterns.push(format!("FILTER ({clause})"));
            }
        }
    }

    for (segment, child) in flake.children() {
        let path = if parent_path.is_empty() { segment.clone() } else { format!("{parent_path}.{segment}") };
        let variable = path_variable(&path);
        variables.insert(path.clone(), variable.clone());

        let mut inner = Vec::new();
        inner.push(format!("{parent_variable} <{segment}> {variable} ."));
        emit_flake(child, &variable, &path, &mut inner, having, variables);

        if child.is_required() {
            patterns.extend(inner);
        } else {
            patterns.push(format!("OPTIONAL {{ {} }}", inner.join(" ")));
        }
    }
}

fn compile_criterion(expression: &Expression, criterion: &Criterion, variable: &str) -> Option<String> {
    let target = compile_expression(expression, variable);
    let mut clauses = Vec::new();

    if let Some(v) = &criterion.lt {
        clauses.push(format!("{target} < {}", literal(v)));
    }
    if let Some(v) = &criterion.gt {
        clauses.push(format!("{target} > {}", literal(v)));
    }
    if let Some(v) = &criterion.lte {
        clauses.push(format!("{target} <= {}", literal(v)));
    }
    if let Some(v) = &criterion.gte {
        clauses.push(format!("{target} >= {}", literal(v)));
    }
    if let Some(pattern) = &criterion.like {
        clauses.push(format!("REGEX(STR({target}), {:?}, \"i\")", pattern));
    }
    if let Some(alternatives) = &criterion.any {
        let has_nil = alternatives.contains(&Value::Nil);
        let non_nil: Vec<String> = alternatives.iter().filter(|v| !v.is_empty()).map(literal).collect();
        let in_clause = if non_nil.is_empty() { None } else { Some(format!("{target} IN ({})", non_nil.join(", "))) };
        match (has_nil, in_clause) {
            (true, Some(in_clause)) => clauses.push(format!("(!BOUND({target}) || {in_clause})")),
            (true, None) => clauses.push(format!("!BOUND({target})")),
            (false, Some(in_clause)) => clauses.push(in_clause),
            (false, None) => {}
        }
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" && "))
    }
}

fn compile_expression(expression: &Expression, variable: &str) -> String {
    let base = if expression.path_str().is_empty() { variable.to_owned() } else { path_variable(expression.path_str()) };
    expression.pipeline().iter().fold(base, |acc, transform| match transform {
        Transform::Count => format!("COUNT(DISTINCT {acc})"),
        Transform::Sum => format!("SUM({acc})"),
        Transform::Avg => format!("AVG({acc})"),
        Transform::Min => format!("MIN({acc})"),
        Transform::Max => format!("MAX({acc})"),
        Transform::Computed(name) => format!("{name}({acc})"),
    })
}

fn compile_projection(query: &Query, root: &str) -> String {
    match query.specs_ref() {
        None => format!("DISTINCT {root}"),
        Some(specs) => {
            let columns = specs.columns();
            let any_aggregate = columns.iter().any(|c| c.expression().is_aggregate());

            let projected: Vec<String> = columns
                .iter()
                .map(|column| {
                    let compiled = compile_expression(column.expression(), root);
                    let compiled = if any_aggregate && !column.expression().is_aggregate() {
                        format!("SAMPLE({compiled})")
                    } else {
                        compiled
                    };
                    format!("({compiled} AS ?{})", column.name())
                })
                .collect();

            projected.join(" ")
        }
    }
}

/// `GROUP BY` belongs after the `WHERE` block in SPARQL grammar, not inside
/// the `SELECT` clause — emitted only when a Specs projection mixes
/// aggregate and non-aggregate columns (§4.6 "Projection").
fn compile_group_by(query: &Query, root: &str) -> Option<String> {
    let specs = query.specs_ref()?;
    let columns = specs.columns();
    let any_aggregate = columns.iter().any(|c| c.expression().is_aggregate());
    let any_non_aggregate = columns.iter().any(|c| !c.expression().is_aggregate());
    if !(any_aggregate && any_non_aggregate) {
        return None;
    }

    let group_by: Vec<String> =
        columns.iter().filter(|c| !c.expression().is_aggregate()).map(|c| compile_expression(c.expression(), root)).collect();
    if group_by.is_empty() {
        None
    } else {
        Some(format!("GROUP BY {}", group_by.join(" ")))
    }
}

fn compile_order(query: &Query, root: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut focus_pulls = Vec::new();
    let mut explicit: Vec<(i32, String)> = Vec::new();
    let mut root_has_explicit_order = false;

    for (expression, criterion) in query.criteria_map() {
        if let Some(focus) = &criterion.focus {
            let target = compile_expression(expression, root);
            let alts: Vec<String> = focus.iter().map(literal).collect();
            focus_pulls.push(format!("DESC(IF({target} IN ({}), 1, 0))", alts.join(", ")));
        }
        if let Some(priority) = criterion.order {
            let direction = if priority < 0 { "DESC" } else { "ASC" };
            let target = compile_expression(expression, root);
            let target = if is_wildcard_language_expression(expression) { format!("STR({target})") } else { target };
            if expression.path_str().is_empty() {
                root_has_explicit_order = true;
            }
            explicit.push((priority.abs(), format!("{direction}({target})")));
        }
    }

    explicit.sort_by_key(|(priority, _)| *priority);

    clauses.extend(focus_pulls);
    clauses.extend(explicit.into_iter().map(|(_, clause)| clause));

    if !root_has_explicit_order {
        clauses.push(format!("ASC({root})"));
    }

    clauses
}

fn is_wildcard_language_expression(expression: &Expression) -> bool {
    expression.is_language_wildcard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldkit_shape::Property;

    #[test]
    fn membership_class_and_slice_are_emitted_for_a_plain_lookup() {
        let property = Property::new("name").forward("p:name");
        let query = Query::new(Value::Nil).limit(10).offset(0);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        assert!(compiled.text.contains("<urn:a> <p:name> ?root"));
        assert!(compiled.text.contains("SELECT DISTINCT ?root"));
        assert!(compiled.text.contains("LIMIT 10"));
        assert!(compiled.text.contains("OFFSET 0"));
    }

    #[test]
    fn virtual_queries_skip_the_membership_triple() {
        let property = Property::new("name").forward("p:name");
        let query = Query::new(Value::Nil);

        let compiled = compile(true, Some("urn:a"), &property, &query);

        assert!(!compiled.text.contains("urn:a"));
    }

    #[test]
    fn required_child_flakes_are_not_wrapped_in_optional() {
        let property = Property::new("name").forward("p:name");
        let mut criterion = Criterion::default();
        criterion.gt = Some(Value::integral(0));
        let query = Query::new(Value::Nil).criterion(Expression::path("age"), criterion);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        assert!(compiled.text.contains("?root <age> ?age ."));
        assert!(!compiled.text.contains("OPTIONAL"));
        assert!(compiled.text.contains("FILTER (?age > "));
    }

    #[test]
    fn non_filter_child_flakes_are_wrapped_in_optional() {
        let property = Property::new("name").forward("p:name");
        let mut criterion = Criterion::default();
        criterion.order = Some(1);
        let query = Query::new(Value::Nil).criterion(Expression::path("age"), criterion);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        assert!(compiled.text.contains("OPTIONAL { ?root <age> ?age . }"));
    }

    #[test]
    fn language_wildcard_ordering_compares_the_lexical_form() {
        let property = Property::new("name").forward("p:name");
        let mut criterion = Criterion::default();
        criterion.order = Some(1);
        let expression = Expression::path("label").with_language_wildcard(true);
        let query = Query::new(Value::Nil).criterion(expression, criterion);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        assert!(compiled.text.contains("ASC(STR(?label))"));
    }

    #[test]
    fn mixed_aggregate_specs_emit_group_by_after_where_not_inside_select() {
        use crate::model::{Probe, Specs};

        let property = Property::new("name").forward("p:name");
        let specs = Specs::new(vec![
            Probe::new("category", Expression::path("category"), Value::Nil),
            Probe::new("total", Expression::path("age").with_transform(Transform::Count), Value::Nil),
        ]);
        let query = Query::new(Value::Nil).specs(specs);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        let select_start = compiled.text.find("SELECT ").expect("SELECT clause");
        let where_start = compiled.text.find(" WHERE { ").expect("WHERE clause");
        assert!(!compiled.text[select_start..where_start].contains("GROUP BY"), "GROUP BY must not sit inside the SELECT clause");
        assert!(compiled.text.contains(" } GROUP BY ?category"), "GROUP BY must immediately follow the closed WHERE block");
        assert!(compiled.text.contains("SAMPLE(?category)"));
    }

    #[test]
    fn aggregate_criteria_compile_to_having_not_filter() {
        let property = Property::new("name").forward("p:name");
        let mut criterion = Criterion::default();
        criterion.gt = Some(Value::integral(1));
        let expression = Expression::path("age").with_transform(Transform::Count);
        let query = Query::new(Value::Nil).criterion(expression, criterion);

        let compiled = compile(false, Some("urn:a"), &property, &query);

        assert!(compiled.text.contains("HAVING ("));
        assert!(compiled.text.contains("COUNT(DISTINCT"));
    }
}
