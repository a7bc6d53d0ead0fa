//! Flake: criteria grouped by the property-path edge they walk, so the
//! planner can emit one graph pattern per edge and decide which ones are
//! `OPTIONAL` (§4.5).

use indexmap::IndexMap;

use crate::model::{Criterion, Expression};

#[derive(Debug, Default)]
pub struct Flake {
    local: Vec<(Expression, Criterion)>,
    children: IndexMap<String, Flake>,
}

impl Flake {
    pub fn build(criteria: &IndexMap<Expression, Criterion>) -> Flake {
        let mut root = Flake::default();
        for (expression, criterion) in criteria {
            root.insert(expression.clone(), criterion.clone());
        }
        root
    }

    fn insert(&mut self, expression: Expression, criterion: Criterion) {
        match expression.split_at_first_segment() {
            None => self.local.push((expression, criterion)),
            Some((head, rest)) => {
                self.children.entry(head).or_default().insert(rest, criterion);
            }
        }
    }

    pub fn local(&self) -> &[(Expression, Criterion)] {
        &self.local
    }

    pub fn children(&self) -> &IndexMap<String, Flake> {
        &self.children
    }

    /// A subtree is required when any *non-aggregate* criterion in it (at
    /// any depth) is a filter (§4.5) — a filter on an aggregate expression
    /// compiles to `HAVING`, not a `WHERE`-clause pattern, so it can't make
    /// the edge itself mandatory. Required subtrees become mandatory graph
    /// patterns; the rest are wrapped in `OPTIONAL` by the planner.
    pub fn is_required(&self) -> bool {
        self.local.iter().any(|(expression, criterion)| !expression.is_aggregate() && criterion.is_filter())
            || self.children.values().any(Flake::is_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldkit_value::Value;

    #[test]
    fn empty_path_criteria_land_in_local() {
        let mut criteria = IndexMap::new();
        criteria.insert(Expression::path(""), Criterion::default());
        let flake = Flake::build(&criteria);
        assert_eq!(flake.local().len(), 1);
        assert!(flake.children().is_empty());
    }

    #[test]
    fn dotted_paths_partition_by_leading_segment() {
        let mut criteria = IndexMap::new();
        criteria.insert(Expression::path("a.b"), Criterion::default());
        criteria.insert(Expression::path("a.c"), Criterion::default());
        criteria.insert(Expression::path("z"), Criterion::default());
        let flake = Flake::build(&criteria);
        assert_eq!(flake.children().len(), 2);
        let a = flake.children().get("a").unwrap();
        assert_eq!(a.children().len(), 2);
        assert!(a.children().contains_key("b"));
        assert!(a.children().contains_key("c"));
    }

    #[test]
    fn required_propagates_up_from_a_filter_anywhere_in_the_subtree() {
        let mut criteria = IndexMap::new();
        let mut filter = Criterion::default();
        filter.gt = Some(Value::integral(1));
        criteria.insert(Expression::path("a.b"), filter);
        let flake = Flake::build(&criteria);
        assert!(flake.is_required());
        assert!(flake.children().get("a").unwrap().is_required());
    }

    #[test]
    fn non_filter_criteria_are_not_required() {
        let mut criteria = IndexMap::new();
        let mut ordering_only = Criterion::default();
        ordering_only.order = Some(1);
        criteria.insert(Expression::path("a"), ordering_only);
        let flake = Flake::build(&criteria);
        assert!(!flake.is_required());
    }

    #[test]
    fn a_filter_on_an_aggregate_expression_does_not_force_the_subtree_required() {
        use crate::model::Transform;

        let mut criteria = IndexMap::new();
        let mut filter = Criterion::default();
        filter.gt = Some(Value::integral(1));
        criteria.insert(Expression::path("age").with_transform(Transform::Count), filter);
        let flake = Flake::build(&criteria);
        assert!(!flake.is_required());
    }

    #[test]
    fn any_excluding_nil_is_a_filter_but_any_including_nil_is_not() {
        let mut excludes_nil = Criterion::default();
        excludes_nil.any = Some(vec![Value::integral(1), Value::integral(2)]);
        assert!(excludes_nil.is_filter());

        let mut includes_nil = Criterion::default();
        includes_nil.any = Some(vec![Value::Nil, Value::integral(2)]);
        assert!(!includes_nil.is_filter());
    }
}
