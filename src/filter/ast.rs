//! Filter expression tree

use serde_json::Value as JsonValue;

/// A boolean filter over the fields of one model
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Leaf(Leaf),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Leaf comparing `field` against a literal
    pub fn leaf(field: impl Into<String>, operator: impl Into<String>, argument: JsonValue) -> Self {
        Filter::Leaf(Leaf::new(field, operator).with_argument(argument))
    }

    /// Leaf without an argument (`is_null`, `is_not_null`)
    pub fn unary(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Filter::Leaf(Leaf::new(field, operator))
    }

    /// Leaf comparing `field` against another field of the same model
    pub fn against_field(
        field: impl Into<String>,
        operator: impl Into<String>,
        other: impl Into<String>,
    ) -> Self {
        Filter::Leaf(Leaf::new(field, operator).with_other_field(other))
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Joins `filters` with AND; a single filter is returned as is
    pub fn conjunction(filters: &[Filter]) -> Option<Filter> {
        match filters {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Filter::And(many.to_vec())),
        }
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Filter::Leaf(_) => 1,
            Filter::And(subs) | Filter::Or(subs) => subs.iter().map(Filter::leaf_count).sum(),
        }
    }
}

/// A single field/operator/argument comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Field name, optionally `relation__field`
    pub field: String,
    /// Operator name as sent by the caller
    pub operator: String,
    /// Literal right-hand side
    pub argument: Option<JsonValue>,
    /// Field of the same model used as right-hand side instead of `argument`
    pub other_field: Option<String>,
}

impl Leaf {
    pub fn new(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            argument: None,
            other_field: None,
        }
    }

    /// Sets the literal argument; JSON null counts as no argument
    pub fn with_argument(mut self, argument: JsonValue) -> Self {
        self.argument = if argument.is_null() { None } else { Some(argument) };
        self
    }

    pub fn with_other_field(mut self, other: impl Into<String>) -> Self {
        self.other_field = Some(other.into());
        self
    }

    /// Splits `relation__field` on the first `__`.
    ///
    /// Returns `(None, field)` when the name has no relation part.
    pub fn path(&self) -> (Option<&str>, &str) {
        match self.field.split_once("__") {
            Some((relation, field)) => (Some(relation), field),
            None => (None, self.field.as_str()),
        }
    }

    /// Returns true if the leaf carries some right-hand side
    pub fn has_operand(&self) -> bool {
        self.argument.is_some() || self.other_field.is_some()
    }
}

/// Argument of a `has`/`any` quantifier
#[derive(Debug, Clone, PartialEq)]
pub enum QuantifierArg {
    /// Filter evaluated against the related model
    Nested(Filter),
    /// Legacy shorthand: equality against a field of the related model
    ImplicitEquals(JsonValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_splits_on_first_separator() {
        let leaf = Leaf::new("author__address__city", "eq");
        assert_eq!(leaf.path(), (Some("author"), "address__city"));

        let plain = Leaf::new("title", "eq");
        assert_eq!(plain.path(), (None, "title"));
    }

    #[test]
    fn test_null_argument_is_absent() {
        let leaf = Leaf::new("age", "eq").with_argument(json!(null));
        assert!(leaf.argument.is_none());
        assert!(!leaf.has_operand());
    }

    #[test]
    fn test_leaf_count() {
        let filter = Filter::or(vec![
            Filter::and(vec![
                Filter::leaf("age", "lt", json!(20)),
                Filter::leaf("name", "like", json!("%y%")),
            ]),
            Filter::leaf("name", "eq", json!("John")),
        ]);
        assert_eq!(filter.leaf_count(), 3);
    }

    #[test]
    fn test_conjunction() {
        let age = Filter::leaf("age", "lt", json!(20));
        let name = Filter::unary("name", "is_null");
        assert_eq!(Filter::conjunction(&[]), None);
        assert_eq!(Filter::conjunction(&[age.clone()]), Some(age.clone()));
        assert_eq!(
            Filter::conjunction(&[age.clone(), name.clone()]),
            Some(Filter::and(vec![age, name]))
        );
    }
}
