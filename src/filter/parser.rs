//! Building filter trees from decoded request data

use serde_json::{Map, Value as JsonValue};

use super::ast::{Filter, Leaf, QuantifierArg};
use crate::errors::{QueryError, QueryResult};

impl Filter {
    /// Parses a filter from its JSON-like request form.
    ///
    /// An object with an `or` or `and` key is a junction over the listed
    /// sub-filters; any other object is a leaf with `name`, `op`, and
    /// optionally `val` and `field` (alias `other`).
    pub fn from_json(value: &JsonValue) -> QueryResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            QueryError::MalformedFilter(format!("expected an object, got {}", value))
        })?;

        match (object.get("or"), object.get("and")) {
            (Some(_), Some(_)) => Err(QueryError::MalformedFilter(
                "a junction cannot be both 'or' and 'and'".into(),
            )),
            (Some(subs), None) => Ok(Filter::Or(parse_list("or", subs)?)),
            (None, Some(subs)) => Ok(Filter::And(parse_list("and", subs)?)),
            (None, None) => parse_leaf(object).map(Filter::Leaf),
        }
    }

    /// Parses a list of top-level filters
    pub fn from_json_list(value: &JsonValue) -> QueryResult<Vec<Self>> {
        parse_list("filters", value)
    }
}

impl QuantifierArg {
    /// Classifies a `has`/`any` argument: an object is a nested filter,
    /// anything else is the legacy implicit-equality shorthand.
    pub fn from_argument(argument: &JsonValue) -> QueryResult<Self> {
        if argument.is_object() {
            Filter::from_json(argument).map(QuantifierArg::Nested)
        } else {
            Ok(QuantifierArg::ImplicitEquals(argument.clone()))
        }
    }
}

fn parse_list(key: &str, value: &JsonValue) -> QueryResult<Vec<Filter>> {
    let items = value
        .as_array()
        .ok_or_else(|| QueryError::MalformedFilter(format!("'{}' must be a list", key)))?;
    items.iter().map(Filter::from_json).collect()
}

fn parse_leaf(object: &Map<String, JsonValue>) -> QueryResult<Leaf> {
    let name = required_str(object, "name")?;
    let op = required_str(object, "op")?;

    let mut leaf = Leaf::new(name, op);
    if let Some(val) = object.get("val") {
        leaf = leaf.with_argument(val.clone());
    }

    let other = match (object.get("field"), object.get("other")) {
        (Some(f), _) | (None, Some(f)) => Some(f),
        (None, None) => None,
    };
    match other {
        Some(JsonValue::String(f)) => leaf = leaf.with_other_field(f.as_str()),
        Some(JsonValue::Null) | None => {}
        Some(other) => {
            return Err(QueryError::MalformedFilter(format!(
                "other field must be a name, got {}",
                other
            )))
        }
    }
    Ok(leaf)
}

fn required_str<'a>(object: &'a Map<String, JsonValue>, key: &str) -> QueryResult<&'a str> {
    match object.get(key) {
        Some(JsonValue::String(s)) => Ok(s),
        Some(other) => Err(QueryError::MalformedFilter(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
        None => Err(QueryError::MalformedFilter(format!("missing '{}'", key))),
    }
}
