//! Operator registry
//!
//! A closed table from operator name to [`Operator`]. Each operator knows how
//! many arguments it takes beyond the field it applies to.

use std::fmt;

use crate::errors::{QueryError, QueryResult};

/// Number of arguments an operator takes beyond the field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Postfix, no argument
    Unary = 0,
    /// One literal or other-field argument
    Binary = 1,
    /// Quantifier over a relation: nested filter plus the field it names
    Quantifier = 2,
}

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    IsNull,
    IsNotNull,
    /// Direction marker; only meaningful for ordering
    Asc,
    /// Direction marker; only meaningful for ordering
    Desc,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    ILike,
    In,
    NotIn,
    Has,
    Any,
}

/// Every accepted spelling, grouped by operator
const NAMES: &[(&str, Operator)] = &[
    ("is_null", Operator::IsNull),
    ("is_not_null", Operator::IsNotNull),
    ("asc", Operator::Asc),
    ("desc", Operator::Desc),
    ("==", Operator::Eq),
    ("eq", Operator::Eq),
    ("equals", Operator::Eq),
    ("equal_to", Operator::Eq),
    ("!=", Operator::Ne),
    ("ne", Operator::Ne),
    ("neq", Operator::Ne),
    ("not_equal_to", Operator::Ne),
    ("does_not_equal", Operator::Ne),
    (">", Operator::Gt),
    ("gt", Operator::Gt),
    ("<", Operator::Lt),
    ("lt", Operator::Lt),
    (">=", Operator::Ge),
    ("ge", Operator::Ge),
    ("gte", Operator::Ge),
    ("geq", Operator::Ge),
    ("<=", Operator::Le),
    ("le", Operator::Le),
    ("lte", Operator::Le),
    ("leq", Operator::Le),
    ("like", Operator::Like),
    ("ilike", Operator::ILike),
    ("in", Operator::In),
    ("not_in", Operator::NotIn),
    ("has", Operator::Has),
    ("any", Operator::Any),
];

impl Operator {
    /// Looks up an operator by any of its spellings
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    /// Looks up an operator, failing with `UnknownOperator`
    pub fn resolve(name: &str) -> QueryResult<Self> {
        Self::from_name(name).ok_or_else(|| QueryError::UnknownOperator(name.to_string()))
    }

    /// All accepted operator names
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMES.iter().map(|(n, _)| *n)
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::IsNull | Operator::IsNotNull | Operator::Asc | Operator::Desc => Arity::Unary,
            Operator::Has | Operator::Any => Arity::Quantifier,
            _ => Arity::Binary,
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::Asc => "asc",
            Operator::Desc => "desc",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Ge => "ge",
            Operator::Le => "le",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Has => "has",
            Operator::Any => "any",
        }
    }

    /// Returns true for `in` / `not_in`, whose argument must be a sequence
    pub fn is_containment(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Returns true for `like` / `ilike`
    pub fn is_pattern(&self) -> bool {
        matches!(self, Operator::Like | Operator::ILike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
