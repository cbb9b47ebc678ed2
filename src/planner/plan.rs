//! Compiled query plans
//!
//! A [`QueryPlan`] is an ordered list of [`Stage`]s. The builder always emits
//! them in the fixed order filter, join/order, group, limit, offset, and a
//! store must apply them in exactly that order.

use std::fmt;

use super::params::SortDirection;
use crate::filter::Operator;
use crate::model::Cardinality;
use crate::value::Value;

/// A field of the plan's model, or of a model one relation away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub relation: Option<String>,
    pub name: String,
}

impl FieldRef {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            relation: None,
            name: name.into(),
        }
    }

    pub fn related(relation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation: Some(relation.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Some(relation) => write!(f, "{}.{}", relation, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Another field of the record being tested
    Field(String),
    /// A field of the record that owns the relation being quantified over
    OuterField(String),
}

/// Compiled boolean predicate, scoped to one model
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Binary comparison, pattern match or containment test
    Compare {
        field: String,
        op: Operator,
        operand: Operand,
    },
    /// `is_null`, `is_not_null`, or a direction marker
    Unary { field: String, op: Operator },
    /// `has` / `any` over a relation, with the predicate scoped to the related model
    Quantified {
        relation: String,
        quantifier: Operator,
        cardinality: Cardinality,
        predicate: Box<Predicate>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Number of comparisons in the tree, quantifier bodies included
    pub fn comparison_count(&self) -> usize {
        match self {
            Predicate::Compare { .. } | Predicate::Unary { .. } => 1,
            Predicate::Quantified { predicate, .. } => predicate.comparison_count(),
            Predicate::And(subs) | Predicate::Or(subs) => {
                subs.iter().map(Predicate::comparison_count).sum()
            }
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Predicate::And(subs) | Predicate::Or(subs) if subs.len() > 1)
    }

    fn fmt_junction(f: &mut fmt::Formatter<'_>, subs: &[Predicate], joiner: &str) -> fmt::Result {
        for (i, sub) in subs.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", joiner)?;
            }
            if sub.is_compound() {
                write!(f, "({})", sub)?;
            } else {
                write!(f, "{}", sub)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, operand } => {
                write!(f, "{} {} ", field, operator_symbol(*op))?;
                match operand {
                    Operand::Literal(value) => fmt_literal(f, value),
                    Operand::Field(other) => f.write_str(other),
                    Operand::OuterField(other) => write!(f, "outer.{}", other),
                }
            }
            Predicate::Unary { field, op } => write!(f, "{} {}", field, operator_symbol(*op)),
            Predicate::Quantified {
                relation,
                quantifier,
                predicate,
                ..
            } => write!(f, "{} {} ({})", relation, operator_symbol(*quantifier), predicate),
            Predicate::And(subs) if subs.is_empty() => f.write_str("TRUE"),
            Predicate::Or(subs) if subs.is_empty() => f.write_str("FALSE"),
            Predicate::And(subs) => Self::fmt_junction(f, subs, "AND"),
            Predicate::Or(subs) => Self::fmt_junction(f, subs, "OR"),
        }
    }
}

fn operator_symbol(op: Operator) -> &'static str {
    match op {
        Operator::IsNull => "IS NULL",
        Operator::IsNotNull => "IS NOT NULL",
        Operator::Asc => "ASC",
        Operator::Desc => "DESC",
        Operator::Eq => "=",
        Operator::Ne => "!=",
        Operator::Gt => ">",
        Operator::Lt => "<",
        Operator::Ge => ">=",
        Operator::Le => "<=",
        Operator::Like => "LIKE",
        Operator::ILike => "ILIKE",
        Operator::In => "IN",
        Operator::NotIn => "NOT IN",
        Operator::Has => "HAS",
        Operator::Any => "ANY",
    }
}

fn fmt_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("NULL"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(x) => write!(f, "{}", x),
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Date(d) => write!(f, "'{}'", d),
        Value::DateTime(dt) => write!(f, "'{}'", dt.format("%Y-%m-%dT%H:%M:%S")),
        Value::Time(t) => write!(f, "'{}'", t),
        Value::Duration(d) => write!(f, "{}s", d.num_seconds()),
        Value::Uuid(u) => write!(f, "'{}'", u),
        Value::List(items) => {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_literal(f, item)?;
            }
            f.write_str(")")
        }
        other => write!(f, "<{}>", other.type_name()),
    }
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: FieldRef,
    pub direction: SortDirection,
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str().to_uppercase())
    }
}

/// A single step of a query plan
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Filter(Predicate),
    /// Inner join through a relation, emitted before ordering by a related field
    Join { relation: String, target: String },
    OrderBy(OrderTerm),
    GroupBy(String),
    Limit(u64),
    Offset(u64),
}

impl Stage {
    /// Position of the stage kind in the fixed compile order
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Filter(_) => 0,
            Stage::Join { .. } | Stage::OrderBy(_) => 1,
            Stage::GroupBy(_) => 2,
            Stage::Limit(_) => 3,
            Stage::Offset(_) => 4,
        }
    }
}

/// Executable plan over one model
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    model: String,
    stages: Vec<Stage>,
}

impl QueryPlan {
    pub(crate) fn new(model: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            model: model.into(),
            stages,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The filter predicate, if the plan filters at all
    pub fn predicate(&self) -> Option<&Predicate> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Filter(p) => Some(p),
            _ => None,
        })
    }

    pub fn order_terms(&self) -> Vec<&OrderTerm> {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::OrderBy(term) => Some(term),
                _ => None,
            })
            .collect()
    }

    /// Relations joined for ordering
    pub fn joins(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::Join { relation, .. } => Some(relation.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn group_fields(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::GroupBy(field) => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn limit(&self) -> Option<u64> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Limit(n) => Some(*n),
            _ => None,
        })
    }

    pub fn offset(&self) -> Option<u64> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Offset(n) => Some(*n),
            _ => None,
        })
    }
}
