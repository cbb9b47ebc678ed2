//! Query builder
//!
//! Compiles filter trees and ordering/grouping/paging directives into a
//! [`QueryPlan`]. Any error aborts the compile; no partial plan is returned.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::params::{OrderSpec, Pagination, SearchParams};
use super::plan::{FieldRef, Operand, OrderTerm, Predicate, QueryPlan, Stage};
use crate::errors::{QueryError, QueryResult};
use crate::filter::{Arity, Filter, Leaf, Operator, QuantifierArg};
use crate::model::{coerce_value, Cardinality, FieldType, ModelDescriptor, ModelRegistry};
use crate::observability::{log_event_with_fields, Event};
use crate::value::Value;

/// Compiles requests against the models of one registry
pub struct QueryBuilder<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Compiles a full query: filter, order, group, limit, offset.
    ///
    /// An empty `order` orders by the model's primary key, ascending, in
    /// declared key order.
    pub fn compile(
        &self,
        model: &str,
        filter: Option<&Filter>,
        order: &[OrderSpec],
        group: &[String],
        pagination: Pagination,
    ) -> QueryResult<QueryPlan> {
        self.logged(model, || {
            self.plan(model, filter, Some(order), group, pagination)
        })
    }

    /// Compiles a parsed search request
    pub fn compile_search(&self, model: &str, params: &SearchParams) -> QueryResult<QueryPlan> {
        let filter = params.combined_filter();
        self.compile(
            model,
            filter.as_ref(),
            &params.order_by,
            &params.group_fields(),
            params.pagination,
        )
    }

    /// Filters and ordering only
    pub fn build(&self, model: &str, filters: &[Filter], order: &[OrderSpec]) -> QueryResult<QueryPlan> {
        let filter = Filter::conjunction(filters);
        self.compile(model, filter.as_ref(), order, &[], Pagination::unbounded())
    }

    /// Same as [`compile`](Self::compile) but without any ordering stage,
    /// not even the primary-key default. Used for counting.
    pub fn compile_unordered(
        &self,
        model: &str,
        filter: Option<&Filter>,
        group: &[String],
        pagination: Pagination,
    ) -> QueryResult<QueryPlan> {
        self.logged(model, || self.plan(model, filter, None, group, pagination))
    }

    /// Compiles a filter against `model` without building a plan
    pub fn compile_filter(&self, model: &str, filter: &Filter) -> QueryResult<Predicate> {
        let descriptor = self.registry.get(model)?;
        self.predicate(&descriptor, filter)
    }

    fn logged(
        &self,
        model: &str,
        compile: impl FnOnce() -> QueryResult<QueryPlan>,
    ) -> QueryResult<QueryPlan> {
        let result = compile();
        match &result {
            Ok(plan) => {
                let stages = plan.stages().len().to_string();
                log_event_with_fields(
                    Event::QueryCompiled,
                    &[("model", model), ("stages", stages.as_str())],
                );
            }
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::QueryRejected,
                    &[("model", model), ("code", err.code()), ("reason", reason.as_str())],
                );
            }
        }
        result
    }

    fn plan(
        &self,
        model: &str,
        filter: Option<&Filter>,
        order: Option<&[OrderSpec]>,
        group: &[String],
        pagination: Pagination,
    ) -> QueryResult<QueryPlan> {
        let descriptor = self.registry.get(model)?;
        let mut stages = Vec::new();

        if let Some(filter) = filter {
            stages.push(Stage::Filter(self.predicate(&descriptor, filter)?));
        }

        if let Some(order) = order {
            self.order_stages(&descriptor, order, &mut stages)?;
        }

        for field in group {
            self.registry.scalar_type(&descriptor, field)?;
            stages.push(Stage::GroupBy(field.clone()));
        }

        if let Some(limit) = pagination.effective_limit() {
            stages.push(Stage::Limit(limit));
        }
        if let Some(offset) = pagination.effective_offset() {
            stages.push(Stage::Offset(offset));
        }

        Ok(QueryPlan::new(model, stages))
    }

    fn order_stages(
        &self,
        model: &ModelDescriptor,
        order: &[OrderSpec],
        stages: &mut Vec<Stage>,
    ) -> QueryResult<()> {
        if order.is_empty() {
            for pk in model.primary_key_names() {
                stages.push(Stage::OrderBy(OrderTerm {
                    field: FieldRef::local(pk.as_str()),
                    direction: Default::default(),
                }));
            }
            return Ok(());
        }

        for spec in order {
            let field = match spec.field.split_once("__") {
                Some((relation, name)) => {
                    let related = self.registry.related_model(model, relation)?;
                    self.registry.scalar_type(&related.model, name)?;
                    let already_joined = stages.iter().any(
                        |s| matches!(s, Stage::Join { relation: r, .. } if r == relation),
                    );
                    if !already_joined {
                        stages.push(Stage::Join {
                            relation: relation.to_string(),
                            target: related.model.name().to_string(),
                        });
                    }
                    FieldRef::related(relation, name)
                }
                None => {
                    self.registry.scalar_type(model, &spec.field)?;
                    FieldRef::local(spec.field.as_str())
                }
            };
            stages.push(Stage::OrderBy(OrderTerm {
                field,
                direction: spec.direction,
            }));
        }
        Ok(())
    }

    fn predicate(&self, model: &ModelDescriptor, filter: &Filter) -> QueryResult<Predicate> {
        match filter {
            Filter::Leaf(leaf) => self.leaf(model, leaf),
            Filter::And(subs) => Ok(Predicate::And(self.predicates(model, subs)?)),
            Filter::Or(subs) => Ok(Predicate::Or(self.predicates(model, subs)?)),
        }
    }

    fn predicates(&self, model: &ModelDescriptor, filters: &[Filter]) -> QueryResult<Vec<Predicate>> {
        filters.iter().map(|f| self.predicate(model, f)).collect()
    }

    fn leaf(&self, model: &ModelDescriptor, leaf: &Leaf) -> QueryResult<Predicate> {
        let op = Operator::resolve(&leaf.operator)?;
        check_arity(op, leaf)?;

        let (relation, field) = leaf.path();
        if op.arity() == Arity::Quantifier {
            return self.quantified(model, op, relation, field, leaf);
        }

        match relation {
            None => self.comparison(model, None, field, op, leaf),
            Some(relation) => {
                let related = self.registry.related_model(model, relation)?;
                let inner = self.comparison(&related.model, Some(model), field, op, leaf)?;
                let quantifier = match related.cardinality {
                    Cardinality::Singular => Operator::Has,
                    Cardinality::Collection => Operator::Any,
                };
                Ok(Predicate::Quantified {
                    relation: relation.to_string(),
                    quantifier,
                    cardinality: related.cardinality,
                    predicate: Box::new(inner),
                })
            }
        }
    }

    /// Comparison on `field` of `model`. `outer` is the model owning the
    /// relation when the leaf was reached through a dotted name.
    fn comparison(
        &self,
        model: &ModelDescriptor,
        outer: Option<&ModelDescriptor>,
        field: &str,
        op: Operator,
        leaf: &Leaf,
    ) -> QueryResult<Predicate> {
        let field_type = self.registry.scalar_type(model, field)?;

        if op.arity() == Arity::Unary {
            return Ok(Predicate::Unary {
                field: field.to_string(),
                op,
            });
        }

        let operand = match (&leaf.other_field, &leaf.argument) {
            (Some(other), _) => match outer {
                Some(outer) => {
                    self.registry.scalar_type(outer, other)?;
                    Operand::OuterField(other.clone())
                }
                None => {
                    self.registry.scalar_type(model, other)?;
                    Operand::Field(other.clone())
                }
            },
            (None, Some(argument)) => Operand::Literal(literal(field_type, field, op, argument)?),
            (None, None) => return Err(missing_argument(op)),
        };

        Ok(Predicate::Compare {
            field: field.to_string(),
            op,
            operand,
        })
    }

    fn quantified(
        &self,
        model: &ModelDescriptor,
        quantifier: Operator,
        relation: Option<&str>,
        field: &str,
        leaf: &Leaf,
    ) -> QueryResult<Predicate> {
        // `posts__title` names the relation and the implicit-equality target;
        // a bare `posts` names only the relation
        let (relation, target) = match relation {
            Some(relation) => (relation, Some(field)),
            None => (field, None),
        };
        let related = self.registry.related_model(model, relation)?;

        let argument = leaf
            .argument
            .as_ref()
            .ok_or_else(|| missing_argument(quantifier))?;

        let inner = match QuantifierArg::from_argument(argument)? {
            QuantifierArg::Nested(filter) => self.predicate(&related.model, &filter)?,
            QuantifierArg::ImplicitEquals(value) => {
                let target = match target {
                    Some(name) => name.to_string(),
                    None => first_primary_key(&related.model)?,
                };
                let field_type = self.registry.scalar_type(&related.model, &target)?;
                Predicate::Compare {
                    operand: Operand::Literal(literal(field_type, &target, Operator::Eq, &value)?),
                    field: target,
                    op: Operator::Eq,
                }
            }
        };

        Ok(Predicate::Quantified {
            relation: relation.to_string(),
            quantifier,
            cardinality: related.cardinality,
            predicate: Box::new(inner),
        })
    }
}

/// Literal right-hand side of `op`, coerced to the field's type.
///
/// Patterns are matched against the column's text and stay as sent. A
/// literal that coerces to null (a blank date) is no argument at all.
fn literal(field_type: FieldType, field: &str, op: Operator, argument: &JsonValue) -> QueryResult<Value> {
    if op.is_pattern() {
        return Ok(Value::from(argument.clone()));
    }
    match argument {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| coerce_literal(field_type, field, op, item))
            .collect::<QueryResult<Vec<_>>>()
            .map(Value::List),
        other => coerce_literal(field_type, field, op, other),
    }
}

fn coerce_literal(field_type: FieldType, field: &str, op: Operator, value: &JsonValue) -> QueryResult<Value> {
    let coerced = coerce_value(field_type, field, value)?;
    if coerced.is_null() && !value.is_null() {
        return Err(missing_argument(op));
    }
    Ok(coerced)
}

fn first_primary_key(model: &Arc<ModelDescriptor>) -> QueryResult<String> {
    model.primary_key_names().first().cloned().ok_or_else(|| {
        QueryError::MalformedFilter(format!(
            "model '{}' has no primary key to compare against",
            model.name()
        ))
    })
}

fn missing_argument(op: Operator) -> QueryError {
    QueryError::arity(
        op.as_str(),
        "requires an argument; to compare with null use is_null/is_not_null",
    )
}

/// Rejects argument shapes that do not fit the operator
fn check_arity(op: Operator, leaf: &Leaf) -> QueryResult<()> {
    match op.arity() {
        Arity::Unary if leaf.has_operand() => Err(QueryError::arity(op.as_str(), "takes no argument")),
        Arity::Unary => Ok(()),
        Arity::Binary if !leaf.has_operand() => Err(missing_argument(op)),
        Arity::Binary if op.is_containment() => match (&leaf.other_field, &leaf.argument) {
            (None, Some(JsonValue::Array(_))) => Ok(()),
            _ => Err(QueryError::arity(op.as_str(), "requires a list argument")),
        },
        Arity::Binary => Ok(()),
        Arity::Quantifier if leaf.other_field.is_some() => Err(QueryError::arity(
            op.as_str(),
            "takes a filter or value, not another field",
        )),
        Arity::Quantifier if leaf.argument.is_none() => Err(missing_argument(op)),
        Arity::Quantifier => Ok(()),
    }
}
