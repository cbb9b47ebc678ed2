//! Explain output
//!
//! Produces deterministic, human-readable explain output for a compiled
//! plan or a rejected compile.

use std::fmt;

use super::plan::{QueryPlan, Stage};
use crate::errors::QueryError;

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainPlan {
    /// Whether compilation succeeded
    pub accepted: bool,
    pub model: Option<String>,
    /// Rendered filter predicate
    pub predicate: Option<String>,
    pub joins: Vec<String>,
    pub order: Vec<String>,
    pub group: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a compiled query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let joins = plan
            .stages()
            .iter()
            .filter_map(|stage| match stage {
                Stage::Join { relation, target } => Some(format!("{} -> {}", relation, target)),
                _ => None,
            })
            .collect();

        Self {
            accepted: true,
            model: Some(plan.model().to_string()),
            predicate: plan.predicate().map(ToString::to_string),
            joins,
            order: plan.order_terms().iter().map(ToString::to_string).collect(),
            group: plan.group_fields().iter().map(ToString::to_string).collect(),
            limit: plan.limit(),
            offset: plan.offset(),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a compile error
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            accepted: false,
            model: None,
            predicate: None,
            joins: Vec::new(),
            order: Vec::new(),
            group: Vec::new(),
            limit: None,
            offset: None,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(model) = &self.model {
                writeln!(f, "Model: {}", model)?;
            }
            if let Some(predicate) = &self.predicate {
                writeln!(f, "Filter: {}", predicate)?;
            }
            for join in &self.joins {
                writeln!(f, "Join: {}", join)?;
            }
            if !self.order.is_empty() {
                writeln!(f, "Order: {}", self.order.join(", "))?;
            }
            if !self.group.is_empty() {
                writeln!(f, "Group: {}", self.group.join(", "))?;
            }
            if let Some(limit) = self.limit {
                writeln!(f, "Limit: {}", limit)?;
            }
            if let Some(offset) = self.offset {
                writeln!(f, "Offset: {}", offset)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;
    use crate::planner::plan::{FieldRef, Operand, OrderTerm, Predicate};
    use crate::planner::SortDirection;
    use crate::value::Value;

    #[test]
    fn test_explain_accepted() {
        let plan = QueryPlan::new(
            "person",
            vec![
                Stage::Filter(Predicate::Compare {
                    field: "age".into(),
                    op: Operator::Ge,
                    operand: Operand::Literal(Value::Int(18)),
                }),
                Stage::OrderBy(OrderTerm {
                    field: FieldRef::local("id"),
                    direction: SortDirection::Asc,
                }),
                Stage::Limit(10),
            ],
        );

        let explain = ExplainPlan::from_plan(&plan);
        assert!(explain.accepted);
        assert_eq!(
            explain.to_string(),
            "=== EXPLAIN PLAN ===\n\
             Status: ACCEPTED\n\
             Model: person\n\
             Filter: age >= 18\n\
             Order: id ASC\n\
             Limit: 10\n"
        );
    }

    #[test]
    fn test_explain_rejected() {
        let explain = ExplainPlan::from_error(&QueryError::UnknownOperator("between".into()));
        assert!(!explain.accepted);
        let output = explain.to_string();
        assert!(output.contains("Status: REJECTED"));
        assert!(output.contains("Error Code: RESTQUERY_UNKNOWN_OPERATOR"));
    }

    #[test]
    fn test_explain_deterministic() {
        let plan = QueryPlan::new("person", vec![Stage::GroupBy("city".into())]);
        assert_eq!(
            ExplainPlan::from_plan(&plan).to_string(),
            ExplainPlan::from_plan(&plan).to_string()
        );
    }
}
