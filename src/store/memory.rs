//! In-memory reference store

use std::collections::HashMap;
use std::sync::Arc;

use super::eval::{attribute, matches, related_records, sort_order};
use super::BackingStore;
use crate::errors::{StoreError, StoreResult};
use crate::observability::{log_event_with_fields, Event};
use crate::planner::{OrderTerm, QueryPlan, SortDirection, Stage};
use crate::record::Instance;
use crate::value::Value;

/// Records held in memory, one collection per model name
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Arc<Instance>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record to the collection of its model
    pub fn insert(&mut self, record: Arc<Instance>) {
        self.collections
            .entry(record.model().name().to_string())
            .or_default()
            .push(record);
    }

    /// Creates an empty collection, so plans over it return no rows instead of failing
    pub fn create_collection(&mut self, model: impl Into<String>) {
        self.collections.entry(model.into()).or_default();
    }

    pub fn len(&self, model: &str) -> usize {
        self.collections.get(model).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    fn run(&self, plan: &QueryPlan) -> StoreResult<Vec<Arc<Instance>>> {
        let mut rows = self
            .collections
            .get(plan.model())
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(plan.model().to_string()))?;

        let mut order: Vec<&OrderTerm> = Vec::new();
        let mut group: Vec<&str> = Vec::new();
        let mut limit = None;
        let mut offset = None;

        for stage in plan.stages() {
            match stage {
                Stage::Filter(predicate) => {
                    let mut kept = Vec::with_capacity(rows.len());
                    for row in rows {
                        if matches(&row, predicate, None)? {
                            kept.push(row);
                        }
                    }
                    rows = kept;
                }
                Stage::Join { relation, .. } => {
                    let mut kept = Vec::with_capacity(rows.len());
                    for row in rows {
                        if !related_records(attribute(&row, relation)?).is_empty() {
                            kept.push(row);
                        }
                    }
                    rows = kept;
                }
                Stage::OrderBy(term) => order.push(term),
                Stage::GroupBy(field) => {
                    // Ordering keys before a group apply before grouping
                    rows = sort_rows(rows, &order)?;
                    order.clear();
                    group.push(field.as_str());
                }
                Stage::Limit(n) => limit = Some(*n),
                Stage::Offset(n) => offset = Some(*n),
            }
        }

        let rows = sort_rows(rows, &order)?;
        let rows = group_rows(rows, &group)?;

        // Limit and offset describe one window: skip first, then take
        let skip = offset.map_or(0, |n| n as usize);
        let take = limit.map_or(usize::MAX, |n| n as usize);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }
}

impl BackingStore for MemoryStore {
    fn execute(&self, plan: &QueryPlan) -> StoreResult<Vec<Arc<Instance>>> {
        let rows = self.run(plan)?;
        let count = rows.len().to_string();
        log_event_with_fields(
            Event::QueryExecuted,
            &[("model", plan.model()), ("rows", count.as_str())],
        );
        Ok(rows)
    }
}

/// Stable multi-key sort; the first term is the primary key
fn sort_rows(rows: Vec<Arc<Instance>>, order: &[&OrderTerm]) -> StoreResult<Vec<Arc<Instance>>> {
    if order.is_empty() {
        return Ok(rows);
    }

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let keys = order
            .iter()
            .map(|term| order_key(&row, term))
            .collect::<StoreResult<Vec<_>>>()?;
        keyed.push((keys, row));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        order
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(term, (x, y))| match term.direction {
                SortDirection::Asc => sort_order(x, y),
                SortDirection::Desc => sort_order(x, y).reverse(),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Sort key of a row; a related field reads the first related record
fn order_key(row: &Instance, term: &OrderTerm) -> StoreResult<Value> {
    match &term.field.relation {
        None => attribute(row, &term.field.name),
        Some(relation) => match related_records(attribute(row, relation)?).first() {
            Some(related) => attribute(related, &term.field.name),
            None => Ok(Value::Null),
        },
    }
}

/// Keeps the first row of every distinct combination of group fields
fn group_rows(rows: Vec<Arc<Instance>>, group: &[&str]) -> StoreResult<Vec<Arc<Instance>>> {
    if group.is_empty() {
        return Ok(rows);
    }

    let mut seen: Vec<Vec<Value>> = Vec::new();
    let mut kept = Vec::new();
    for row in rows {
        let key = group
            .iter()
            .map(|field| attribute(&row, field))
            .collect::<StoreResult<Vec<_>>>()?;
        let duplicate = seen.iter().any(|other| {
            other.len() == key.len() && other.iter().zip(&key).all(|(a, b)| a.loose_eq(b))
        });
        if !duplicate {
            seen.push(key);
            kept.push(row);
        }
    }
    Ok(kept)
}
