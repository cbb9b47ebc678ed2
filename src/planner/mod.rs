//! Query builder subsystem
//!
//! Compiles a [`Filter`](crate::filter::Filter) tree plus ordering, grouping
//! and pagination directives into a [`QueryPlan`] a backing store can run.
//!
//! # Compile order
//!
//! Stages are emitted in a fixed order:
//!
//! 1. filter
//! 2. order (a join precedes ordering by a related field)
//! 3. group
//! 4. limit
//! 5. offset
//!
//! Reordering changes result sets once grouping or limiting meets unordered
//! input, so stores apply stages exactly as listed.
//!
//! With no explicit order, plans order by the primary key ascending, so
//! pagination is deterministic.

mod builder;
mod explain;
mod params;
mod plan;

pub use builder::QueryBuilder;
pub use explain::ExplainPlan;
pub use params::{GroupSpec, OrderSpec, Pagination, SearchParams, SortDirection};
pub use plan::{FieldRef, Operand, OrderTerm, Predicate, QueryPlan, Stage};
