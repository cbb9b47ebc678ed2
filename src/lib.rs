//! restquery - filter compilation and projection serialization for generic
//! record models
//!
//! Two engines share one model registry:
//!
//! - the query builder ([`planner`]) compiles a JSON-like boolean filter plus
//!   ordering, grouping and paging into a [`planner::QueryPlan`] that a
//!   [`store::BackingStore`] executes
//! - the serializer ([`projection`]) turns records, collections and scalars
//!   into plain JSON under include/exclude trees
//!
//! HTTP routing, request decoding and response framing are left to the
//! embedding application.

pub mod config;
pub mod errors;
pub mod filter;
pub mod model;
pub mod observability;
pub mod planner;
pub mod projection;
pub mod record;
pub mod store;
pub mod value;

pub use errors::{QueryError, QueryResult, StoreError, StoreResult};
