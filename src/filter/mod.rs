//! Filter expressions
//!
//! A request's boolean filter is a tree of [`Filter`] values: leaf
//! comparisons joined by AND/OR junctions. The tree is built once from the
//! decoded request (see [`Filter::from_json`]) and consumed once by the
//! query builder.
//!
//! # Wire shape
//!
//! ```json
//! {"or": [
//!     {"and": [{"name": "age", "op": "lt", "val": 20},
//!              {"name": "name", "op": "like", "val": "%y%"}]},
//!     {"name": "name", "op": "eq", "val": "John"}
//! ]}
//! ```
//!
//! A leaf compares `name` against the literal `val`, or against another
//! field of the same model given as `field` (alias `other`).
//!
//! Operator names resolve through the fixed [`Operator`] registry; see
//! [`Operator::from_name`] for the accepted spellings.

mod ast;
mod operators;
mod parser;

pub use ast::{Filter, Leaf, QuantifierArg};
pub use operators::{Arity, Operator};
