//! Runtime values held by records
//!
//! A [`Value`] is what a record attribute evaluates to: a scalar, one of the
//! well-known types (temporal, duration, UUID, geometry), a nested mapping or
//! sequence, or another record. Filter literals arrive as JSON and convert
//! into `Value` before they are compared against record data.

mod geometry;
mod types;

pub use geometry::{Coordinate, Geometry};
pub use types::Value;
