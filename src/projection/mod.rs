//! Projection: include/exclude trees and the serializer
//!
//! A caller controls serialization depth and breadth with a
//! [`ProjectionTree`], parsed from dotted column paths such as
//! `"author.name"`. A request carries an include tree or an exclude tree,
//! never both.
//!
//! # Scope narrowing
//!
//! Each level of serialization sees a [`ProjectionScope`]. Descending into
//! `key`:
//!
//! - an include tree descends into its entry for `key`, and stops (columns
//!   and hybrids only) when there is none
//! - an exclude subtree for `key` takes over and resets the include side to
//!   no opinion
//! - an exclude leaf for `key` drops the key entirely
//!
//! An include tree can restrict depth; an exclude tree only ever trims.

mod options;
mod scope;
mod serializer;
mod tree;

pub use options::SerializeOptions;
pub use scope::{Include, ProjectionScope};
pub use serializer::{serialize, Serializer};
pub use tree::{ProjectionNode, ProjectionTree};
