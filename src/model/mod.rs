//! Model introspection
//!
//! Every record type is described once, at registration time, by a
//! [`ModelDescriptor`]: an ordered table of attribute name to attribute kind
//! (scalar column, relation, proxy, hybrid, plain property) plus the ordered
//! primary-key names. Descriptors are immutable after registration and the
//! [`ModelRegistry`] holding them is safe to share across threads.
//!
//! Both the query builder and the serializer consult this table instead of
//! reflecting over live objects.
//!
//! # Candidate order
//!
//! Serialization discovers attributes in this order, first occurrence wins:
//!
//! 1. scalar fields
//! 2. relations
//! 3. proxy properties
//! 4. hybrid properties
//! 5. other properties

mod coerce;
mod registry;
mod types;

pub use coerce::{coerce_value, strings_to_dates, CURRENT_TIME_MARKERS};
pub use registry::{ModelRegistry, RelatedModel};
pub use types::{
    Accessor, AttributeDef, Cardinality, ComputedProperties, FieldType, ModelBuilder,
    ModelDescriptor, ProxyDef, RelationDef,
};
