//! Live records
//!
//! An [`Instance`] pairs a model descriptor with the attribute values the
//! backing store has materialized so far. Attributes that are not yet
//! materialized are fetched on demand through an [`AttributeLoader`], which
//! may answer with a concrete value or with a [`LazyQuery`] handle that only
//! runs when forced.
//!
//! Fetching a stored attribute through the loader caches the result on the
//! instance, so a second fetch never goes back to the store. Lazy query
//! handles are never cached; each `all()` is a fresh backend call.

mod instance;
mod lazy;

pub use instance::{Instance, InstanceBuilder};
pub use lazy::{AttributeLoader, LazyQuery, Node};
