//! Lazy attribute handles

use std::fmt;
use std::sync::Arc;

use super::instance::Instance;
use crate::errors::StoreResult;
use crate::value::Value;

/// Result of fetching an attribute
#[derive(Debug, Clone)]
pub enum Node {
    /// A concrete value
    Value(Value),
    /// A query-like handle that has not been executed
    Query(LazyQuery),
}

impl Node {
    /// Returns true for an unexecuted query handle
    pub fn is_query(&self) -> bool {
        matches!(self, Node::Query(_))
    }

    /// Converts to a concrete value, executing a query handle if needed
    pub fn into_value(self) -> StoreResult<Value> {
        match self {
            Node::Value(v) => Ok(v),
            Node::Query(q) => q.all().map(Value::List),
        }
    }
}

/// Deferred backend query yielding a sequence of values
#[derive(Clone)]
pub struct LazyQuery {
    label: String,
    fetch: Arc<dyn Fn() -> StoreResult<Vec<Value>> + Send + Sync>,
}

impl LazyQuery {
    pub fn new<F>(label: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> StoreResult<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            fetch: Arc::new(fetch),
        }
    }

    /// What this query loads, for logs
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Executes the query
    pub fn all(&self) -> StoreResult<Vec<Value>> {
        (self.fetch)()
    }
}

impl fmt::Debug for LazyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyQuery").field("label", &self.label).finish()
    }
}

/// Backend hook materializing attributes an instance does not hold yet
pub trait AttributeLoader: Send + Sync {
    fn load(&self, instance: &Instance, name: &str) -> StoreResult<Node>;
}
