//! Serializer options

use serde::{Deserialize, Serialize};

/// Flags passed unchanged through every level of a serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Materialize unloaded attributes and run lazy relation queries
    #[serde(default)]
    pub execute_lazy: bool,
    /// Evaluate hybrid properties even when `execute_lazy` is off
    #[serde(default)]
    pub execute_hybrids: bool,
}

impl SerializeOptions {
    pub fn new(execute_lazy: bool, execute_hybrids: bool) -> Self {
        Self {
            execute_lazy,
            execute_hybrids,
        }
    }

    /// Everything evaluated
    pub fn eager() -> Self {
        Self::new(true, true)
    }
}
