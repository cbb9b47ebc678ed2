//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use tracing::Level;

/// Observable events in restquery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// API configuration loaded and validated
    ConfigLoaded,

    // Query operations
    /// Filter, order, group and paging compiled into a plan
    QueryCompiled,
    /// Compile aborted
    QueryRejected,
    /// Plan executed by a store
    QueryExecuted,

    // Serialization
    /// Serialization of a top-level value begins
    SerializeBegin,
    /// Serialization finished
    SerializeComplete,
    /// Serialization aborted
    SerializeRejected,

    // Records
    /// Unmaterialized attribute loaded from the store
    LazyAttributeLoaded,
}

impl Event {
    /// Returns the event name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::QueryCompiled => "QUERY_COMPILED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::SerializeBegin => "SERIALIZE_BEGIN",
            Event::SerializeComplete => "SERIALIZE_COMPLETE",
            Event::SerializeRejected => "SERIALIZE_REJECTED",
            Event::LazyAttributeLoaded => "LAZY_ATTRIBUTE_LOADED",
        }
    }

    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            Event::ConfigLoaded => Level::INFO,
            Event::QueryRejected | Event::SerializeRejected => Level::WARN,
            Event::QueryCompiled | Event::QueryExecuted | Event::LazyAttributeLoaded => {
                Level::DEBUG
            }
            Event::SerializeBegin | Event::SerializeComplete => Level::TRACE,
        }
    }

    /// Returns true for events reporting an aborted call
    pub fn is_rejection(&self) -> bool {
        matches!(self, Event::QueryRejected | Event::SerializeRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueryCompiled.as_str(), "QUERY_COMPILED");
        assert_eq!(Event::SerializeRejected.to_string(), "SERIALIZE_REJECTED");
    }

    #[test]
    fn test_rejections_warn() {
        assert!(Event::QueryRejected.is_rejection());
        assert_eq!(Event::QueryRejected.level(), Level::WARN);
        assert!(!Event::QueryCompiled.is_rejection());
    }
}
