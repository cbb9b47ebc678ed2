//! # Errors
//!
//! Every failure of a compile or serialize call is request-scoped: it aborts
//! the call, never the process. Callers map [`QueryError::code`] to whatever
//! response their transport uses.

use thiserror::Error;

/// Result type for compile and serialize operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for backing store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the query builder, the serializer and their helpers
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    // ==================
    // Introspection
    // ==================
    /// Referenced field or relation does not exist on the model
    #[error("Unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// Model name is not registered
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    // ==================
    // Filters
    // ==================
    /// Operator name is not in the registry
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Operator invoked with the wrong argument shape
    #[error("Operator '{operator}' {reason}")]
    ArityMismatch { operator: String, reason: String },

    /// Filter request is structurally invalid
    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    /// Literal could not be coerced to the field's type
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    // ==================
    // Projection
    // ==================
    /// Include and exclude supplied for the same scope
    #[error("Cannot specify both include and exclude: {0}")]
    ConflictingProjection(String),

    /// Value needs introspection but is not a model record
    #[error("Could not convert {0} to a plain value")]
    NotARecord(String),

    // ==================
    // Configuration
    // ==================
    /// API configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================
    // Backing store
    // ==================
    /// Failure reported by the backing store, passed through untouched
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Create an unknown field error
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        QueryError::UnknownField {
            model: model.into(),
            field: field.into(),
        }
    }

    /// Create an arity mismatch error
    pub fn arity(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::ArityMismatch {
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownField { .. } => "RESTQUERY_UNKNOWN_FIELD",
            QueryError::UnknownModel(_) => "RESTQUERY_UNKNOWN_MODEL",
            QueryError::UnknownOperator(_) => "RESTQUERY_UNKNOWN_OPERATOR",
            QueryError::ArityMismatch { .. } => "RESTQUERY_ARITY_MISMATCH",
            QueryError::MalformedFilter(_) => "RESTQUERY_MALFORMED_FILTER",
            QueryError::InvalidValue { .. } => "RESTQUERY_INVALID_VALUE",
            QueryError::ConflictingProjection(_) => "RESTQUERY_CONFLICTING_PROJECTION",
            QueryError::NotARecord(_) => "RESTQUERY_NOT_A_RECORD",
            QueryError::InvalidConfig(_) => "RESTQUERY_INVALID_CONFIG",
            QueryError::Store(_) => "RESTQUERY_STORE_FAILED",
        }
    }

    /// Returns true if the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            QueryError::Store(_) | QueryError::InvalidConfig(_) | QueryError::NotARecord(_)
        )
    }
}

/// Errors reported by a backing store
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Collection for the model does not exist in the store
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Lazy attribute could not be materialized
    #[error("Failed to load '{attribute}': {reason}")]
    LoadFailed { attribute: String, reason: String },

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}
