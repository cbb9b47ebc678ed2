//! Per-endpoint API configuration
//!
//! Projection defaults, paging limits and lazy-evaluation flags for one
//! exposed model. Loaded from JSON; every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event};
use crate::planner::Pagination;
use crate::projection::{serialize, ProjectionTree, SerializeOptions};
use crate::value::Value;

/// API configuration for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Name the collection is exposed under (default: the model name)
    #[serde(default)]
    pub collection_name: Option<String>,

    /// Page size when the caller asks for none (default: 10)
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u64,

    /// Upper bound on any page size (default: 100)
    #[serde(default = "default_max_results_per_page")]
    pub max_results_per_page: u64,

    /// Do not run lazy relation queries while serializing
    #[serde(default)]
    pub exclude_queries: bool,

    /// Do not evaluate hybrids while serializing
    #[serde(default)]
    pub exclude_hybrids: bool,

    /// Allowlist of column paths
    #[serde(default)]
    pub include_columns: Option<Vec<String>>,

    /// Allowlist for collection responses (defaults to `include_columns`)
    #[serde(default)]
    pub include_columns_many: Option<Vec<String>>,

    /// Blocklist of column paths
    #[serde(default)]
    pub exclude_columns: Option<Vec<String>>,
}

fn default_results_per_page() -> u64 {
    10
}

fn default_max_results_per_page() -> u64 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            collection_name: None,
            results_per_page: default_results_per_page(),
            max_results_per_page: default_max_results_per_page(),
            exclude_queries: false,
            exclude_hybrids: false,
            include_columns: None,
            include_columns_many: None,
            exclude_columns: None,
        }
    }
}

/// Include and exclude trees resolved for one response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub include: Option<ProjectionTree>,
    pub exclude: Option<ProjectionTree>,
}

impl ApiConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json_str(text: &str) -> QueryResult<Self> {
        let config: ApiConfig =
            serde_json::from_str(text).map_err(|e| QueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[("collection", config.collection_name.as_deref().unwrap_or("-"))],
        );
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            QueryError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Rejects inconsistent settings
    pub fn validate(&self) -> QueryResult<()> {
        if self.exclude_columns.is_some()
            && (self.include_columns.is_some() || self.include_columns_many.is_some())
        {
            return Err(QueryError::ConflictingProjection(
                "cannot configure both include and exclude columns".into(),
            ));
        }
        if self.max_results_per_page == 0 {
            return Err(QueryError::InvalidConfig(
                "max_results_per_page must be positive".into(),
            ));
        }
        if self.results_per_page > self.max_results_per_page {
            return Err(QueryError::InvalidConfig(format!(
                "results_per_page {} exceeds max_results_per_page {}",
                self.results_per_page, self.max_results_per_page
            )));
        }
        Ok(())
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::new(!self.exclude_queries, !self.exclude_hybrids)
    }

    /// Configured allowlist; `many` selects the collection variant
    pub fn include_tree(&self, many: bool) -> Option<ProjectionTree> {
        let columns = if many {
            self.include_columns_many
                .as_ref()
                .or(self.include_columns.as_ref())
        } else {
            self.include_columns.as_ref()
        };
        columns.map(|c| ProjectionTree::parse(c))
    }

    pub fn exclude_tree(&self) -> Option<ProjectionTree> {
        self.exclude_columns.as_ref().map(|c| ProjectionTree::parse(c))
    }

    /// Resolves the trees for a response.
    ///
    /// Columns the caller requested are narrowed by the configured allowlist.
    /// Requesting columns on an endpoint configured with a blocklist is a
    /// conflict.
    pub fn projection_for(&self, requested: Option<&[String]>, many: bool) -> QueryResult<Projection> {
        let exclude = self.exclude_tree();
        let include = match requested {
            None => self.include_tree(many),
            Some(_) if exclude.is_some() => {
                return Err(QueryError::ConflictingProjection(
                    "columns requested on an endpoint with excluded columns".into(),
                ))
            }
            Some(columns) => {
                let requested = ProjectionTree::parse(columns);
                Some(match self.include_tree(many) {
                    Some(allowed) => allowed.combine(&requested),
                    None => requested,
                })
            }
        };
        Ok(Projection { include, exclude })
    }

    /// Serializes `value` with this endpoint's projection and flags
    pub fn render(
        &self,
        value: &Value,
        requested: Option<&[String]>,
        many: bool,
    ) -> QueryResult<JsonValue> {
        let projection = self.projection_for(requested, many)?;
        serialize(
            value,
            projection.include.as_ref(),
            projection.exclude.as_ref(),
            &self.serialize_options(),
        )
    }

    /// Page size for a request, clamped to `max_results_per_page`.
    ///
    /// A missing or zero request gets `results_per_page`.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.results_per_page)
            .min(self.max_results_per_page)
    }

    /// Limit and offset for a 1-based page
    pub fn pagination(&self, page: u64, requested: Option<u64>) -> Pagination {
        Pagination::for_page(page.max(1), self.page_size(requested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.results_per_page, 10);
        assert_eq!(config.max_results_per_page, 100);
        assert_eq!(config.serialize_options(), SerializeOptions::eager());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"collection_name": "people", "exclude_queries": true, "include_columns": ["id", "name"]}}"#
        )
        .unwrap();

        let config = ApiConfig::from_file(file.path()).unwrap();
        assert_eq!(config.collection_name.as_deref(), Some("people"));
        assert_eq!(config.serialize_options(), SerializeOptions::new(false, true));
        assert_eq!(config.include_tree(true), config.include_tree(false));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ApiConfig::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(QueryError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation() {
        let both = r#"{"include_columns": ["a"], "exclude_columns": ["b"]}"#;
        assert!(matches!(
            ApiConfig::from_json_str(both),
            Err(QueryError::ConflictingProjection(_))
        ));

        let zero = r#"{"max_results_per_page": 0}"#;
        assert!(matches!(
            ApiConfig::from_json_str(zero),
            Err(QueryError::InvalidConfig(_))
        ));

        let inverted = r#"{"results_per_page": 50, "max_results_per_page": 20}"#;
        assert!(ApiConfig::from_json_str(inverted).is_err());

        assert!(ApiConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_projection_for() {
        let config = ApiConfig {
            include_columns: Some(vec!["id".into(), "author.name".into()]),
            include_columns_many: Some(vec!["id".into()]),
            ..Default::default()
        };

        let single = config.projection_for(None, false).unwrap();
        assert_eq!(
            single.include.unwrap().to_json(),
            json!({"id": true, "author": {"name": true}})
        );

        let many = config.projection_for(None, true).unwrap();
        assert_eq!(many.include.unwrap().to_json(), json!({"id": true}));

        let requested = vec!["author".to_string(), "secret".to_string()];
        let narrowed = config.projection_for(Some(requested.as_slice()), false).unwrap();
        assert_eq!(
            narrowed.include.unwrap().to_json(),
            json!({"author": {"name": true}})
        );
    }

    #[test]
    fn test_requested_columns_with_blocklist() {
        let config = ApiConfig {
            exclude_columns: Some(vec!["email".into()]),
            ..Default::default()
        };
        assert!(config.projection_for(None, false).unwrap().exclude.is_some());
        let requested = vec!["name".to_string()];
        assert!(config.projection_for(Some(requested.as_slice()), false).is_err());
    }

    #[test]
    fn test_render_plain_value() {
        let config = ApiConfig {
            exclude_columns: Some(vec!["secret".into()]),
            ..Default::default()
        };
        let value = Value::from(json!({"name": "x", "secret": "y"}));
        assert_eq!(config.render(&value, None, false).unwrap(), json!({"name": "x"}));
    }

    #[test]
    fn test_paging() {
        let config = ApiConfig::default();
        assert_eq!(config.page_size(None), 10);
        assert_eq!(config.page_size(Some(0)), 10);
        assert_eq!(config.page_size(Some(500)), 100);
        assert_eq!(config.pagination(3, Some(25)), Pagination::new(Some(25), Some(50)));
        assert_eq!(config.pagination(0, None), Pagination::new(Some(10), Some(0)));
    }
}
