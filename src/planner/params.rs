//! Search parameters: ordering, grouping and pagination directives

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::{QueryError, QueryResult};
use crate::filter::Filter;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Ordering directive; `field` may be `relation__field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Grouping directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub field: String,
}

/// Limit and offset, independent of each other.
///
/// Zero counts as absent for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    /// No limit, no offset
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window for a 1-based page number
    pub fn for_page(page: u64, per_page: u64) -> Self {
        Self {
            limit: Some(per_page),
            offset: Some(page.saturating_sub(1).saturating_mul(per_page)),
        }
    }

    /// Limit with zero treated as absent
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|n| *n > 0)
    }

    /// Offset with zero treated as absent
    pub fn effective_offset(&self) -> Option<u64> {
        self.offset.filter(|n| *n > 0)
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default)]
    filters: Vec<JsonValue>,
    #[serde(default)]
    order_by: Vec<OrderSpec>,
    #[serde(default)]
    group_by: Vec<GroupSpec>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    offset: Option<u64>,
}

/// A complete search request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchParams {
    /// Top-level filters, combined as a conjunction
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderSpec>,
    pub group_by: Vec<GroupSpec>,
    pub pagination: Pagination,
}

impl SearchParams {
    /// Parses `{filters, order_by, group_by, limit, offset}`; every key is optional
    pub fn from_json(value: &JsonValue) -> QueryResult<Self> {
        let raw: RawSearch = serde_json::from_value(value.clone())
            .map_err(|e| QueryError::MalformedFilter(e.to_string()))?;
        let filters = raw
            .filters
            .iter()
            .map(Filter::from_json)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self {
            filters,
            order_by: raw.order_by,
            group_by: raw.group_by,
            pagination: Pagination::new(raw.limit, raw.offset),
        })
    }

    /// The top-level filters as one filter, if there are any
    pub fn combined_filter(&self) -> Option<Filter> {
        Filter::conjunction(&self.filters)
    }

    pub fn group_fields(&self) -> Vec<String> {
        self.group_by.iter().map(|g| g.field.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let params = SearchParams::from_json(&json!({
            "filters": [{"name": "age", "op": "ge", "val": 18}],
            "order_by": [{"field": "name", "direction": "desc"}, {"field": "id"}],
            "group_by": [{"field": "city"}],
            "limit": 10,
            "offset": 20
        }))
        .unwrap();

        assert_eq!(params.filters.len(), 1);
        assert_eq!(params.order_by, vec![OrderSpec::desc("name"), OrderSpec::asc("id")]);
        assert_eq!(params.group_fields(), vec!["city".to_string()]);
        assert_eq!(params.pagination, Pagination::new(Some(10), Some(20)));
    }

    #[test]
    fn test_empty_request() {
        let params = SearchParams::from_json(&json!({})).unwrap();
        assert_eq!(params, SearchParams::default());
        assert!(params.combined_filter().is_none());
    }

    #[test]
    fn test_multiple_filters_form_conjunction() {
        let params = SearchParams::from_json(&json!({"filters": [
            {"name": "a", "op": "eq", "val": 1},
            {"name": "b", "op": "eq", "val": 2}
        ]}))
        .unwrap();
        assert!(matches!(params.combined_filter(), Some(Filter::And(subs)) if subs.len() == 2));
    }

    #[test]
    fn test_bad_direction_rejected() {
        let result = SearchParams::from_json(&json!({"order_by": [{"field": "a", "direction": "up"}]}));
        assert!(matches!(result, Err(QueryError::MalformedFilter(_))));
    }

    #[test]
    fn test_pagination() {
        assert_eq!(Pagination::for_page(3, 10), Pagination::new(Some(10), Some(20)));
        assert_eq!(Pagination::for_page(0, 10).offset, Some(0));

        let zeros = Pagination::new(Some(0), Some(0));
        assert_eq!(zeros.effective_limit(), None);
        assert_eq!(zeros.effective_offset(), None);
    }
}
