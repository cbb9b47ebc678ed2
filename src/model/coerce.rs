//! Coercion of wire values into typed field values
//!
//! Dates arrive as strings and durations as integer seconds; the declared
//! [`FieldType`] decides which conversion applies.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value as JsonValue};

use super::registry::ModelRegistry;
use super::types::{FieldType, ModelDescriptor};
use crate::errors::{QueryError, QueryResult};
use crate::value::Value;

/// Strings resolved to the current time instead of being parsed
pub const CURRENT_TIME_MARKERS: [&str; 3] = ["CURRENT_TIMESTAMP", "CURRENT_DATE", "LOCALTIMESTAMP"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Returns a copy of `values` with date strings and interval seconds turned
/// into typed values according to each field's declared type.
///
/// Fails with `UnknownField` for names the model does not declare.
pub fn strings_to_dates(
    registry: &ModelRegistry,
    model: &ModelDescriptor,
    values: &Map<String, JsonValue>,
) -> QueryResult<BTreeMap<String, Value>> {
    values
        .iter()
        .map(|(name, value)| {
            let field_type = registry.field_type(model, name)?;
            Ok((name.clone(), coerce_value(field_type, name, value)?))
        })
        .collect()
}

/// Coerces a single wire value for a field of the given type
pub fn coerce_value(field_type: FieldType, field: &str, value: &JsonValue) -> QueryResult<Value> {
    match (field_type, value) {
        (FieldType::Date | FieldType::DateTime, JsonValue::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Value::Null);
            }
            let parsed = match current_time(s) {
                Some(now) => now,
                None => parse_datetime(s, field_type).ok_or_else(|| {
                    QueryError::invalid_value(field, format!("'{}' is not a date", s))
                })?,
            };
            Ok(match field_type {
                FieldType::Date => Value::Date(parsed.date()),
                _ => Value::DateTime(parsed),
            })
        }
        (FieldType::Duration, JsonValue::Number(n)) if n.is_i64() => {
            let seconds = n.as_i64().unwrap_or_default();
            Duration::try_seconds(seconds)
                .map(Value::Duration)
                .ok_or_else(|| QueryError::invalid_value(field, "interval out of range"))
        }
        _ => Ok(Value::from(value.clone())),
    }
}

fn current_time(marker: &str) -> Option<NaiveDateTime> {
    match marker {
        "CURRENT_TIMESTAMP" => Some(Utc::now().naive_utc()),
        "CURRENT_DATE" => Some(Utc::now().date_naive().and_time(NaiveTime::MIN)),
        "LOCALTIMESTAMP" => Some(Local::now().naive_local()),
        _ => None,
    }
}

/// Parses a wire date. An offset-bearing instant is normalized to UTC for
/// datetime fields; a date field keeps the calendar day as written.
fn parse_datetime(s: &str, field_type: FieldType) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(match field_type {
            FieldType::Date => dt.naive_local(),
            _ => dt.naive_utc(),
        });
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
