//! Projection serializer
//!
//! Converts runtime values into plain JSON values. Each value is classified
//! by the first matching rule:
//!
//! 1. null
//! 2. bool, number, string
//! 3. date, datetime, time as ISO-8601 text
//! 4. geometry as a `{type, coordinates}` mapping
//! 5. UUID as its hyphenated string
//! 6. duration as total seconds
//! 7. mapping, recursing per key with a narrowed scope
//! 8. sequence, recursing per element with the same scope
//! 9. an explicit include tree, emitting exactly the named attributes
//! 10. a record, emitting its discovered attributes
//!
//! Anything else fails with `NotARecord`.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde_json::{Map, Number, Value as JsonValue};

use super::options::SerializeOptions;
use super::scope::{Include, ProjectionScope};
use super::tree::ProjectionTree;
use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event};
use crate::record::{Instance, Node};
use crate::value::Value;

/// Serializes `value` under the given include or exclude tree.
///
/// Supplying both trees fails with `ConflictingProjection` before any
/// attribute is touched. Any error aborts the whole call.
pub fn serialize(
    value: &Value,
    include: Option<&ProjectionTree>,
    exclude: Option<&ProjectionTree>,
    options: &SerializeOptions,
) -> QueryResult<JsonValue> {
    log_event_with_fields(Event::SerializeBegin, &[("type", value.type_name())]);

    let result = ProjectionScope::new(include, exclude)
        .and_then(|scope| Serializer::new(options).value(value, scope));

    match &result {
        Ok(_) => log_event_with_fields(Event::SerializeComplete, &[("type", value.type_name())]),
        Err(err) => {
            let reason = err.to_string();
            log_event_with_fields(
                Event::SerializeRejected,
                &[("code", err.code()), ("reason", reason.as_str())],
            );
        }
    }
    result
}

/// Recursive walker carrying the options down every level
pub struct Serializer<'o> {
    options: &'o SerializeOptions,
}

impl<'o> Serializer<'o> {
    pub fn new(options: &'o SerializeOptions) -> Self {
        Self { options }
    }

    /// Serializes one value within `scope`
    pub fn value(&self, value: &Value, scope: ProjectionScope<'_>) -> QueryResult<JsonValue> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Int(i) => Ok(JsonValue::from(*i)),
            Value::Float(f) => Ok(Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Date(d) => Ok(JsonValue::String(d.format("%Y-%m-%d").to_string())),
            Value::DateTime(dt) => Ok(JsonValue::String(isoformat_datetime(dt))),
            Value::Time(t) => Ok(JsonValue::String(isoformat_time(t))),
            Value::Geometry(g) => Ok(g.to_mapping()),
            Value::Uuid(u) => Ok(JsonValue::String(u.to_string())),
            Value::Duration(d) => Ok(duration_seconds(d)),
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    if let Some(child) = scope.narrow(key) {
                        out.insert(key.clone(), self.value(item, child)?);
                    }
                }
                Ok(JsonValue::Object(out))
            }
            Value::List(items) => items
                .iter()
                .map(|item| self.value(item, scope))
                .collect::<QueryResult<Vec<_>>>()
                .map(JsonValue::Array),
            Value::Record(record) => match scope.include {
                Include::Tree(tree) => self.listed(record, tree, scope),
                Include::Open | Include::Stop => self.record(record, scope),
            },
            Value::Bytes(_) => Err(QueryError::NotARecord(value.type_name().to_string())),
        }
    }

    /// Emits exactly the attributes named by the include tree
    fn listed(
        &self,
        record: &Instance,
        tree: &ProjectionTree,
        scope: ProjectionScope<'_>,
    ) -> QueryResult<JsonValue> {
        let mut out = Map::new();
        for key in tree.keys() {
            let Some(child) = scope.narrow(key) else {
                continue;
            };
            let value = record.fetch(key)?.into_value()?;
            out.insert(key.to_string(), self.value(&value, child)?);
        }
        Ok(JsonValue::Object(out))
    }

    /// Emits the record's discovered attributes
    fn record(&self, record: &Instance, scope: ProjectionScope<'_>) -> QueryResult<JsonValue> {
        let model = record.model();
        let stop = scope.include == Include::Stop;
        let mut out = Map::new();

        for name in model.candidate_names() {
            if scope.excludes(name) || out.contains_key(name) {
                continue;
            }

            let is_hybrid = model.is_hybrid(name);

            // Below the requested depth only plain columns and hybrids
            if stop && !is_hybrid && !model.is_field(name) {
                continue;
            }

            if !record.is_loaded(name)
                && !self.options.execute_lazy
                && !(is_hybrid && self.options.execute_hybrids)
            {
                continue;
            }

            let value = match record.fetch(name)? {
                Node::Value(value) => value,
                Node::Query(_) if stop || !self.options.execute_lazy => continue,
                Node::Query(query) => Value::List(query.all()?),
            };

            if let Some(child) = scope.narrow(name) {
                out.insert(name.to_string(), self.value(&value, child)?);
            }
        }
        Ok(JsonValue::Object(out))
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, with `.ffffff` only when there are microseconds
fn isoformat_datetime(dt: &NaiveDateTime) -> String {
    format!("{}T{}", dt.date().format("%Y-%m-%d"), isoformat_time(&dt.time()))
}

fn isoformat_time(t: &NaiveTime) -> String {
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", t.format("%H:%M:%S"), micros)
    }
}

fn duration_seconds(d: &chrono::Duration) -> JsonValue {
    let micros = d.num_microseconds();
    match micros {
        Some(us) if us % 1_000_000 != 0 => {
            Number::from_f64(us as f64 / 1e6).map_or(JsonValue::Null, JsonValue::Number)
        }
        _ => JsonValue::from(d.num_seconds()),
    }
}
