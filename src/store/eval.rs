//! Predicate evaluation against live records

use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;

use crate::errors::{QueryError, StoreError, StoreResult};
use crate::filter::Operator;
use crate::planner::{Operand, Predicate};
use crate::record::Instance;
use crate::value::Value;

/// Reads an attribute, loading it if necessary
pub(super) fn attribute(record: &Instance, name: &str) -> StoreResult<Value> {
    let node = record.fetch(name).map_err(into_store_error)?;
    node.into_value()
}

/// Records reached through a relation or proxy value.
///
/// A proxy through a collection onto a collection yields a list of lists;
/// nested lists are flattened.
pub(super) fn related_records(value: Value) -> Vec<Arc<Instance>> {
    let mut records = Vec::new();
    collect_records(value, &mut records);
    records
}

fn collect_records(value: Value, records: &mut Vec<Arc<Instance>>) {
    match value {
        Value::Record(record) => records.push(record),
        Value::List(items) => {
            for item in items {
                collect_records(item, records);
            }
        }
        _ => {}
    }
}

fn into_store_error(err: QueryError) -> StoreError {
    match err {
        QueryError::Store(inner) => inner,
        other => StoreError::Backend(other.to_string()),
    }
}

/// Evaluates `predicate` against `record`.
///
/// `outer` is the record owning the relation when evaluating the body of a
/// quantifier.
pub(super) fn matches(
    record: &Instance,
    predicate: &Predicate,
    outer: Option<&Instance>,
) -> StoreResult<bool> {
    match predicate {
        Predicate::Compare { field, op, operand } => {
            let left = attribute(record, field)?;
            let right = match operand {
                Operand::Literal(value) => value.clone(),
                Operand::Field(other) => attribute(record, other)?,
                Operand::OuterField(other) => attribute(outer.unwrap_or(record), other)?,
            };
            compare(*op, &left, &right)
        }
        Predicate::Unary { field, op } => {
            let value = attribute(record, field)?;
            Ok(match op {
                Operator::IsNull => value.is_null(),
                Operator::IsNotNull => !value.is_null(),
                // Direction markers carry no condition
                _ => true,
            })
        }
        Predicate::Quantified {
            relation,
            quantifier,
            predicate,
            ..
        } => {
            let related = related_records(attribute(record, relation)?);
            let mut matched = 0;
            for item in &related {
                if matches(item, predicate, Some(record))? {
                    matched += 1;
                } else if *quantifier == Operator::Has {
                    return Ok(false);
                }
            }
            Ok(matched > 0)
        }
        Predicate::And(subs) => {
            for sub in subs {
                if !matches(record, sub, outer)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Or(subs) => {
            for sub in subs {
                if matches(record, sub, outer)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Applies a binary operator. Null on either side never matches.
fn compare(op: Operator, left: &Value, right: &Value) -> StoreResult<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }
    let ordering = || left.compare(right);
    Ok(match op {
        Operator::Eq => left.loose_eq(right),
        Operator::Ne => !left.loose_eq(right),
        Operator::Gt => ordering() == Some(Ordering::Greater),
        Operator::Lt => ordering() == Some(Ordering::Less),
        Operator::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        Operator::Like | Operator::ILike => match (pattern_text(left), right.as_str()) {
            (Some(text), Some(pattern)) => {
                like_regex(pattern, op == Operator::ILike)?.is_match(&text)
            }
            _ => false,
        },
        Operator::In => contains(right, left),
        Operator::NotIn => !contains(right, left),
        _ => false,
    })
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::List(items) => items.iter().any(|item| item.loose_eq(needle)),
        other => other.loose_eq(needle),
    }
}

/// Text a pattern is matched against; temporal values use their ISO form
fn pattern_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Value::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
        _ => None,
    }
}

/// Translates a SQL LIKE pattern: `%` is any run, `_` any single character
pub(super) fn like_regex(pattern: &str, case_insensitive: bool) -> StoreResult<Regex> {
    let mut source = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut literal = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| StoreError::Backend(format!("bad LIKE pattern: {}", e)))
}

/// Total order used for sorting: nulls first, then by value, falling back to
/// type name for values that do not compare
pub(super) fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .compare(b)
            .unwrap_or_else(|| a.type_name().cmp(b.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_translation() {
        let re = like_regex("%y%", false).unwrap();
        assert!(re.is_match("Mary"));
        assert!(!re.is_match("MARK"));

        let re = like_regex("J_hn", false).unwrap();
        assert!(re.is_match("John"));
        assert!(!re.is_match("Johan"));

        let re = like_regex("%Y%", true).unwrap();
        assert!(re.is_match("mary"));

        let re = like_regex("a.c%", false).unwrap();
        assert!(re.is_match("a.cde"));
        assert!(!re.is_match("abcde"));
    }

    #[test]
    fn test_compare_semantics() {
        assert!(compare(Operator::Lt, &Value::Int(3), &Value::Float(3.5)).unwrap());
        assert!(compare(Operator::Ge, &Value::Int(3), &Value::Int(3)).unwrap());
        assert!(!compare(Operator::Eq, &Value::Null, &Value::Null).unwrap());
        assert!(!compare(Operator::Ne, &Value::Null, &Value::Int(1)).unwrap());
        assert!(!compare(Operator::Gt, &Value::from("a"), &Value::Int(1)).unwrap());

        let list = Value::from(vec![1, 2, 3]);
        assert!(compare(Operator::In, &Value::Int(2), &list).unwrap());
        assert!(compare(Operator::NotIn, &Value::Int(5), &list).unwrap());
    }

    #[test]
    fn test_pattern_on_temporal_values() {
        let day = chrono::NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        let pattern = Value::from("2021-03%");
        assert!(compare(Operator::Like, &Value::Date(day), &pattern).unwrap());
        assert!(compare(
            Operator::Like,
            &Value::DateTime(day.and_hms_opt(10, 0, 0).unwrap()),
            &Value::from("%T10:00:00")
        )
        .unwrap());
        assert!(!compare(Operator::Like, &Value::Date(day), &Value::from("2020%")).unwrap());
        assert!(!compare(Operator::Like, &Value::Int(2021), &Value::from("2021")).unwrap());
    }

    #[test]
    fn test_nested_lists_flattened() {
        assert!(related_records(Value::from(vec![Value::List(vec![]), Value::Null])).is_empty());
    }

    #[test]
    fn test_sort_order() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Int(1), Value::from("b")];
        values.sort_by(sort_order);
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Int(1));
        assert_eq!(values[2], Value::Int(3));
    }
}
