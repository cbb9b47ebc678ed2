//! Serializer Invariant Tests
//!
//! - Plain values serialize to themselves
//! - Include and exclude trees together fail before any attribute is read
//! - An exclude tree only removes what it names
//! - Lazy relations are executed only when asked to

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use restquery::config::ApiConfig;
use restquery::model::{Cardinality, FieldType, ModelDescriptor, ModelRegistry};
use restquery::projection::{serialize, ProjectionTree, SerializeOptions};
use restquery::record::{AttributeLoader, Instance, LazyQuery, Node};
use restquery::value::Value;
use restquery::{QueryError, StoreResult};
use serde_json::{json, Value as JsonValue};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ModelDescriptor::builder("person")
                .primary_key("id", FieldType::Other)
                .field("name", FieldType::Other)
                .field("email", FieldType::Other)
                .field("created_at", FieldType::DateTime)
                .relation("posts", "post", Cardinality::Collection)
                .hybrid("display_name", |p: &Instance| {
                    let name = p.get("name");
                    let email = p.get("email");
                    Ok(Value::from(format!(
                        "{} <{}>",
                        name.as_str().unwrap_or(""),
                        email.as_str().unwrap_or("")
                    )))
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            ModelDescriptor::builder("post")
                .primary_key("id", FieldType::Other)
                .field("title", FieldType::Other)
                .field("person_id", FieldType::Other)
                .relation("author", "person", Cardinality::Singular)
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

/// Loader handing out `posts` as an unexecuted query and counting every call
struct PostsLoader {
    posts: Vec<Arc<Instance>>,
    calls: Arc<AtomicUsize>,
}

impl AttributeLoader for PostsLoader {
    fn load(&self, _instance: &Instance, name: &str) -> StoreResult<Node> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "posts" => {
                let posts = self.posts.clone();
                Ok(Node::Query(LazyQuery::new("person.posts", move || {
                    Ok(posts.iter().cloned().map(Value::from).collect())
                })))
            }
            _ => Ok(Node::Value(Value::Null)),
        }
    }
}

fn created_at() -> Value {
    Value::from(
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    )
}

/// A person with two posts reachable only through the loader
fn setup_person(registry: &ModelRegistry) -> (Arc<Instance>, Arc<AtomicUsize>) {
    let post = registry.get("post").unwrap();
    let posts = vec![
        Instance::builder(&post)
            .set("id", 1)
            .set("title", "First")
            .set("person_id", 7)
            .build()
            .unwrap(),
        Instance::builder(&post)
            .set("id", 2)
            .set("title", "Second")
            .set("person_id", 7)
            .build()
            .unwrap(),
    ];

    let calls = Arc::new(AtomicUsize::new(0));
    let person = Instance::builder(&registry.get("person").unwrap())
        .set("id", 7)
        .set("name", "Ann")
        .set("email", "ann@example.com")
        .set("created_at", created_at())
        .loader(Arc::new(PostsLoader {
            posts,
            calls: calls.clone(),
        }))
        .build()
        .unwrap();
    (person, calls)
}

// =============================================================================
// Plain Value Tests
// =============================================================================

/// Values already made of plain JSON types come back unchanged.
#[test]
fn test_plain_values_are_idempotent() {
    let samples = [
        json!(null),
        json!(true),
        json!(42),
        json!(-1.5),
        json!("text"),
        json!([1, "two", [3.0], {"four": 4}]),
        json!({"a": {"b": [null, false]}, "c": ""}),
    ];
    for sample in samples {
        let once = serialize(&Value::from(sample.clone()), None, None, &SerializeOptions::default()).unwrap();
        assert_eq!(once, sample);
        let twice = serialize(&Value::from(once.clone()), None, None, &SerializeOptions::default()).unwrap();
        assert_eq!(twice, once);
    }
}

/// Dotted paths parse into a nested tree and render back the same way.
#[test]
fn test_column_paths_parse() {
    let tree = ProjectionTree::parse(&["author.name", "author.email", "title"]);
    assert_eq!(
        tree.to_json(),
        json!({"author": {"name": true, "email": true}, "title": true})
    );
    assert_eq!(ProjectionTree::from_json(&tree.to_json()).unwrap(), tree);
}

// =============================================================================
// Projection Conflict Tests
// =============================================================================

/// Both trees at once fail without touching the record.
#[test]
fn test_conflict_before_any_work() {
    let registry = setup_registry();
    let (person, calls) = setup_person(&registry);

    let include = ProjectionTree::parse(&["name"]);
    let exclude = ProjectionTree::parse(&["email"]);
    let result = serialize(
        &Value::from(person),
        Some(&include),
        Some(&exclude),
        &SerializeOptions::eager(),
    );

    assert!(matches!(result, Err(QueryError::ConflictingProjection(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Exclusion Tests
// =============================================================================

/// Excluding `email` yields the default output minus that key.
#[test]
fn test_exclude_only_removes_named_key() {
    let registry = setup_registry();
    let (person, _) = setup_person(&registry);
    let value = Value::from(person);
    let options = SerializeOptions::default();

    let full = serialize(&value, None, None, &options).unwrap();
    let trimmed = serialize(&value, None, Some(&ProjectionTree::parse(&["email"])), &options).unwrap();

    let mut expected = full.clone();
    expected.as_object_mut().unwrap().remove("email");
    assert!(full.get("email").is_some());
    assert_eq!(trimmed, expected);
}

// =============================================================================
// Lazy Relation Tests
// =============================================================================

/// Without lazy execution, a record serializes its loaded columns only.
#[test]
fn test_record_without_lazy_execution() {
    let registry = setup_registry();
    let (person, calls) = setup_person(&registry);

    let out = serialize(&Value::from(person), None, None, &SerializeOptions::default()).unwrap();
    assert_eq!(
        out,
        json!({
            "id": 7,
            "name": "Ann",
            "email": "ann@example.com",
            "created_at": "2021-01-01T00:00:00"
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// With lazy execution the posts query runs and its records stop at columns.
#[test]
fn test_record_with_lazy_execution() {
    let registry = setup_registry();
    let (person, calls) = setup_person(&registry);

    let out = serialize(&Value::from(person), None, None, &SerializeOptions::eager()).unwrap();
    assert_eq!(out["created_at"], json!("2021-01-01T00:00:00"));
    assert_eq!(out["display_name"], json!("Ann <ann@example.com>"));
    assert_eq!(
        out["posts"],
        json!([
            {"id": 1, "title": "First", "person_id": 7},
            {"id": 2, "title": "Second", "person_id": 7}
        ])
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// An include tree reaching into a relation keeps only the named columns.
#[test]
fn test_include_into_relation() {
    let registry = setup_registry();
    let (person, _) = setup_person(&registry);

    let include = ProjectionTree::parse(&["name", "posts.title"]);
    let out = serialize(&Value::from(person), Some(&include), None, &SerializeOptions::default()).unwrap();
    assert_eq!(
        out,
        json!({"name": "Ann", "posts": [{"title": "First"}, {"title": "Second"}]})
    );
}

/// A collection of records shares one scope across its elements.
#[test]
fn test_collection_of_records() {
    let registry = setup_registry();
    let (ann, _) = setup_person(&registry);
    let bob = Instance::builder(&registry.get("person").unwrap())
        .set("id", 8)
        .set("name", "Bob")
        .set("email", "bob@example.com")
        .set("created_at", created_at())
        .build()
        .unwrap();

    let include = ProjectionTree::parse(&["id"]);
    let out = serialize(
        &Value::from(vec![ann, bob]),
        Some(&include),
        None,
        &SerializeOptions::default(),
    )
    .unwrap();
    assert_eq!(out, json!([{"id": 7}, {"id": 8}]));
}

// =============================================================================
// Endpoint Configuration Tests
// =============================================================================

#[test]
fn test_config_render() {
    let registry = setup_registry();
    let (person, _) = setup_person(&registry);
    let value = Value::from(person);

    let config = ApiConfig::from_json_str(
        r#"{"exclude_queries": true, "exclude_hybrids": true, "exclude_columns": ["email", "created_at"]}"#,
    )
    .unwrap();
    let out: JsonValue = config.render(&value, None, false).unwrap();
    assert_eq!(out, json!({"id": 7, "name": "Ann"}));

    let config = ApiConfig::from_json_str(r#"{"include_columns": ["id", "name", "posts.id"]}"#).unwrap();
    let requested = vec!["posts".to_string(), "email".to_string()];
    let out = config.render(&value, Some(requested.as_slice()), false).unwrap();
    assert_eq!(out, json!({"posts": [{"id": 1}, {"id": 2}]}));
}
