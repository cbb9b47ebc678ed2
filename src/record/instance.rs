//! Record instances

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use super::lazy::{AttributeLoader, Node};
use crate::errors::{QueryError, QueryResult};
use crate::model::{AttributeDef, Cardinality, ModelDescriptor};
use crate::observability::{log_event_with_fields, Event};
use crate::value::Value;

/// A live record of some model
pub struct Instance {
    model: Arc<ModelDescriptor>,
    loaded: RwLock<BTreeMap<String, Value>>,
    loader: Option<Arc<dyn AttributeLoader>>,
}

impl Instance {
    pub fn builder(model: &Arc<ModelDescriptor>) -> InstanceBuilder {
        InstanceBuilder {
            model: Arc::clone(model),
            values: BTreeMap::new(),
            loader: None,
        }
    }

    pub fn model(&self) -> &Arc<ModelDescriptor> {
        &self.model
    }

    /// Returns true if `name` is held by the instance without a backend call
    pub fn is_loaded(&self, name: &str) -> bool {
        self.read_loaded().contains_key(name)
    }

    /// Materialized value of `name`, or null. Never calls the store.
    pub fn get(&self, name: &str) -> Value {
        self.read_loaded().get(name).cloned().unwrap_or(Value::Null)
    }

    /// Primary-key values in key order
    pub fn primary_key(&self) -> Vec<Value> {
        self.model
            .primary_key_names()
            .iter()
            .map(|name| self.get(name))
            .collect()
    }

    /// Fetches an attribute, materializing it if necessary.
    ///
    /// Stored attributes loaded through the loader are cached. Hybrids and
    /// properties are evaluated on every call. Proxies resolve through their
    /// relation; a lazy relation handle met on the way is executed.
    pub fn fetch(&self, name: &str) -> QueryResult<Node> {
        let def = self.model.require(name)?;
        if let Some(value) = self.read_loaded().get(name) {
            return Ok(Node::Value(value.clone()));
        }

        match def {
            AttributeDef::Field(_) | AttributeDef::Relation(_) => self.load(name, def),
            AttributeDef::Hybrid(accessor) | AttributeDef::Property(accessor) => {
                Ok(Node::Value(accessor(self)?))
            }
            AttributeDef::Proxy(proxy) => {
                let via = self.fetch(&proxy.relation)?.into_value()?;
                Ok(Node::Value(resolve_remote(&via, &proxy.remote)?))
            }
        }
    }

    fn load(&self, name: &str, def: &AttributeDef) -> QueryResult<Node> {
        let loader = match &self.loader {
            Some(loader) => loader,
            None => {
                return Ok(Node::Value(match def {
                    AttributeDef::Relation(rel) if rel.cardinality == Cardinality::Collection => {
                        Value::List(Vec::new())
                    }
                    _ => Value::Null,
                }))
            }
        };

        let node = loader.load(self, name)?;
        log_event_with_fields(
            Event::LazyAttributeLoaded,
            &[("model", self.model.name()), ("attribute", name)],
        );
        if let Node::Value(value) = &node {
            self.write_loaded().insert(name.to_string(), value.clone());
        }
        Ok(node)
    }

    fn read_loaded(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.loaded.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_loaded(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.loaded.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn resolve_remote(via: &Value, remote: &str) -> QueryResult<Value> {
    match via {
        Value::Null => Ok(Value::Null),
        Value::Record(record) => record.fetch(remote)?.into_value().map_err(Into::into),
        Value::List(items) => items
            .iter()
            .map(|item| resolve_remote(item, remote))
            .collect::<QueryResult<Vec<_>>>()
            .map(Value::List),
        other => Err(QueryError::NotARecord(other.type_name().to_string())),
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded = self.read_loaded();
        f.debug_struct("Instance")
            .field("model", &self.model.name())
            .field("loaded", &loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Instance`]
pub struct InstanceBuilder {
    model: Arc<ModelDescriptor>,
    values: BTreeMap<String, Value>,
    loader: Option<Arc<dyn AttributeLoader>>,
}

impl InstanceBuilder {
    /// Marks a stored attribute as materialized with `value`
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn loader(mut self, loader: Arc<dyn AttributeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Finishes the instance.
    ///
    /// Only scalar fields and relations can be materialized; anything else
    /// fails with `UnknownField`.
    pub fn build(self) -> QueryResult<Arc<Instance>> {
        for name in self.values.keys() {
            match self.model.require(name)? {
                AttributeDef::Field(_) | AttributeDef::Relation(_) => {}
                _ => return Err(QueryError::unknown_field(self.model.name(), name)),
            }
        }
        Ok(Arc::new(Instance {
            model: self.model,
            loaded: RwLock::new(self.values),
            loader: self.loader,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreResult;
    use crate::model::FieldType;
    use crate::record::LazyQuery;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn models() -> (Arc<ModelDescriptor>, Arc<ModelDescriptor>) {
        let tag = Arc::new(
            ModelDescriptor::builder("tag")
                .primary_key("id", FieldType::Other)
                .field("label", FieldType::Other)
                .build()
                .unwrap(),
        );
        let post = Arc::new(
            ModelDescriptor::builder("post")
                .primary_key("id", FieldType::Other)
                .field("title", FieldType::Other)
                .field("body", FieldType::Other)
                .relation("tags", "tag", Cardinality::Collection)
                .relation("history", "revision", Cardinality::Collection)
                .proxy("tag_labels", "tags", "label")
                .hybrid("shout", |p| {
                    Ok(Value::from(
                        p.get("title").as_str().unwrap_or_default().to_uppercase(),
                    ))
                })
                .build()
                .unwrap(),
        );
        (post, tag)
    }

    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl AttributeLoader for CountingLoader {
        fn load(&self, _instance: &Instance, name: &str) -> StoreResult<Node> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "history" => Ok(Node::Query(LazyQuery::new("history", || {
                    Ok(vec![Value::Int(1), Value::Int(2)])
                }))),
                _ => Ok(Node::Value(Value::from("deferred text"))),
            }
        }
    }

    #[test]
    fn test_loaded_and_get() {
        let (post, _) = models();
        let p = Instance::builder(&post).set("id", 1).set("title", "hi").build().unwrap();
        assert!(p.is_loaded("title"));
        assert!(!p.is_loaded("body"));
        assert_eq!(p.get("title"), Value::from("hi"));
        assert_eq!(p.get("body"), Value::Null);
        assert_eq!(p.primary_key(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_fetch_caches_loaded_value() {
        let (post, _) = models();
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let p = Instance::builder(&post)
            .set("id", 1)
            .loader(loader.clone())
            .build()
            .unwrap();

        p.fetch("body").unwrap();
        p.fetch("body").unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(p.is_loaded("body"));
    }

    #[test]
    fn test_query_handle_not_cached() {
        let (post, _) = models();
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let p = Instance::builder(&post).loader(loader.clone()).build().unwrap();

        assert!(p.fetch("history").unwrap().is_query());
        assert!(!p.is_loaded("history"));
    }

    #[test]
    fn test_hybrid_and_proxy() {
        let (post, tag) = models();
        let t1 = Instance::builder(&tag).set("id", 1).set("label", "rust").build().unwrap();
        let t2 = Instance::builder(&tag).set("id", 2).set("label", "db").build().unwrap();
        let p = Instance::builder(&post)
            .set("title", "hello")
            .set("tags", vec![Value::from(t1), Value::from(t2)])
            .build()
            .unwrap();

        match p.fetch("shout").unwrap() {
            Node::Value(v) => assert_eq!(v, Value::from("HELLO")),
            other => panic!("unexpected {:?}", other),
        }
        match p.fetch("tag_labels").unwrap() {
            Node::Value(v) => assert_eq!(v, Value::from(vec!["rust", "db"])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unloaded_relation_without_loader() {
        let (post, _) = models();
        let p = Instance::builder(&post).build().unwrap();
        match p.fetch("tags").unwrap() {
            Node::Value(v) => assert_eq!(v, Value::List(vec![])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_computed_and_unknown() {
        let (post, _) = models();
        assert!(Instance::builder(&post).set("shout", "x").build().is_err());
        assert!(Instance::builder(&post).set("nope", 1).build().is_err());
    }
}
