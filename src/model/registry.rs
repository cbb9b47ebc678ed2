//! Process-wide table of model descriptors

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{AttributeDef, Cardinality, FieldType, ModelDescriptor};
use crate::errors::{QueryError, QueryResult};

/// Model reached by traversing a relation or proxy
#[derive(Debug, Clone)]
pub struct RelatedModel {
    pub model: Arc<ModelDescriptor>,
    pub cardinality: Cardinality,
}

/// Registry of model descriptors, built at startup and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// Relation targets are resolved on use, so models may be registered in
    /// any order.
    pub fn register(&mut self, descriptor: ModelDescriptor) -> QueryResult<Arc<ModelDescriptor>> {
        let name = descriptor.name().to_string();
        if self.models.contains_key(&name) {
            return Err(QueryError::InvalidConfig(format!(
                "model '{}' is already registered",
                name
            )));
        }
        let descriptor = Arc::new(descriptor);
        self.models.insert(name, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    pub fn get(&self, name: &str) -> QueryResult<Arc<ModelDescriptor>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves the model on the far side of a relation or proxy.
    ///
    /// For a proxy, the target is the remote attribute's relation target when
    /// the remote attribute is itself a relation, otherwise the intermediate
    /// model the proxy delegates through.
    pub fn related_model(&self, model: &ModelDescriptor, name: &str) -> QueryResult<RelatedModel> {
        match model.require(name)? {
            AttributeDef::Relation(rel) => Ok(RelatedModel {
                model: self.get(&rel.target)?,
                cardinality: rel.cardinality,
            }),
            AttributeDef::Proxy(proxy) => {
                let via = model.relation(&proxy.relation)?;
                let intermediate = self.get(&via.target)?;
                match intermediate.require(&proxy.remote)? {
                    AttributeDef::Relation(remote) => {
                        let cardinality = if via.cardinality == Cardinality::Collection {
                            Cardinality::Collection
                        } else {
                            remote.cardinality
                        };
                        Ok(RelatedModel {
                            model: self.get(&remote.target)?,
                            cardinality,
                        })
                    }
                    _ => Ok(RelatedModel {
                        model: intermediate,
                        cardinality: via.cardinality,
                    }),
                }
            }
            _ => Err(QueryError::unknown_field(model.name(), name)),
        }
    }

    /// Declared type of `name` on `model`, following proxies to the remote column
    pub fn field_type(&self, model: &ModelDescriptor, name: &str) -> QueryResult<FieldType> {
        match model.require(name)? {
            AttributeDef::Field(t) => Ok(*t),
            AttributeDef::Proxy(proxy) => {
                let via = model.relation(&proxy.relation)?;
                let intermediate = self.get(&via.target)?;
                intermediate.field_type(&proxy.remote)
            }
            _ => Ok(FieldType::Other),
        }
    }

    /// Type of a column that can be compared, ordered or grouped on.
    ///
    /// Only stored fields and proxies onto a stored field of the related
    /// model qualify; relations, hybrids and other properties are
    /// `UnknownField`.
    pub fn scalar_type(&self, model: &ModelDescriptor, name: &str) -> QueryResult<FieldType> {
        match model.require(name)? {
            AttributeDef::Field(t) => Ok(*t),
            AttributeDef::Proxy(proxy) => {
                let via = model.relation(&proxy.relation)?;
                let intermediate = self.get(&via.target)?;
                match intermediate.require(&proxy.remote)? {
                    AttributeDef::Field(t) => Ok(*t),
                    _ => Err(QueryError::unknown_field(model.name(), name)),
                }
            }
            _ => Err(QueryError::unknown_field(model.name(), name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDescriptor::builder("person")
                    .primary_key("id", FieldType::Other)
                    .relation("memberships", "membership", Cardinality::Collection)
                    .proxy("groups", "memberships", "group")
                    .proxy("joined", "memberships", "joined_at")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                ModelDescriptor::builder("membership")
                    .primary_key("id", FieldType::Other)
                    .field("joined_at", FieldType::Date)
                    .relation("group", "group", Cardinality::Singular)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                ModelDescriptor::builder("group")
                    .primary_key("id", FieldType::Other)
                    .field("title", FieldType::Other)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_related_model_through_relation() {
        let registry = registry();
        let person = registry.get("person").unwrap();
        let related = registry.related_model(&person, "memberships").unwrap();
        assert_eq!(related.model.name(), "membership");
        assert_eq!(related.cardinality, Cardinality::Collection);
    }

    #[test]
    fn test_related_model_through_proxy() {
        let registry = registry();
        let person = registry.get("person").unwrap();

        let groups = registry.related_model(&person, "groups").unwrap();
        assert_eq!(groups.model.name(), "group");
        assert_eq!(groups.cardinality, Cardinality::Collection);

        let joined = registry.related_model(&person, "joined").unwrap();
        assert_eq!(joined.model.name(), "membership");
    }

    #[test]
    fn test_proxy_field_type() {
        let registry = registry();
        let person = registry.get("person").unwrap();
        assert_eq!(registry.field_type(&person, "joined").unwrap(), FieldType::Date);
    }

    #[test]
    fn test_scalar_type_rejects_non_columns() {
        let registry = registry();
        let person = registry.get("person").unwrap();
        let membership = registry.get("membership").unwrap();

        assert_eq!(registry.scalar_type(&membership, "joined_at").unwrap(), FieldType::Date);
        assert_eq!(registry.scalar_type(&person, "joined").unwrap(), FieldType::Date);
        for name in ["memberships", "groups"] {
            assert_eq!(
                registry.scalar_type(&person, name),
                Err(QueryError::unknown_field("person", name))
            );
        }
        assert_eq!(
            registry.scalar_type(&membership, "group"),
            Err(QueryError::unknown_field("membership", "group"))
        );
    }

    #[test]
    fn test_unknown_model() {
        let registry = registry();
        assert!(matches!(
            registry.get("nobody"),
            Err(QueryError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        let again = ModelDescriptor::builder("group").build().unwrap();
        assert!(registry.register(again).is_err());
    }

    #[test]
    fn test_scalar_is_not_related() {
        let registry = registry();
        let membership = registry.get("membership").unwrap();
        assert!(matches!(
            registry.related_model(&membership, "joined_at"),
            Err(QueryError::UnknownField { .. })
        ));
    }
}
