//! Model descriptor definitions

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::errors::{QueryError, QueryResult};
use crate::record::Instance;
use crate::value::Value;

/// Classification of a scalar field, used to decide value coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Date,
    DateTime,
    Duration,
    Other,
}

impl FieldType {
    /// Returns true for date and datetime fields
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Duration => "duration",
            FieldType::Other => "other",
        }
    }
}

/// Whether a relation yields one record or many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Collection,
}

/// Relation to another model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Name of the related model
    pub target: String,
    pub cardinality: Cardinality,
}

/// Attribute delegating through a relation to an attribute of the related model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDef {
    /// Relation on this model
    pub relation: String,
    /// Attribute on the related model
    pub remote: String,
}

/// In-process computation of an attribute from the record it belongs to
pub type Accessor = Arc<dyn Fn(&Instance) -> QueryResult<Value> + Send + Sync>;

/// What a named attribute of a model is
#[derive(Clone)]
pub enum AttributeDef {
    /// Stored scalar column
    Field(FieldType),
    Relation(RelationDef),
    Proxy(ProxyDef),
    /// Computed property, cheap enough to evaluate on demand
    Hybrid(Accessor),
    /// Any other introspectable attribute
    Property(Accessor),
}

impl AttributeDef {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeDef::Field(_) => "field",
            AttributeDef::Relation(_) => "relation",
            AttributeDef::Proxy(_) => "proxy",
            AttributeDef::Hybrid(_) => "hybrid",
            AttributeDef::Property(_) => "property",
        }
    }
}

impl fmt::Debug for AttributeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDef::Field(t) => f.debug_tuple("Field").field(t).finish(),
            AttributeDef::Relation(r) => f.debug_tuple("Relation").field(r).finish(),
            AttributeDef::Proxy(p) => f.debug_tuple("Proxy").field(p).finish(),
            AttributeDef::Hybrid(_) => f.write_str("Hybrid(..)"),
            AttributeDef::Property(_) => f.write_str("Property(..)"),
        }
    }
}

/// Computed properties split by how they are evaluated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputedProperties {
    pub proxies: Vec<String>,
    pub hybrids: Vec<String>,
}

/// Registration-time schema of one record type
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    name: String,
    attributes: Vec<(String, AttributeDef)>,
    primary_key: Vec<String>,
}

impl ModelDescriptor {
    /// Start describing a model
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            attributes: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    /// Looks up an attribute, failing with `UnknownField` if absent
    pub fn require(&self, name: &str) -> QueryResult<&AttributeDef> {
        self.attribute(name)
            .ok_or_else(|| QueryError::unknown_field(&self.name, name))
    }

    /// Scalar field names in declaration order
    pub fn fields(&self) -> Vec<&str> {
        self.names_where(|def| matches!(def, AttributeDef::Field(_)))
    }

    /// Relations in declaration order
    pub fn relations(&self) -> Vec<(&str, &RelationDef)> {
        self.attributes
            .iter()
            .filter_map(|(name, def)| match def {
                AttributeDef::Relation(rel) => Some((name.as_str(), rel)),
                _ => None,
            })
            .collect()
    }

    pub fn relation(&self, name: &str) -> QueryResult<&RelationDef> {
        match self.require(name)? {
            AttributeDef::Relation(rel) => Ok(rel),
            _ => Err(QueryError::unknown_field(&self.name, name)),
        }
    }

    pub fn proxies(&self) -> Vec<&str> {
        self.names_where(|def| matches!(def, AttributeDef::Proxy(_)))
    }

    pub fn hybrids(&self) -> Vec<&str> {
        self.names_where(|def| matches!(def, AttributeDef::Hybrid(_)))
    }

    pub fn properties(&self) -> Vec<&str> {
        self.names_where(|def| matches!(def, AttributeDef::Property(_)))
    }

    pub fn computed_properties(&self) -> ComputedProperties {
        ComputedProperties {
            proxies: self.proxies().into_iter().map(String::from).collect(),
            hybrids: self.hybrids().into_iter().map(String::from).collect(),
        }
    }

    /// Primary-key field names in declaration order
    pub fn primary_key_names(&self) -> &[String] {
        &self.primary_key
    }

    /// Declared type of a scalar field.
    ///
    /// Relations and computed attributes report `Other`; proxies are
    /// resolved across models by [`ModelRegistry::field_type`].
    ///
    /// [`ModelRegistry::field_type`]: super::ModelRegistry::field_type
    pub fn field_type(&self, name: &str) -> QueryResult<FieldType> {
        match self.require(name)? {
            AttributeDef::Field(t) => Ok(*t),
            _ => Ok(FieldType::Other),
        }
    }

    pub fn is_field(&self, name: &str) -> bool {
        matches!(self.attribute(name), Some(AttributeDef::Field(_)))
    }

    pub fn is_hybrid(&self, name: &str) -> bool {
        matches!(self.attribute(name), Some(AttributeDef::Hybrid(_)))
    }

    /// Every attribute name in serialization discovery order, deduplicated
    pub fn candidate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.fields()
            .into_iter()
            .chain(self.relations().into_iter().map(|(name, _)| name))
            .chain(self.proxies())
            .chain(self.hybrids())
            .chain(self.properties())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    fn names_where(&self, pred: impl Fn(&AttributeDef) -> bool) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(_, def)| pred(def))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Builder for [`ModelDescriptor`]
pub struct ModelBuilder {
    name: String,
    attributes: Vec<(String, AttributeDef)>,
    primary_key: Vec<String>,
}

impl ModelBuilder {
    /// Add a scalar column
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.attributes
            .push((name.into(), AttributeDef::Field(field_type)));
        self
    }

    /// Add a scalar column that is part of the primary key
    pub fn primary_key(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        self.primary_key.push(name.clone());
        self.field(name, field_type)
    }

    pub fn relation(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.attributes.push((
            name.into(),
            AttributeDef::Relation(RelationDef {
                target: target.into(),
                cardinality,
            }),
        ));
        self
    }

    pub fn proxy(
        mut self,
        name: impl Into<String>,
        relation: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        self.attributes.push((
            name.into(),
            AttributeDef::Proxy(ProxyDef {
                relation: relation.into(),
                remote: remote.into(),
            }),
        ));
        self
    }

    pub fn hybrid<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Instance) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.attributes
            .push((name.into(), AttributeDef::Hybrid(Arc::new(accessor))));
        self
    }

    pub fn property<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Instance) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.attributes
            .push((name.into(), AttributeDef::Property(Arc::new(accessor))));
        self
    }

    /// Finish the descriptor, rejecting duplicate attribute names
    pub fn build(self) -> QueryResult<ModelDescriptor> {
        let mut seen = HashSet::new();
        for (name, _) in &self.attributes {
            if !seen.insert(name.as_str()) {
                return Err(QueryError::InvalidConfig(format!(
                    "model '{}' declares '{}' twice",
                    self.name, name
                )));
            }
        }
        Ok(ModelDescriptor {
            name: self.name,
            attributes: self.attributes,
            primary_key: self.primary_key,
        })
    }
}
