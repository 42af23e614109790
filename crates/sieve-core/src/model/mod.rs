//! Entity metadata consumed by the resolver and compiler: the provider
//! seam, a memoizing cache in front of it, and a TOML-declared schema.

mod cache;
mod schema;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, ModelCache};
pub use schema::{EntityDef, RelationDef, SchemaDef, SchemaError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// MetadataProvider
///
/// Source of entity metadata. Implementations are consulted at most once per
/// entity name when wrapped in a [`ModelCache`].
///

pub trait MetadataProvider: Send + Sync {
    /// Describe `entity`, or `None` when no such entity exists.
    fn entity(&self, entity: &str) -> Option<EntityModel>;
}

///
/// ValueType
///
/// Scalar type of a property, used to type literals.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Ulid,
    Enum(Vec<String>),
}

impl ValueType {
    /// Whether values can be compared by `<`, `>` and ranges.
    #[must_use]
    pub const fn supports_ordering(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::Float | Self::Text | Self::Timestamp | Self::Ulid
        )
    }

    /// Whether LIKE-based string matching applies.
    #[must_use]
    pub const fn supports_text_match(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Whether two types may be compared column to column.
    #[must_use]
    pub fn is_comparable_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Enum(_), Self::Enum(_)) => true,
            (Self::Int | Self::Float, Self::Int | Self::Float) => true,
            _ => self == other,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Ulid => "ulid",
            Self::Enum(_) => "enum",
        }
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

///
/// RelationModel
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelationModel {
    pub target: String,
    pub cardinality: Cardinality,
}

impl RelationModel {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many)
    }
}

///
/// EntityModel
///
/// Runtime description of one entity. Subclass models carry their inherited
/// properties and relations.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EntityModel {
    /// Stable external name used in requests and query text.
    pub name: String,
    /// Primary key property (points at an entry in `properties`).
    pub primary_key: String,
    /// Value a subclass filter names this entity by.
    pub discriminator: String,
    /// Abstract entities never match a type filter themselves.
    pub is_abstract: bool,
    pub properties: BTreeMap<String, ValueType>,
    pub relations: BTreeMap<String, RelationModel>,
    /// Direct subclasses only.
    pub subclasses: Vec<String>,
    /// Search aliases: name → dotted path relative to this entity.
    pub aliases: BTreeMap<String, String>,
}

impl EntityModel {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&ValueType> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationModel> {
        self.relations.get(name)
    }

    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Type of the primary key property.
    #[must_use]
    pub fn primary_key_type(&self) -> Option<&ValueType> {
        self.property(&self.primary_key)
    }

    /// Every name a path segment may use at this entity, sorted.
    #[must_use]
    pub fn segment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .properties
            .keys()
            .chain(self.relations.keys())
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();

        names
    }

    /// Relation names only, sorted.
    #[must_use]
    pub fn relation_names(&self) -> Vec<String> {
        self.relations.keys().cloned().collect()
    }
}
