use crate::model::{Cardinality, EntityModel, MetadataProvider, RelationModel, ValueType};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse schema: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("entity '{entity}': primary key '{primary_key}' is not a declared property")]
    MissingPrimaryKey { entity: String, primary_key: String },

    #[error("entity '{entity}': relation '{relation}' targets unknown entity '{target}'")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("entity '{entity}': unknown subclass '{subclass}'")]
    UnknownSubclass { entity: String, subclass: String },

    #[error("entity '{entity}': '{name}' is declared as both a property and a relation")]
    DuplicateName { entity: String, name: String },

    #[error("entity '{entity}': alias '{alias}' must map to a non-empty path")]
    EmptyAlias { entity: String, alias: String },

    #[error("discriminator '{discriminator}' is used by both '{first}' and '{second}'")]
    DuplicateDiscriminator {
        discriminator: String,
        first: String,
        second: String,
    },
}

///
/// RelationDef
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDef {
    pub target: String,
    #[serde(default = "RelationDef::default_cardinality")]
    pub cardinality: Cardinality,
}

impl RelationDef {
    const fn default_cardinality() -> Cardinality {
        Cardinality::One
    }
}

///
/// EntityDef
///
/// One `[entities.<Name>]` table.
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    #[serde(default = "EntityDef::default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub subclasses: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, ValueType>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDef>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl EntityDef {
    fn default_primary_key() -> String {
        "id".to_string()
    }
}

///
/// SchemaDef
///
/// Entity metadata declared in TOML:
///
/// ```toml
/// [entities.Order]
/// properties = { id = "int", name = "text", status = { enum = ["active", "pending"] } }
/// relations = { items = { target = "Item", cardinality = "many" } }
/// ```
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDef>,
}

impl SchemaDef {
    /// Parse and validate a schema from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
        let schema: Self = toml::from_str(text)?;
        schema.validate()?;

        Ok(schema)
    }

    /// Read, parse, and validate a schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    /// Check that every cross-reference points at something declared.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut discriminators: BTreeMap<String, &str> = BTreeMap::new();

        for (name, def) in &self.entities {
            if !def.properties.contains_key(&def.primary_key) {
                return Err(SchemaError::MissingPrimaryKey {
                    entity: name.clone(),
                    primary_key: def.primary_key.clone(),
                });
            }

            for (relation, rel) in &def.relations {
                if def.properties.contains_key(relation) {
                    return Err(SchemaError::DuplicateName {
                        entity: name.clone(),
                        name: relation.clone(),
                    });
                }
                if !self.entities.contains_key(&rel.target) {
                    return Err(SchemaError::UnknownRelationTarget {
                        entity: name.clone(),
                        relation: relation.clone(),
                        target: rel.target.clone(),
                    });
                }
            }

            if let Some(subclass) = def
                .subclasses
                .iter()
                .find(|subclass| !self.entities.contains_key(*subclass))
            {
                return Err(SchemaError::UnknownSubclass {
                    entity: name.clone(),
                    subclass: subclass.clone(),
                });
            }

            if let Some((alias, _)) = def.aliases.iter().find(|(_, path)| path.trim().is_empty()) {
                return Err(SchemaError::EmptyAlias {
                    entity: name.clone(),
                    alias: alias.clone(),
                });
            }

            let discriminator = Self::discriminator_of(name, def);
            if let Some(first) = discriminators.insert(discriminator.clone(), name) {
                return Err(SchemaError::DuplicateDiscriminator {
                    discriminator,
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
        }

        Ok(())
    }

    fn discriminator_of(name: &str, def: &EntityDef) -> String {
        def.discriminator.clone().unwrap_or_else(|| name.to_string())
    }
}

impl MetadataProvider for SchemaDef {
    fn entity(&self, entity: &str) -> Option<EntityModel> {
        let def = self.entities.get(entity)?;

        Some(EntityModel {
            name: entity.to_string(),
            primary_key: def.primary_key.clone(),
            discriminator: Self::discriminator_of(entity, def),
            is_abstract: def.is_abstract,
            properties: def.properties.clone(),
            relations: def
                .relations
                .iter()
                .map(|(name, rel)| {
                    (
                        name.clone(),
                        RelationModel {
                            target: rel.target.clone(),
                            cardinality: rel.cardinality,
                        },
                    )
                })
                .collect(),
            subclasses: def.subclasses.clone(),
            aliases: def.aliases.clone(),
        })
    }
}
