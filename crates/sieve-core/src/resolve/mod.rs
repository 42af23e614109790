//! Dotted property paths → join plan + typed leaf column.

mod join;


pub use join::{Join, JoinPlan};

use crate::model::{EntityModel, ModelCache, ValueType};
use serde::Serialize;
use std::{collections::VecDeque, sync::Arc};
use thiserror::Error as ThisError;

/// Upper bound on alias substitutions within one path.
const MAX_ALIAS_EXPANSIONS: usize = 16;

const SIZE_SUFFIX: &str = ":size";

///
/// ResolveError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResolveError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error(
        "unknown property '{segment}' on {entity}; expected one of {}",
        expected.join(", ")
    )]
    UnknownProperty {
        entity: String,
        segment: String,
        expected: Vec<String>,
    },

    #[error(
        "relationship path error: got '{segment}' on {entity}, expected one of {}",
        expected.join(", ")
    )]
    UnknownRelation {
        entity: String,
        segment: String,
        expected: Vec<String>,
    },

    #[error("property '{property}' on {entity} is scalar; nothing can follow it in '{path}'")]
    PropertyNotTerminal {
        entity: String,
        property: String,
        path: String,
    },

    #[error(
        "collection '{relation}' on {entity} cannot be compared directly; use {relation}{SIZE_SUFFIX} or a property path"
    )]
    CollectionNotComparable { entity: String, relation: String },

    #[error("'{relation}' on {entity} is not a collection relation; {SIZE_SUFFIX} does not apply")]
    SizeOfNonCollection { entity: String, relation: String },

    #[error("alias '{alias}' on {entity} expands without end")]
    AliasCycle { entity: String, alias: String },

    #[error("malformed path segment '{segment}' in '{path}': {reason}")]
    MalformedSegment {
        path: String,
        segment: String,
        reason: &'static str,
    },
}

///
/// HopKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopKind {
    /// Collection hop served by an outer join.
    Join { alias: String },
    /// To-one hop navigated as a path expression.
    Dereference,
}

///
/// Hop
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Hop {
    pub relation: String,
    pub target: String,
    pub kind: HopKind,
}

///
/// Leaf
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Leaf {
    Property { name: String, value_type: ValueType },
    /// Element count of a collection relation.
    Size { relation: String },
}

static SIZE_TYPE: ValueType = ValueType::Int;

impl Leaf {
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        match self {
            Self::Property { value_type, .. } => value_type,
            Self::Size { .. } => &SIZE_TYPE,
        }
    }
}

///
/// ResolvedPath
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedPath {
    pub path: String,
    pub hops: Vec<Hop>,
    pub leaf: Leaf,
    /// Column expression in the rendered query (`j0.sku`, `mobj.customer.name`).
    pub column: String,
}

impl ResolvedPath {
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        self.leaf.value_type()
    }
}

///
/// Segment
///

#[derive(Clone, Debug, Eq, PartialEq)]
struct Segment {
    name: String,
    label: Option<String>,
    size_of: bool,
}

impl Segment {
    fn key(&self) -> String {
        match &self.label {
            Some(label) => format!("{}[{label}]", self.name),
            None => self.name.clone(),
        }
    }
}

fn parse_segments(path: &str) -> Result<VecDeque<Segment>, ResolveError> {
    let malformed = |segment: &str, reason| ResolveError::MalformedSegment {
        path: path.to_string(),
        segment: segment.to_string(),
        reason,
    };

    path.split('.')
        .map(|raw| {
            let (body, size_of) = match raw.len().checked_sub(SIZE_SUFFIX.len()) {
                Some(at)
                    if raw.is_char_boundary(at)
                        && raw[at..].eq_ignore_ascii_case(SIZE_SUFFIX) =>
                {
                    (&raw[..at], true)
                }
                _ => (raw, false),
            };

            let (name, label) = match body.split_once('[') {
                Some((name, rest)) => {
                    let label = rest
                        .strip_suffix(']')
                        .ok_or_else(|| malformed(raw, "join label must end with ']'"))?;
                    if label.is_empty() || label.contains(['[', ']']) {
                        return Err(malformed(raw, "join label must be a plain name"));
                    }
                    (name, Some(label.to_string()))
                }
                None if body.contains(']') => {
                    return Err(malformed(raw, "']' without '['"));
                }
                None => (body, None),
            };

            if name.is_empty() {
                return Err(malformed(raw, "empty segment"));
            }

            Ok(Segment {
                name: name.to_string(),
                label,
                size_of,
            })
        })
        .collect()
}

///
/// PathResolver
///
/// Walks dotted paths through entity metadata starting at one root entity.
/// Joins are recorded in the caller's [`JoinPlan`] so a single compilation
/// reuses them across every path it resolves.
///

pub struct PathResolver<'a> {
    models: &'a ModelCache,
    root: Arc<EntityModel>,
    root_alias: &'a str,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub const fn new(models: &'a ModelCache, root: Arc<EntityModel>, root_alias: &'a str) -> Self {
        Self {
            models,
            root,
            root_alias,
        }
    }

    #[must_use]
    pub const fn root(&self) -> &Arc<EntityModel> {
        &self.root
    }

    fn model(&self, entity: &str) -> Result<Arc<EntityModel>, ResolveError> {
        self.models
            .get(entity)
            .ok_or_else(|| ResolveError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    /// Resolve `path` to its leaf column, allocating joins as needed.
    pub fn resolve(&self, path: &str, joins: &mut JoinPlan) -> Result<ResolvedPath, ResolveError> {
        let mut remaining = parse_segments(path)?;
        let mut entity = self.root.clone();
        let mut current = self.root_alias.to_string();
        let mut key: Vec<String> = Vec::new();
        let mut hops: Vec<Hop> = Vec::new();
        let mut expansions = 0;

        let finish = |hops, leaf, column| ResolvedPath {
            path: path.to_string(),
            hops,
            leaf,
            column,
        };

        while let Some(segment) = remaining.pop_front() {
            let last = remaining.is_empty();
            let malformed = |reason| ResolveError::MalformedSegment {
                path: path.to_string(),
                segment: segment.key(),
                reason,
            };

            // relation:size
            if segment.size_of {
                let relation = entity.relation(&segment.name).ok_or_else(|| {
                    ResolveError::UnknownProperty {
                        entity: entity.name.clone(),
                        segment: segment.name.clone(),
                        expected: entity.relation_names(),
                    }
                })?;
                if !relation.is_collection() {
                    return Err(ResolveError::SizeOfNonCollection {
                        entity: entity.name.clone(),
                        relation: segment.name,
                    });
                }
                if !last {
                    return Err(ResolveError::PropertyNotTerminal {
                        entity: entity.name.clone(),
                        property: segment.key(),
                        path: path.to_string(),
                    });
                }

                let column = format!("SIZE({current}.{})", segment.name);
                return Ok(finish(
                    hops,
                    Leaf::Size {
                        relation: segment.name,
                    },
                    column,
                ));
            }

            // scalar property
            if let Some(value_type) = entity.property(&segment.name) {
                if segment.label.is_some() {
                    return Err(malformed("join labels apply to collection relations only"));
                }
                if !last {
                    return Err(ResolveError::PropertyNotTerminal {
                        entity: entity.name.clone(),
                        property: segment.name,
                        path: path.to_string(),
                    });
                }

                let column = format!("{current}.{}", segment.name);
                return Ok(finish(
                    hops,
                    Leaf::Property {
                        name: segment.name,
                        value_type: value_type.clone(),
                    },
                    column,
                ));
            }

            // relation hop
            if let Some(relation) = entity.relation(&segment.name).cloned() {
                let target = self.model(&relation.target)?;
                key.push(segment.key());

                if relation.is_collection() {
                    if last {
                        return Err(ResolveError::CollectionNotComparable {
                            entity: entity.name.clone(),
                            relation: segment.name,
                        });
                    }
                    let alias = joins.join(&key, &current, &segment.name, &relation.target);
                    hops.push(Hop {
                        relation: segment.name,
                        target: relation.target,
                        kind: HopKind::Join {
                            alias: alias.clone(),
                        },
                    });
                    current = alias;
                } else {
                    if segment.label.is_some() {
                        return Err(malformed("join labels apply to collection relations only"));
                    }
                    current = format!("{current}.{}", segment.name);
                    hops.push(Hop {
                        relation: segment.name,
                        target: relation.target,
                        kind: HopKind::Dereference,
                    });

                    // a to-one relation compares by its primary key
                    if last {
                        let value_type = target.primary_key_type().cloned().ok_or_else(|| {
                            ResolveError::UnknownProperty {
                                entity: target.name.clone(),
                                segment: target.primary_key.clone(),
                                expected: target.segment_names(),
                            }
                        })?;
                        let column = format!("{current}.{}", target.primary_key);
                        return Ok(finish(
                            hops,
                            Leaf::Property {
                                name: target.primary_key.clone(),
                                value_type,
                            },
                            column,
                        ));
                    }
                }

                entity = target;
                continue;
            }

            // search alias: splice its path in place of this segment
            if let Some(alias_path) = entity.alias(&segment.name) {
                if segment.label.is_some() {
                    return Err(malformed("join labels cannot be applied to an alias"));
                }
                expansions += 1;
                if expansions > MAX_ALIAS_EXPANSIONS {
                    return Err(ResolveError::AliasCycle {
                        entity: entity.name.clone(),
                        alias: segment.name,
                    });
                }
                for expanded in parse_segments(alias_path)?.into_iter().rev() {
                    remaining.push_front(expanded);
                }
                continue;
            }

            return Err(if last {
                ResolveError::UnknownProperty {
                    entity: entity.name.clone(),
                    segment: segment.name,
                    expected: entity.segment_names(),
                }
            } else {
                ResolveError::UnknownRelation {
                    entity: entity.name.clone(),
                    segment: segment.name,
                    expected: entity.relation_names(),
                }
            });
        }

        Err(ResolveError::MalformedSegment {
            path: path.to_string(),
            segment: String::new(),
            reason: "empty path",
        })
    }

    /// Resolve a path that must end on a relation (fetch hints), returning
    /// the navigable relation expression (`mobj.items`, `j0.parts`).
    pub fn resolve_relation(
        &self,
        path: &str,
        joins: &mut JoinPlan,
    ) -> Result<String, ResolveError> {
        let mut remaining = parse_segments(path)?;
        let mut entity = self.root.clone();
        let mut current = self.root_alias.to_string();
        let mut key: Vec<String> = Vec::new();

        while let Some(segment) = remaining.pop_front() {
            let relation = entity.relation(&segment.name).cloned().ok_or_else(|| {
                ResolveError::UnknownRelation {
                    entity: entity.name.clone(),
                    segment: segment.name.clone(),
                    expected: entity.relation_names(),
                }
            })?;
            if remaining.is_empty() {
                return Ok(format!("{current}.{}", segment.name));
            }

            let target = self.model(&relation.target)?;
            key.push(segment.key());
            current = if relation.is_collection() {
                joins.join(&key, &current, &segment.name, &relation.target)
            } else {
                format!("{current}.{}", segment.name)
            };
            entity = target;
        }

        Err(ResolveError::MalformedSegment {
            path: path.to_string(),
            segment: String::new(),
            reason: "empty path",
        })
    }
}
