use crate::{
    compile::CompileError,
    model::{EntityModel, ModelCache},
    resolve::ResolveError,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// SubclassScope
///
/// Outcome of a subclass filter: the lowest common ancestor of the requested
/// classes, and the discriminators to restrict it by when that ancestor is
/// the root entity itself.
///

#[derive(Clone, Debug)]
pub(crate) struct SubclassScope {
    pub(crate) entity: Arc<EntityModel>,
    pub(crate) discriminators: Option<Vec<String>>,
}

///
/// Hierarchy
///
/// Subtree of one root entity, flattened with parent links.
///

struct Hierarchy {
    models: BTreeMap<String, Arc<EntityModel>>,
    parents: BTreeMap<String, String>,
}

impl Hierarchy {
    fn walk(cache: &ModelCache, root: &Arc<EntityModel>) -> Result<Self, ResolveError> {
        let mut models = BTreeMap::new();
        let mut parents = BTreeMap::new();
        let mut pending = vec![root.clone()];

        while let Some(entity) = pending.pop() {
            for subclass in &entity.subclasses {
                if models.contains_key(subclass) {
                    continue;
                }
                let model = cache
                    .get(subclass)
                    .ok_or_else(|| ResolveError::UnknownEntity {
                        entity: subclass.clone(),
                    })?;
                parents.insert(subclass.clone(), entity.name.clone());
                pending.push(model);
            }
            models.insert(entity.name.clone(), entity);
        }

        Ok(Self { models, parents })
    }

    /// Entity names from the root down to `name`.
    fn lineage(&self, name: &str) -> Vec<String> {
        let mut line = vec![name.to_string()];
        let mut current = name;
        while let Some(parent) = self.parents.get(current) {
            line.push(parent.clone());
            current = parent;
        }
        line.reverse();

        line
    }
}

/// Scope a query on `root` to the requested discriminators.
pub(crate) fn scope(
    cache: &ModelCache,
    root: Arc<EntityModel>,
    discriminators: &[String],
) -> Result<SubclassScope, CompileError> {
    if discriminators.is_empty() {
        return Ok(SubclassScope {
            entity: root,
            discriminators: None,
        });
    }

    let hierarchy = Hierarchy::walk(cache, &root)?;
    let by_discriminator: BTreeMap<&str, &Arc<EntityModel>> = hierarchy
        .models
        .values()
        .filter(|model| !model.is_abstract)
        .map(|model| (model.discriminator.as_str(), model))
        .collect();

    let mut requested = BTreeSet::new();
    for discriminator in discriminators {
        let model = by_discriminator
            .get(discriminator.as_str())
            .ok_or_else(|| CompileError::UnknownDiscriminator {
                entity: root.name.clone(),
                value: discriminator.clone(),
                expected: by_discriminator.keys().map(ToString::to_string).collect(),
            })?;
        requested.insert(model.name.clone());
    }

    // lowest common ancestor: longest shared lineage prefix
    let mut lineages = requested.iter().map(|name| hierarchy.lineage(name));
    let mut common = lineages.next().unwrap_or_default();
    for lineage in lineages {
        let shared = common
            .iter()
            .zip(&lineage)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    let ancestor = common.last().unwrap_or(&root.name);
    let entity = hierarchy
        .models
        .get(ancestor)
        .cloned()
        .unwrap_or_else(|| root.clone());

    // a type filter only when the classes share no ancestor below the root
    let discriminators = (entity.name == root.name && requested.len() > 1).then(|| {
        requested
            .iter()
            .filter_map(|name| hierarchy.models.get(name))
            .map(|model| model.discriminator.clone())
            .collect()
    });

    Ok(SubclassScope {
        entity,
        discriminators,
    })
}
