use serde::Serialize;
use std::collections::BTreeMap;

///
/// Join
///
/// One outer join introduced for a collection hop.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Join {
    /// Alias the joined rows are addressed by (`j0`, `j1`, …).
    pub alias: String,
    /// Expression the relation is navigated from (`mobj.items`'s `mobj`).
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl Join {
    /// `mobj.items` for a join of `items` off `mobj`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}.{}", self.source, self.relation)
    }
}

///
/// JoinPlan
///
/// Joins allocated during one compilation, deduplicated by the sequence of
/// segment labels leading to them from the root.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinPlan {
    alias_prefix: String,
    joins: Vec<Join>,
    by_key: BTreeMap<Vec<String>, usize>,
}

impl JoinPlan {
    #[must_use]
    pub fn new(alias_prefix: impl Into<String>) -> Self {
        Self {
            alias_prefix: alias_prefix.into(),
            joins: Vec::new(),
            by_key: BTreeMap::new(),
        }
    }

    /// Alias for the join reached by `key`, allocating it on first use.
    pub fn join(&mut self, key: &[String], source: &str, relation: &str, target: &str) -> String {
        if let Some(&index) = self.by_key.get(key) {
            return self.joins[index].alias.clone();
        }

        let alias = format!("{}{}", self.alias_prefix, self.joins.len());
        tracing::trace!(%alias, source, relation, "allocated join");

        self.by_key.insert(key.to_vec(), self.joins.len());
        self.joins.push(Join {
            alias: alias.clone(),
            source: source.to_string(),
            relation: relation.to_string(),
            target: target.to_string(),
        });

        alias
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    #[must_use]
    pub fn into_joins(self) -> Vec<Join> {
        self.joins
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.joins.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}
