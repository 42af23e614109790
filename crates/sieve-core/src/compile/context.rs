use crate::{
    compile::{literal::Value, predicate::Bindings},
    config::CompileConfig,
    model::{EntityModel, ModelCache},
    resolve::{Join, JoinPlan, PathResolver, ResolveError, ResolvedPath},
};
use std::sync::Arc;

///
/// CompileContext
///
/// Mutable state of one compilation: the join plan, bound parameters, and
/// the parameter counter. Created per call and consumed by `finish`.
///

pub(crate) struct CompileContext<'a> {
    resolver: PathResolver<'a>,
    joins: JoinPlan,
    bindings: Bindings,
    param_prefix: &'a str,
}

impl<'a> CompileContext<'a> {
    pub(crate) fn new(
        models: &'a ModelCache,
        root: Arc<EntityModel>,
        options: &'a CompileConfig,
    ) -> Self {
        Self {
            resolver: PathResolver::new(models, root, &options.root_alias),
            joins: JoinPlan::new(options.join_alias_prefix.as_str()),
            bindings: Bindings::new(),
            param_prefix: &options.param_prefix,
        }
    }

    pub(crate) fn resolve(&mut self, path: &str) -> Result<ResolvedPath, ResolveError> {
        self.resolver.resolve(path, &mut self.joins)
    }

    pub(crate) fn resolve_relation(&mut self, path: &str) -> Result<String, ResolveError> {
        self.resolver.resolve_relation(path, &mut self.joins)
    }

    /// Bind `value` under the next parameter name and return that name.
    pub(crate) fn bind(&mut self, value: Value) -> String {
        let name = format!("{}{}", self.param_prefix, self.bindings.len());
        self.bindings.push(name.clone(), value);

        name
    }

    pub(crate) fn finish(self) -> (Vec<Join>, Bindings) {
        (self.joins.into_joins(), self.bindings)
    }
}
