//! Query + entity metadata → backend-neutral predicate tree, joins, bound
//! parameters, ordering, and pagination.

mod context;
mod literal;
mod predicate;
mod render;
mod subclass;
mod timestamp;

#[cfg(test)]
mod tests;

pub use literal::{Value, type_literal};
pub use predicate::{Binding, Bindings, CompareOp, CompiledPredicate};
pub use timestamp::{Anchor, Period, TimestampError, resolve_timestamp};

use crate::{
    compile::context::CompileContext,
    config::{CompileConfig, Config},
    model::{ModelCache, ValueType},
    query::{
        Constraint, FunctionKind, Group, GroupOp, Line, OrderDirection, Projection, Query,
        SyntaxError,
    },
    resolve::{Join, ResolveError},
};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use thiserror::Error as ThisError;

///
/// CompileError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("invalid {expected} literal '{value}' for '{field}': {reason}")]
    InvalidLiteral {
        field: String,
        value: String,
        expected: &'static str,
        reason: String,
    },

    #[error(
        "unknown value '{value}' for '{field}'; expected one of {}",
        expected.join(", ")
    )]
    UnknownEnumVariant {
        field: String,
        value: String,
        expected: Vec<String>,
    },

    #[error("function {function} is not supported on {value_type} field '{field}'")]
    UnsupportedOperator {
        field: String,
        function: FunctionKind,
        value_type: &'static str,
    },

    #[error("cannot compare {left_type} field '{field}' with {right_type} field '{other}'")]
    IncompatibleFieldRef {
        field: String,
        other: String,
        left_type: &'static str,
        right_type: &'static str,
    },

    #[error("range on '{field}' needs at least one bound")]
    EmptyRange { field: String },

    #[error(
        "unknown subclass '{value}' of {entity}; expected one of {}",
        expected.join(", ")
    )]
    UnknownDiscriminator {
        entity: String,
        value: String,
        expected: Vec<String>,
    },
}

impl CompileError {
    /// Whether the request is well formed but asks for something the field
    /// type cannot do.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperator { .. } | Self::IncompatibleFieldRef { .. }
        )
    }
}

///
/// PageLimit
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLimit {
    Unbounded,
    Rows(u32),
    /// Materialize nothing; only a size computation is of interest.
    ZeroRows,
}

///
/// Pagination
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Pagination {
    pub offset: Option<u32>,
    pub limit: PageLimit,
}

impl Pagination {
    pub const UNBOUNDED: Self = Self {
        offset: None,
        limit: PageLimit::Unbounded,
    };
}

///
/// CompiledOrder
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompiledOrder {
    pub column: String,
    pub direction: OrderDirection,
}

///
/// CompiledQuery
///
/// Everything an executor needs: the root entity and alias, joins, the
/// predicate with its bindings, ordering, pagination, and projection.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub entity: String,
    pub primary_key: String,
    pub root_alias: String,
    pub projection: Projection,
    pub joins: Vec<Join>,
    pub predicate: Option<CompiledPredicate>,
    pub bindings: Bindings,
    pub ordering: Vec<CompiledOrder>,
    pub pagination: Pagination,
    pub compute_size: bool,
    pub expand: Vec<String>,
    pub fetch_relations: Vec<String>,
    pub name: Option<String>,
    pub log_sql: bool,
    pub log_performance: bool,
    #[serde(skip)]
    order_by_without_select: bool,
}

impl CompiledQuery {
    #[must_use]
    pub const fn is_zero_rows(&self) -> bool {
        matches!(self.pagination.limit, PageLimit::ZeroRows)
    }

    /// The COUNT form of this query, when a size was requested.
    #[must_use]
    pub fn size_query(&self) -> Option<Self> {
        self.compute_size.then(|| self.as_count())
    }

    /// Same predicate and joins, counting distinct roots.
    #[must_use]
    pub fn as_count(&self) -> Self {
        Self {
            projection: Projection::Count,
            ordering: Vec::new(),
            pagination: Pagination::UNBOUNDED,
            compute_size: false,
            ..self.clone()
        }
    }
}

///
/// Compiler
///
/// Stateless apart from the shared metadata cache; every call gets its own
/// [`CompileContext`].
///

#[derive(Clone, Debug)]
pub struct Compiler {
    models: Arc<ModelCache>,
    options: CompileConfig,
    default_limit: u32,
}

impl Compiler {
    #[must_use]
    pub const fn new(models: Arc<ModelCache>, options: CompileConfig, default_limit: u32) -> Self {
        Self {
            models,
            options,
            default_limit,
        }
    }

    #[must_use]
    pub fn from_config(models: Arc<ModelCache>, config: &Config) -> Self {
        Self::new(models, config.compile.clone(), config.query.default_limit)
    }

    #[must_use]
    pub const fn models(&self) -> &Arc<ModelCache> {
        &self.models
    }

    /// Parse `text` and compile it against `entity`.
    pub fn compile_text(&self, entity: &str, text: &str) -> Result<CompiledQuery, CompileError> {
        let query = Query::parse(text)?;

        self.compile(entity, &query)
    }

    pub fn compile(&self, entity: &str, query: &Query) -> Result<CompiledQuery, CompileError> {
        let started = Instant::now();

        let root = self
            .models
            .get(entity)
            .ok_or_else(|| ResolveError::UnknownEntity {
                entity: entity.to_string(),
            })?;
        let scope = subclass::scope(&self.models, root, query.subclasses())?;
        let entity = scope.entity.name.clone();
        let primary_key = scope.entity.primary_key.clone();
        let mut ctx = CompileContext::new(&self.models, scope.entity, &self.options);

        // where
        let mut predicates = Vec::new();
        for line in query.constraint_group().children() {
            if let Some(predicate) = compile_line(&mut ctx, line)? {
                predicates.push(predicate);
            }
        }
        if let Some(discriminators) = scope.discriminators {
            let values = discriminators.into_iter().map(Value::Text).collect();
            let param = ctx.bind(Value::List(values));
            predicates.push(CompiledPredicate::TypeIn {
                alias: self.options.root_alias.clone(),
                param,
            });
        }
        let predicate = (!predicates.is_empty()).then(|| CompiledPredicate::and(predicates));

        // order by
        let projection = query.projection_mode();
        let mut ordering = Vec::new();
        if projection != Projection::Count {
            for order in query.orderings() {
                let resolved = ctx.resolve(&order.field)?;
                ordering.push(CompiledOrder {
                    column: resolved.column,
                    direction: order.direction,
                });
            }
        }

        let fetch_relations = query
            .fetch_hints()
            .iter()
            .map(|path| ctx.resolve_relation(path))
            .collect::<Result<Vec<_>, _>>()?;

        let (joins, bindings) = ctx.finish();
        let compiled = CompiledQuery {
            entity,
            primary_key,
            root_alias: self.options.root_alias.clone(),
            projection,
            joins,
            predicate,
            bindings,
            ordering,
            pagination: self.pagination(query),
            compute_size: query.computes_size(),
            expand: query.expansions().to_vec(),
            fetch_relations,
            name: query.query_name().map(ToString::to_string),
            log_sql: query.logs_sql(),
            log_performance: query.logs_performance().unwrap_or(false),
            order_by_without_select: self.options.order_by_without_select,
        };

        tracing::debug!(
            entity = %compiled.entity,
            joins = compiled.joins.len(),
            bindings = compiled.bindings.len(),
            "compiled query"
        );
        if compiled.log_sql {
            tracing::info!(
                target: "sieve::sql",
                name = compiled.name.as_deref().unwrap_or(""),
                bindings = ?compiled.bindings,
                "{}",
                compiled.to_query_text()
            );
        }
        if compiled.log_performance {
            tracing::info!(
                target: "sieve::perf",
                entity = %compiled.entity,
                elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                "compile finished"
            );
        }

        Ok(compiled)
    }

    fn pagination(&self, query: &Query) -> Pagination {
        if query.projection_mode() == Projection::Count {
            return Pagination::UNBOUNDED;
        }

        let limit = match query.limit_value() {
            crate::LIMIT_RETURN_ZERO => PageLimit::ZeroRows,
            0 => PageLimit::Rows(self.default_limit),
            n => u32::try_from(n).map_or(PageLimit::Unbounded, PageLimit::Rows),
        };

        Pagination {
            offset: (query.offset_value() > 0).then_some(query.offset_value()),
            limit,
        }
    }
}

// ----------------------------------------------------------------------
// Constraint compilation
// ----------------------------------------------------------------------

fn compile_line(
    ctx: &mut CompileContext<'_>,
    line: &Line,
) -> Result<Option<CompiledPredicate>, CompileError> {
    match line {
        Line::Constraint(constraint) => compile_constraint(ctx, constraint).map(Some),
        Line::Group(group) => compile_group(ctx, group),
    }
}

fn compile_group(
    ctx: &mut CompileContext<'_>,
    group: &Group,
) -> Result<Option<CompiledPredicate>, CompileError> {
    let mut children = Vec::with_capacity(group.len());
    for child in group.children() {
        if let Some(predicate) = compile_line(ctx, child)? {
            children.push(predicate);
        }
    }
    if children.is_empty() {
        return Ok(None);
    }

    Ok(Some(match group.op() {
        GroupOp::And => CompiledPredicate::and(children),
        GroupOp::Or => CompiledPredicate::or(children),
        GroupOp::None => CompiledPredicate::not(CompiledPredicate::or(children)),
    }))
}

fn compile_constraint(
    ctx: &mut CompileContext<'_>,
    constraint: &Constraint,
) -> Result<CompiledPredicate, CompileError> {
    let field = constraint.field();
    let function = constraint.function();
    let resolved = ctx.resolve(field)?;
    let value_type = resolved.value_type().clone();
    let column = resolved.column;

    let require = |supported: bool| {
        if supported {
            Ok(())
        } else {
            Err(CompileError::UnsupportedOperator {
                field: field.to_string(),
                function,
                value_type: value_type.label(),
            })
        }
    };
    let value = constraint.value().unwrap_or_default();

    let predicate = match function {
        FunctionKind::Eq
        | FunctionKind::Neq
        | FunctionKind::Lt
        | FunctionKind::Le
        | FunctionKind::Gt
        | FunctionKind::Ge => {
            let op = compare_op(function);
            require(!op.is_ordering() || value_type.supports_ordering())?;
            let param = ctx.bind(type_literal(field, value, &value_type)?);

            CompiledPredicate::Compare { column, op, param }
        }

        FunctionKind::IsNull | FunctionKind::NotNull => CompiledPredicate::IsNull {
            column,
            negated: function == FunctionKind::NotNull,
        },

        FunctionKind::Contains
        | FunctionKind::NotContains
        | FunctionKind::StartsWith
        | FunctionKind::NotStartsWith => {
            require(value_type.supports_text_match())?;
            let pattern = match function {
                FunctionKind::Contains | FunctionKind::NotContains => format!("%{value}%"),
                _ => format!("{value}%"),
            };
            let param = ctx.bind(Value::Text(pattern));

            CompiledPredicate::Like {
                column,
                param,
                negated: matches!(
                    function,
                    FunctionKind::NotContains | FunctionKind::NotStartsWith
                ),
            }
        }

        FunctionKind::Range => {
            require(value_type.supports_ordering())?;
            compile_range(ctx, field, column, &value_type, value, constraint.value2())?
        }

        FunctionKind::In | FunctionKind::NotIn => {
            let values = constraint
                .values()
                .iter()
                .map(|raw| type_literal(field, raw, &value_type))
                .collect::<Result<Vec<_>, _>>()?;
            let param = ctx.bind(Value::List(values));

            CompiledPredicate::InList {
                column,
                param,
                negated: function == FunctionKind::NotIn,
            }
        }

        FunctionKind::EqRef
        | FunctionKind::NeqRef
        | FunctionKind::LeRef
        | FunctionKind::LtRef
        | FunctionKind::GeRef
        | FunctionKind::GtRef => {
            let op = compare_op(function);
            require(!op.is_ordering() || value_type.supports_ordering())?;
            let other = ctx.resolve(value)?;
            if !value_type.is_comparable_with(other.value_type()) {
                return Err(CompileError::IncompatibleFieldRef {
                    field: field.to_string(),
                    other: value.to_string(),
                    left_type: value_type.label(),
                    right_type: other.value_type().label(),
                });
            }

            CompiledPredicate::CompareColumns {
                left: column,
                op,
                right: other.column,
            }
        }
    };

    Ok(predicate)
}

fn compile_range(
    ctx: &mut CompileContext<'_>,
    field: &str,
    column: String,
    value_type: &ValueType,
    low: &str,
    high: Option<&str>,
) -> Result<CompiledPredicate, CompileError> {
    let high = high.unwrap_or_default();

    match (low.is_empty(), high.is_empty()) {
        (true, true) => Err(CompileError::EmptyRange {
            field: field.to_string(),
        }),
        (false, true) => Ok(CompiledPredicate::Compare {
            column,
            op: CompareOp::Ge,
            param: ctx.bind(type_literal(field, low, value_type)?),
        }),
        (true, false) => Ok(CompiledPredicate::Compare {
            column,
            op: CompareOp::Le,
            param: ctx.bind(type_literal(field, high, value_type)?),
        }),
        (false, false) => {
            let low = ctx.bind(type_literal(field, low, value_type)?);
            let high = ctx.bind(type_literal(field, high, value_type)?);

            Ok(CompiledPredicate::Between { column, low, high })
        }
    }
}

const fn compare_op(function: FunctionKind) -> CompareOp {
    match function {
        FunctionKind::Neq | FunctionKind::NeqRef => CompareOp::Ne,
        FunctionKind::Lt | FunctionKind::LtRef => CompareOp::Lt,
        FunctionKind::Le | FunctionKind::LeRef => CompareOp::Le,
        FunctionKind::Gt | FunctionKind::GtRef => CompareOp::Gt,
        FunctionKind::Ge | FunctionKind::GeRef => CompareOp::Ge,
        _ => CompareOp::Eq,
    }
}
