use crate::{
    LIMIT_RETURN_ZERO,
    query::{
        ast::{Constraint, Group, GroupOp, Line},
        function::{Arity, FunctionKind},
        parser::{self, SyntaxError},
    },
};
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Request-construction failures raised before any schema is consulted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("constraint field name must not be empty")]
    EmptyField,

    #[error("function {function:?} on '{field}' expects a {expected:?} operand")]
    OperandMismatch {
        field: String,
        function: FunctionKind,
        expected: Arity,
    },

    #[error("IN list for '{field}' must not be empty")]
    EmptyList { field: String },

    #[error("function {function:?} on '{field}' does not compare against another field")]
    NotAFieldRef {
        field: String,
        function: FunctionKind,
    },

    #[error("ordering already contains field '{field}'")]
    DuplicateOrderField { field: String },

    #[error("limit must be {LIMIT_RETURN_ZERO} or greater, got {limit}")]
    InvalidLimit { limit: i32 },

    #[error("unknown projection '{value}'; expected one of entity, id, count")]
    UnknownProjection { value: String },

    #[error("unknown order direction '{value}'; expected asc or desc")]
    UnknownDirection { value: String },
}

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(QueryError::UnknownDirection {
                value: s.to_string(),
            })
        }
    }
}

///
/// Ordering
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Ordering {
    pub field: String,
    pub direction: OrderDirection,
}

impl Ordering {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// `field asc` / `field desc`, as used by the flat codec.
    #[must_use]
    pub fn legacy_form(&self) -> String {
        let direction = match self.direction {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        };

        format!("{} {direction}", self.field)
    }

    /// Parse one `field [asc|desc]` entry.
    pub fn parse_legacy(entry: &str) -> Result<Option<Self>, QueryError> {
        let mut words = entry.split_whitespace();
        let Some(field) = words.next() else {
            return Ok(None);
        };
        let direction = match words.next() {
            Some(word) => word.parse()?,
            None => OrderDirection::Asc,
        };
        if let Some(extra) = words.next() {
            return Err(QueryError::UnknownDirection {
                value: extra.to_string(),
            });
        }

        Ok(Some(Self::new(field, direction)))
    }
}

///
/// Projection
///
/// What a compiled query materializes.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Entities,
    Ids,
    Count,
}

impl Projection {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Entities => "entity",
            Self::Ids => "id",
            Self::Count => "count",
        }
    }
}

impl FromStr for Projection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entity" | "entities" => Ok(Self::Entities),
            "id" | "ids" => Ok(Self::Ids),
            "count" => Ok(Self::Count),
            _ => Err(QueryError::UnknownProjection {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

///
/// Query
///
/// Structured list request: constraints under an implicit top-level AND,
/// pagination, ordering, subclass filter, projection, and fetch hints.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Query {
    constraints: Group,
    offset: u32,
    limit: i32,
    compute_size: bool,
    subclass: Vec<String>,
    orderings: Vec<Ordering>,
    projection: Projection,
    expand: Vec<String>,
    dbfetch: Vec<String>,
    name: Option<String>,
    log_sql: bool,
    log_performance: Option<bool>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self {
            constraints: Group::and(),
            offset: 0,
            limit: 0,
            compute_size: false,
            subclass: Vec::new(),
            orderings: Vec::new(),
            projection: Projection::Entities,
            expand: Vec::new(),
            dbfetch: Vec::new(),
            name: None,
            log_sql: false,
            log_performance: None,
        }
    }

    /// Parse a rich-text query into a fresh request.
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        Self::new().apply_text(text)
    }

    /// Apply a rich-text query: its constraints replace the current ones;
    /// SELECT, EXPAND, and ORDER BY replace their counterparts when present.
    pub fn apply_text(mut self, text: &str) -> Result<Self, SyntaxError> {
        let parsed = parser::parse(text)?;

        self.constraints.clear();
        match parsed.constraints.op() {
            GroupOp::And => {
                for line in parsed.constraints.into_children() {
                    self.constraints.push(line);
                }
            }
            _ => match parsed.constraints.collapse() {
                Line::Group(group) if group.is_empty() => {}
                line => self.constraints.push(line),
            },
        }

        if let Some(projection) = parsed.select {
            self.projection = projection;
        }
        if let Some(expand) = parsed.expand {
            self.expand = expand;
        }
        if !parsed.orderings.is_empty() {
            self.orderings = parsed.orderings;
        }

        Ok(self)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// AND a constraint or group into the top level.
    #[must_use]
    pub fn add(mut self, line: impl Into<Line>) -> Self {
        self.constraints.push(line);
        self
    }

    /// Replace every top-level constraint.
    #[must_use]
    pub fn constraints(mut self, constraints: Group) -> Self {
        self.constraints = match constraints.op() {
            GroupOp::And => constraints,
            _ => Group::and().with(constraints),
        };
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Row cap: `-1` returns no rows, `0` defers to the configured default.
    pub fn limit(mut self, limit: i32) -> Result<Self, QueryError> {
        self.set_limit(limit)?;

        Ok(self)
    }

    #[must_use]
    pub const fn compute_size(mut self, compute_size: bool) -> Self {
        self.compute_size = compute_size;
        self
    }

    /// Restrict results to the given discriminators.
    #[must_use]
    pub fn subclass<I, S>(mut self, discriminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subclass = discriminators.into_iter().map(Into::into).collect();
        self
    }

    /// Append an ordering; a field may only be ordered once.
    pub fn order(
        mut self,
        field: impl Into<String>,
        direction: OrderDirection,
    ) -> Result<Self, QueryError> {
        self.push_order(Ordering::new(field, direction))?;

        Ok(self)
    }

    pub fn order_asc(self, field: impl Into<String>) -> Result<Self, QueryError> {
        self.order(field, OrderDirection::Asc)
    }

    pub fn order_desc(self, field: impl Into<String>) -> Result<Self, QueryError> {
        self.order(field, OrderDirection::Desc)
    }

    pub(crate) fn push_order(&mut self, ordering: Ordering) -> Result<(), QueryError> {
        ensure_unique_order(&self.orderings, &ordering.field)?;
        self.orderings.push(ordering);

        Ok(())
    }

    pub(crate) fn replace_orderings(&mut self, orderings: Vec<Ordering>) {
        self.orderings = orderings;
    }

    pub(crate) const fn constraints_mut(&mut self) -> &mut Group {
        &mut self.constraints
    }

    pub(crate) fn set_limit(&mut self, limit: i32) -> Result<(), QueryError> {
        if limit < LIMIT_RETURN_ZERO {
            return Err(QueryError::InvalidLimit { limit });
        }
        self.limit = limit;

        Ok(())
    }

    #[must_use]
    pub const fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Relations to expand in the response; a leading `-` excludes one.
    #[must_use]
    pub fn expand<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Relation paths to fetch eagerly alongside the results.
    #[must_use]
    pub fn dbfetch<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dbfetch = relations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn log_sql(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    #[must_use]
    pub const fn log_performance(mut self, log_performance: bool) -> Self {
        self.log_performance = Some(log_performance);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn constraint_group(&self) -> &Group {
        &self.constraints
    }

    #[must_use]
    pub const fn offset_value(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub const fn limit_value(&self) -> i32 {
        self.limit
    }

    #[must_use]
    pub const fn computes_size(&self) -> bool {
        self.compute_size
    }

    #[must_use]
    pub fn subclasses(&self) -> &[String] {
        &self.subclass
    }

    #[must_use]
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    #[must_use]
    pub const fn projection_mode(&self) -> Projection {
        self.projection
    }

    #[must_use]
    pub fn expansions(&self) -> &[String] {
        &self.expand
    }

    #[must_use]
    pub fn fetch_hints(&self) -> &[String] {
        &self.dbfetch
    }

    #[must_use]
    pub fn query_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn logs_sql(&self) -> bool {
        self.log_sql
    }

    #[must_use]
    pub const fn logs_performance(&self) -> Option<bool> {
        self.log_performance
    }

    /// Whether the request materializes no rows at all.
    #[must_use]
    pub const fn returns_zero_rows(&self) -> bool {
        self.limit == LIMIT_RETURN_ZERO
    }

    /// Every field named by a constraint, in document order.
    #[must_use]
    pub fn referenced_fields(&self) -> Vec<&str> {
        fn walk<'a>(group: &'a Group, out: &mut Vec<&'a str>) {
            for line in group.children() {
                match line {
                    Line::Constraint(c) => out.push(c.field()),
                    Line::Group(g) => walk(g, out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.constraints, &mut out);
        out
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Constraint> for Query {
    fn from(constraint: Constraint) -> Self {
        Self::new().add(constraint)
    }
}

pub(crate) fn ensure_unique_order(orderings: &[Ordering], field: &str) -> Result<(), QueryError> {
    if orderings
        .iter()
        .any(|existing| existing.field.eq_ignore_ascii_case(field))
    {
        return Err(QueryError::DuplicateOrderField {
            field: field.to_string(),
        });
    }

    Ok(())
}
