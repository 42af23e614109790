use crate::{
    DEFAULT_LIMIT,
    query::{
        ast::{Constraint, Group, GroupOp, Line, Operand},
        function::{Arity, FunctionKind},
        intent::{Ordering, Projection, Query, QueryError, ensure_unique_order},
        parser::SyntaxError,
    },
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// FlatMap
///
/// Key → values map as submitted by simple query-string requests.
///

pub type FlatMap = BTreeMap<String, Vec<String>>;

/// Rich-text fallback key.
pub const TEXT_KEY: &str = "q";

/// Reserved control keys, in the order they are documented.
pub const CONTROL_KEYS: [&str; 11] = [
    "_offset",
    "_limit",
    "_order",
    "_compute_size",
    "_log_sql",
    "_log_performance",
    "_class",
    "_expand",
    "_fetch",
    "_dbfetch",
    "_name",
];

///
/// DecodeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("unknown control field '{key}'; expected one of {}", CONTROL_KEYS.join(", "))]
    UnknownControlField { key: String },

    #[error("'{key}' expects an integer, got '{value}'")]
    InvalidInteger { key: String, value: String },

    #[error("'{key}' expects true/yes/on or false/no/off, got '{value}'")]
    InvalidBoolean { key: String, value: String },

    #[error("'{key}' accepts a single value, got {count}")]
    MultipleValues { key: String, count: usize },

    #[error("unknown function prefix in '{value}' for field '{field}'")]
    UnknownFunction { field: String, value: String },

    #[error("range value '{value}' for field '{field}' must be written as low..high")]
    MalformedRange { field: String, value: String },

    #[error("function {function:?} cannot be expressed as a flat value")]
    NotFlatFunction { function: FunctionKind },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

///
/// EncodeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EncodeError {
    #[error("value contains every quote character and cannot be printed: {value}")]
    UnquotableValue { value: String },

    #[error("field name '{field}' cannot be written as query text")]
    UnprintableField { field: String },

    #[error("query is not expressible as simple flat fields: {reason}")]
    NotSimple { reason: String },
}

///
/// FlatCodec
///
/// Translates between [`Query`] and the flat key → values form.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlatCodec {
    default_limit: u32,
}

impl Default for FlatCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl FlatCodec {
    #[must_use]
    pub const fn new(default_limit: u32) -> Self {
        Self { default_limit }
    }

    /// Decode a flat map into a fresh request.
    pub fn decode(&self, map: &FlatMap) -> Result<Query, DecodeError> {
        let limit = i32::try_from(self.default_limit).unwrap_or(i32::MAX);

        self.decode_into(Query::new().limit(limit)?, map)
    }

    /// Decode a flat map on top of an existing request.
    ///
    /// `q` is applied first and replaces existing constraints; otherwise the
    /// first field constraint clears them.
    pub fn decode_into(&self, mut query: Query, map: &FlatMap) -> Result<Query, DecodeError> {
        let mut has_constraints = false;

        if let Some(values) = map.get(TEXT_KEY) {
            let text = single(TEXT_KEY, values)?;
            query = query.apply_text(text)?;
            has_constraints = true;
        }

        for (key, values) in map {
            if key == TEXT_KEY {
                continue;
            }

            // control keys are validated even when they carry no value
            if key.starts_with('_') {
                if !CONTROL_KEYS.contains(&key.as_str()) {
                    return Err(DecodeError::UnknownControlField { key: key.clone() });
                }
                if !values.is_empty() {
                    query = decode_control(query, key, values)?;
                }
                continue;
            }
            if values.is_empty() {
                continue;
            }

            if !has_constraints {
                query.constraints_mut().clear();
                has_constraints = true;
            }

            let mut lines = values
                .iter()
                .map(|value| decode_value(key, value).map(Line::Constraint))
                .collect::<Result<Vec<_>, _>>()?;

            let line = if lines.len() == 1 {
                lines.remove(0)
            } else {
                Line::Group(Group::with_children(GroupOp::Or, lines))
            };
            query.constraints_mut().push(line);
        }

        Ok(query)
    }

    /// Encode a request, falling back to `q` when the constraints are not
    /// expressible as simple flat fields.
    pub fn encode(&self, query: &Query) -> Result<FlatMap, EncodeError> {
        let mut map = encode_controls(query);

        if simple_violation(query).is_none() {
            encode_constraints(query, &mut map);
        } else if !query.constraint_group().is_empty() {
            map.insert(TEXT_KEY.to_string(), vec![query.constraints_text()?]);
        }

        Ok(map)
    }

    /// Encode a request as simple flat fields only.
    pub fn encode_simple(&self, query: &Query) -> Result<FlatMap, EncodeError> {
        if let Some(reason) = simple_violation(query) {
            return Err(EncodeError::NotSimple { reason });
        }

        let mut map = encode_controls(query);
        encode_constraints(query, &mut map);

        Ok(map)
    }
}

impl Query {
    /// Decode a flat map with the stock default limit.
    pub fn decode_flat(map: &FlatMap) -> Result<Self, DecodeError> {
        FlatCodec::default().decode(map)
    }

    /// Encode as flat fields, falling back to `q` where needed.
    pub fn to_flat(&self) -> Result<FlatMap, EncodeError> {
        FlatCodec::default().encode(self)
    }
}

// ----------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------

fn single<'a>(key: &str, values: &'a [String]) -> Result<&'a str, DecodeError> {
    match values {
        [value] => Ok(value),
        _ => Err(DecodeError::MultipleValues {
            key: key.to_string(),
            count: values.len(),
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DecodeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(DecodeError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DecodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidInteger {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn decode_control(query: Query, key: &str, values: &[String]) -> Result<Query, DecodeError> {
    let query = match key {
        "_offset" => query.offset(parse_int(key, single(key, values)?)?),
        "_limit" => query.limit(parse_int(key, single(key, values)?)?)?,
        "_compute_size" => query.compute_size(parse_bool(key, single(key, values)?)?),
        "_log_sql" => query.log_sql(parse_bool(key, single(key, values)?)?),
        "_log_performance" => query.log_performance(parse_bool(key, single(key, values)?)?),
        "_class" => query.subclass(split_list(values)),
        "_expand" => query.expand(split_list(values)),
        "_dbfetch" => query.dbfetch(split_list(values)),
        "_fetch" => query.projection(split_list(values).join(",").parse()?),
        "_name" => query.name(single(key, values)?),
        "_order" => {
            let mut orderings: Vec<Ordering> = Vec::new();
            for entry in values.iter().flat_map(|value| value.split(',')) {
                if let Some(ordering) = Ordering::parse_legacy(entry)? {
                    ensure_unique_order(&orderings, &ordering.field)?;
                    orderings.push(ordering);
                }
            }

            let mut query = query;
            query.replace_orderings(orderings);
            query
        }
        _ => {
            return Err(DecodeError::UnknownControlField {
                key: key.to_string(),
            });
        }
    };

    Ok(query)
}

/// Decode one flat value for `field` into a constraint.
pub fn decode_value(field: &str, value: &str) -> Result<Constraint, DecodeError> {
    if value.eq_ignore_ascii_case(FunctionKind::NULL_SENTINEL) {
        return Ok(Constraint::is_null(field));
    }
    if value.eq_ignore_ascii_case(FunctionKind::NOT_NULL_SENTINEL) {
        return Ok(Constraint::is_not_null(field));
    }

    let is_prefixed = value
        .get(..FunctionKind::PREFIX_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(FunctionKind::PREFIX_MARKER));
    if !is_prefixed {
        return Ok(Constraint::eq(field, value));
    }

    let Some((function, rest)) = FunctionKind::match_flat_prefix(value) else {
        return Err(DecodeError::UnknownFunction {
            field: field.to_string(),
            value: value.to_string(),
        });
    };

    let operand = match function.arity() {
        Arity::Unary => Operand::Value(rest.to_string()),
        Arity::Binary => {
            let Some((low, high)) = rest.split_once(FunctionKind::RANGE_SEPARATOR) else {
                return Err(DecodeError::MalformedRange {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            };
            Operand::Range(low.to_string(), high.to_string())
        }
        Arity::Nullary | Arity::List => {
            return Err(DecodeError::NotFlatFunction { function });
        }
    };

    Ok(Constraint::new(field, function, operand)?)
}

// ----------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------

fn encode_controls(query: &Query) -> FlatMap {
    let mut map = FlatMap::new();
    let mut put = |key: &str, values: Vec<String>| {
        map.insert(key.to_string(), values);
    };

    if query.projection_mode() != Projection::Entities {
        put("_fetch", vec![query.projection_mode().to_string()]);
    }
    if !query.fetch_hints().is_empty() {
        put("_dbfetch", vec![query.fetch_hints().join(",")]);
    }
    if !query.expansions().is_empty() {
        put("_expand", vec![query.expansions().join(",")]);
    }
    if !query.orderings().is_empty() {
        put(
            "_order",
            query.orderings().iter().map(Ordering::legacy_form).collect(),
        );
    }
    if query.offset_value() > 0 {
        put("_offset", vec![query.offset_value().to_string()]);
    }
    put("_limit", vec![query.limit_value().to_string()]);
    if query.computes_size() {
        put("_compute_size", vec!["true".to_string()]);
    }
    if !query.subclasses().is_empty() {
        put("_class", vec![query.subclasses().join(",")]);
    }
    if let Some(name) = query.query_name() {
        put("_name", vec![name.to_string()]);
    }
    if query.logs_sql() {
        put("_log_sql", vec!["true".to_string()]);
    }
    if let Some(log_performance) = query.logs_performance() {
        put("_log_performance", vec![log_performance.to_string()]);
    }

    map
}

// Only called once `simple_violation` has accepted the query.
fn encode_constraints(query: &Query, map: &mut FlatMap) {
    for line in query.constraint_group().children() {
        match line {
            Line::Constraint(constraint) => {
                map.insert(
                    constraint.field().to_string(),
                    vec![encode_value(constraint)],
                );
            }
            Line::Group(group) => {
                let mut field = None;
                let mut values = Vec::with_capacity(group.len());
                for child in group.children() {
                    if let Line::Constraint(constraint) = child {
                        field = Some(constraint.field());
                        values.push(encode_value(constraint));
                    }
                }
                if let Some(field) = field {
                    map.insert(field.to_string(), values);
                }
            }
        }
    }
}

/// Encode one constraint's function and operand as a flat value.
fn encode_value(constraint: &Constraint) -> String {
    let function = constraint.function();

    match (function, constraint.operand()) {
        (FunctionKind::IsNull, _) => FunctionKind::NULL_SENTINEL.to_string(),
        (FunctionKind::NotNull, _) => FunctionKind::NOT_NULL_SENTINEL.to_string(),
        (FunctionKind::Eq, Operand::Value(value)) if !value.starts_with('_') => value.clone(),
        (_, Operand::Range(low, high)) => format!(
            "{}{low}{}{high}",
            function.flat_prefix().unwrap_or_default(),
            FunctionKind::RANGE_SEPARATOR
        ),
        (_, operand) => {
            let value = match operand {
                Operand::Value(value) => value.as_str(),
                _ => "",
            };
            format!("{}{value}", function.flat_prefix().unwrap_or_default())
        }
    }
}

/// Why the constraints fall outside the simple flat subset, if they do.
fn simple_violation(query: &Query) -> Option<String> {
    check_simple(query).err()
}

fn check_simple(query: &Query) -> Result<(), String> {
    let mut seen = BTreeSet::new();

    for line in query.constraint_group().children() {
        let field = match line {
            Line::Constraint(constraint) => {
                check_simple_constraint(constraint)?;
                constraint.field()
            }
            Line::Group(group) => check_simple_group(group)?,
        };

        if !seen.insert(field.to_ascii_lowercase()) {
            return Err(format!("field '{field}' is constrained more than once"));
        }
    }

    Ok(())
}

// A flat key with several values decodes to an OR over one field.
fn check_simple_group(group: &Group) -> Result<&str, String> {
    if group.op() != GroupOp::Or {
        return Err(format!("{:?} groups have no flat form", group.op()));
    }
    if group.len() < 2 {
        return Err("single-member groups have no flat form".to_string());
    }

    let mut field: Option<&str> = None;
    for child in group.children() {
        let Line::Constraint(constraint) = child else {
            return Err("nested groups have no flat form".to_string());
        };
        check_simple_constraint(constraint)?;

        match field {
            Some(first) if first != constraint.field() => {
                return Err(format!(
                    "OR group spans fields '{first}' and '{}'",
                    constraint.field()
                ));
            }
            _ => field = Some(constraint.field()),
        }
    }

    field.ok_or_else(|| "empty group".to_string())
}

fn check_simple_constraint(constraint: &Constraint) -> Result<(), String> {
    let field = constraint.field();
    if field.is_empty() {
        return Err("empty field name has no flat form".to_string());
    }
    if field == TEXT_KEY || field.starts_with('_') {
        return Err(format!("field '{field}' collides with a reserved key"));
    }

    match constraint.operand() {
        Operand::List(_) => Err(format!("IN list on '{field}' has no flat form")),
        Operand::Range(low, _)
            if low.contains(FunctionKind::RANGE_SEPARATOR) || low.ends_with('.') =>
        {
            Err(format!("range bound '{low}' on '{field}' is ambiguous"))
        }
        _ => Ok(()),
    }
}
