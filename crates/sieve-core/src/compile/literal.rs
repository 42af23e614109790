use crate::{
    compile::{CompileError, timestamp::resolve_timestamp},
    model::ValueType,
};
use serde::{Serialize, Serializer, ser::SerializeSeq};
use std::fmt;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use ulid::Ulid;

///
/// Value
///
/// A literal typed against its property, ready to bind as a parameter.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(OffsetDateTime),
    Ulid(Ulid),
    Enum(String),
    List(Vec<Self>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) | Self::Enum(v) => write!(f, "'{v}'"),
            Self::Timestamp(v) => match v.format(&Rfc3339) {
                Ok(text) => write!(f, "'{text}'"),
                Err(_) => write!(f, "'{v}'"),
            },
            Self::Ulid(v) => write!(f, "'{v}'"),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(v) | Self::Enum(v) => serializer.serialize_str(v),
            Self::Timestamp(v) => {
                let text = v.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
            Self::Ulid(v) => serializer.collect_str(v),
            Self::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// Type a raw literal against the property it is compared with.
///
/// Integers and floats accept `min` / `max`; booleans accept
/// `true/yes/on` and `false/no/off`; enum variants match case-insensitively.
/// Timestamps accept ISO 8601 text or an anchor such as `today-P1D`, resolved
/// against the current time.
pub fn type_literal(field: &str, raw: &str, value_type: &ValueType) -> Result<Value, CompileError> {
    let invalid = |reason: String| CompileError::InvalidLiteral {
        field: field.to_string(),
        value: raw.to_string(),
        expected: value_type.label(),
        reason,
    };
    let trimmed = raw.trim();

    let value = match value_type {
        ValueType::Text => Value::Text(raw.to_string()),
        ValueType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Value::Bool(true),
            "false" | "no" | "off" => Value::Bool(false),
            _ => return Err(invalid("expected true/yes/on or false/no/off".to_string())),
        },
        ValueType::Int => {
            if trimmed.eq_ignore_ascii_case("min") {
                Value::Int(i64::MIN)
            } else if trimmed.eq_ignore_ascii_case("max") {
                Value::Int(i64::MAX)
            } else {
                Value::Int(trimmed.parse().map_err(|err| invalid(format!("{err}")))?)
            }
        }
        ValueType::Float => {
            if trimmed.eq_ignore_ascii_case("min") {
                Value::Float(f64::MIN)
            } else if trimmed.eq_ignore_ascii_case("max") {
                Value::Float(f64::MAX)
            } else {
                let parsed: f64 = trimmed.parse().map_err(|err| invalid(format!("{err}")))?;
                if !parsed.is_finite() {
                    return Err(invalid("value must be finite".to_string()));
                }
                Value::Float(parsed)
            }
        }
        ValueType::Timestamp => Value::Timestamp(
            resolve_timestamp(trimmed, OffsetDateTime::now_utc())
                .map_err(|err| invalid(err.to_string()))?,
        ),
        ValueType::Ulid => {
            Value::Ulid(Ulid::from_string(trimmed).map_err(|err| invalid(format!("{err}")))?)
        }
        ValueType::Enum(variants) => {
            let Some(variant) = variants
                .iter()
                .find(|variant| variant.eq_ignore_ascii_case(trimmed))
            else {
                return Err(CompileError::UnknownEnumVariant {
                    field: field.to_string(),
                    value: raw.to_string(),
                    expected: variants.clone(),
                });
            };
            Value::Enum(variant.clone())
        }
    };

    Ok(value)
}
