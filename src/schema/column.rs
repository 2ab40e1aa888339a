//! Column descriptors: the per-property facts validation and storage need.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Storage kind of a column. Drives SQL casts, DDL and query-string coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    BigInt,
    Double,
    Bool,
    Text,
    Date,
    Timestamptz,
    Jsonb,
}

impl ColumnKind {
    /// PostgreSQL type name used in casts (`$1::date`) and column definitions.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Int => "integer",
            ColumnKind::BigInt => "bigint",
            ColumnKind::Double => "double precision",
            ColumnKind::Bool => "boolean",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Timestamptz => "timestamptz",
            ColumnKind::Jsonb => "jsonb",
        }
    }

    /// Typed value for a raw query-string value, or `None` when `raw` is not a valid
    /// value of this kind. Dates and timestamps come back in the form entities serialize to.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            ColumnKind::Int => raw
                .parse::<i32>()
                .ok()
                .map(|n| Value::Number(n.into())),
            ColumnKind::BigInt => raw
                .parse::<i64>()
                .ok()
                .map(|n| Value::Number(n.into())),
            ColumnKind::Double => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ColumnKind::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            ColumnKind::Text => Some(Value::String(raw.to_string())),
            ColumnKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            ColumnKind::Timestamptz => DateTime::parse_from_rfc3339(raw).ok().map(|t| {
                Value::String(
                    t.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::AutoSi, true),
                )
            }),
            ColumnKind::Jsonb => serde_json::from_str(raw).ok(),
        }
    }

    /// Whether a non-null JSON value can be stored in a column of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ColumnKind::Int => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
            ColumnKind::BigInt => value.is_i64(),
            ColumnKind::Double => value.is_number(),
            ColumnKind::Bool => value.is_boolean(),
            ColumnKind::Text => value.is_string(),
            ColumnKind::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            ColumnKind::Timestamptz => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            ColumnKind::Jsonb => true,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ColumnKind::Int | ColumnKind::BigInt => "an integer",
            ColumnKind::Double => "a number",
            ColumnKind::Bool => "a boolean",
            ColumnKind::Text => "a string",
            ColumnKind::Date => "a date (YYYY-MM-DD)",
            ColumnKind::Timestamptz => "an RFC 3339 timestamp",
            ColumnKind::Jsonb => "JSON",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub property_name: String,
    pub is_primary: bool,
    pub is_nullable: bool,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    /// Non-nullable domain column.
    pub fn required(property_name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnDescriptor {
            property_name: property_name.into(),
            is_primary: false,
            is_nullable: false,
            kind,
        }
    }

    /// Nullable domain column.
    pub fn optional(property_name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnDescriptor {
            is_nullable: true,
            ..ColumnDescriptor::required(property_name, kind)
        }
    }

    pub(crate) fn primary(property_name: impl Into<String>) -> Self {
        ColumnDescriptor {
            is_primary: true,
            ..ColumnDescriptor::required(property_name, ColumnKind::BigInt)
        }
    }
}
