//! Row values and their conversions.
//!
//! A fetched row is a [`Row`]: column name to `sea_query::Value`. This module
//! compares key values during relation pairing, renders values as JSON, and
//! converts between `sea_query` values and `may_postgres` parameters/rows.

use crate::error::TideError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use may_postgres::types::{ToSql, Type};
use rust_decimal::Decimal;
use sea_query::{Value, Values};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Column name to value mapping for one database row.
pub type Row = BTreeMap<String, Value>;

/// Returns `true` for any `Value` variant holding `None`.
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none(),
        Value::TinyInt(v) => v.is_none(),
        Value::SmallInt(v) => v.is_none(),
        Value::Int(v) => v.is_none(),
        Value::BigInt(v) => v.is_none(),
        Value::TinyUnsigned(v) => v.is_none(),
        Value::SmallUnsigned(v) => v.is_none(),
        Value::Unsigned(v) => v.is_none(),
        Value::BigUnsigned(v) => v.is_none(),
        Value::Float(v) => v.is_none(),
        Value::Double(v) => v.is_none(),
        Value::String(v) => v.is_none(),
        Value::Char(v) => v.is_none(),
        Value::Bytes(v) => v.is_none(),
        Value::Json(v) => v.is_none(),
        Value::Uuid(v) => v.is_none(),
        Value::ChronoDate(v) => v.is_none(),
        Value::ChronoDateTime(v) => v.is_none(),
        Value::ChronoDateTimeUtc(v) => v.is_none(),
        Value::Decimal(v) => v.is_none(),
        _ => false,
    }
}

/// Integer view of a value, regardless of its width or signedness.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(Some(v)) => Some(i64::from(*v)),
        Value::SmallInt(Some(v)) => Some(i64::from(*v)),
        Value::Int(Some(v)) => Some(i64::from(*v)),
        Value::BigInt(Some(v)) => Some(*v),
        Value::TinyUnsigned(Some(v)) => Some(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => Some(i64::from(*v)),
        Value::Unsigned(Some(v)) => Some(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => i64::try_from(*v).ok(),
        _ => None,
    }
}

/// Key equality used when pairing related rows with their origin.
///
/// Integers compare numerically across widths (`int4` keys against `int8`
/// foreign keys); nulls never match anything.
pub fn values_match(a: &Value, b: &Value) -> bool {
    if is_null(a) || is_null(b) {
        return false;
    }
    match (as_i64(a), as_i64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Render a value as JSON for serialization of instances.
pub fn to_json(value: &Value) -> JsonValue {
    if is_null(value) {
        return JsonValue::Null;
    }
    if let Some(i) = as_i64(value) {
        return JsonValue::from(i);
    }
    match value {
        Value::BigUnsigned(Some(u)) => JsonValue::from(*u),
        Value::Bool(Some(b)) => JsonValue::Bool(*b),
        Value::Float(Some(f)) => JsonValue::from(f64::from(*f)),
        Value::Double(Some(d)) => JsonValue::from(*d),
        Value::String(Some(s)) => JsonValue::String(s.to_string()),
        Value::Char(Some(c)) => JsonValue::String(c.to_string()),
        Value::Bytes(Some(b)) => JsonValue::from(b.clone()),
        Value::Json(Some(j)) => JsonValue::clone(j),
        Value::Uuid(Some(u)) => JsonValue::String(u.to_string()),
        Value::ChronoDate(Some(d)) => JsonValue::String(d.to_string()),
        Value::ChronoDateTime(Some(d)) => JsonValue::String(d.to_string()),
        Value::ChronoDateTimeUtc(Some(d)) => JsonValue::String(d.to_rfc3339()),
        Value::Decimal(Some(d)) => JsonValue::String(d.to_string()),
        other => JsonValue::String(format!("{other:?}")),
    }
}

/// Convert one SeaQuery value into an owned `ToSql` parameter.
fn to_sql_param(value: &Value) -> Result<Box<dyn ToSql>, TideError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let converted = match v {
                Some(u) => Some(i64::try_from(*u).map_err(|_| {
                    TideError::QueryError(format!(
                        "BigUnsigned value {u} exceeds i64::MAX ({}), cannot be safely cast to i64",
                        i64::MAX
                    ))
                })?),
                None => None,
            };
            Box::new(converted)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.as_ref().map(|s| s.to_string())),
        Value::Char(v) => Box::new(v.map(|c| c.to_string())),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Json(v) => Box::new(v.as_ref().map(|j| JsonValue::clone(j))),
        Value::Uuid(v) => Box::new(v.as_ref().map(|u| uuid::Uuid::clone(u))),
        Value::ChronoDate(v) => Box::new(v.as_ref().map(|d| NaiveDate::clone(d))),
        Value::ChronoDateTime(v) => Box::new(v.as_ref().map(|d| NaiveDateTime::clone(d))),
        Value::ChronoDateTimeUtc(v) => Box::new(v.as_ref().map(|d| DateTime::<Utc>::clone(d))),
        Value::Decimal(v) => Box::new(v.as_ref().map(|d| Decimal::clone(d))),
        other => {
            return Err(TideError::QueryError(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(param)
}

/// Convert SeaQuery values to `may_postgres` parameters and run `f` with them.
///
/// The converted parameters only live for the duration of the closure.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, TideError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, TideError>,
{
    let owned = values
        .iter()
        .map(to_sql_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| &**p).collect();
    f(&params)
}

/// Decode a `may_postgres` row into a [`Row`].
pub fn decode_row(row: &may_postgres::Row) -> Result<Row, TideError> {
    let mut decoded = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &may_postgres::Row, idx: usize, ty: &Type) -> Result<Value, TideError> {
    let value: Value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.into()
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.into()
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.into()
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.into()
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.into()
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.into()
    } else if *ty == Type::NUMERIC {
        row.try_get::<_, Option<Decimal>>(idx)?.into()
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<JsonValue>>(idx)?.into()
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.into()
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx)?.into()
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)?.into()
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?.into()
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?.into()
    } else {
        // text, varchar, bpchar, name and anything else with a text representation
        row.try_get::<_, Option<String>>(idx)
            .map_err(|e| {
                TideError::ParseError(format!(
                    "Unsupported column type {ty} at index {idx}: {e}"
                ))
            })?
            .into()
    };
    Ok(value)
}
