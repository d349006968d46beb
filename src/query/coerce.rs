use crate::errors::AccessError;
use crate::query::scope::{FieldType, Scope};
use bson::Bson;
use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Converts a textual filter operand into the target field's native BSON
/// form, using the scope's element type to pick the target.
///
/// Fields the descriptor does not declare pass through as plain strings;
/// the store is schemaless and undeclared fields carry no type information.
///
/// # Errors
/// Returns `LiteralCoercion` naming the field and the offending value when
/// the text does not parse as the declared type.
pub fn coerce_literal(scope: &Scope<'_>, field: &str, literal: &str) -> Result<Bson, AccessError> {
    let ty = scope.field_type(field).unwrap_or(FieldType::String);
    coerce(field, literal, ty)
}

pub(crate) fn coerce(field: &str, literal: &str, ty: FieldType) -> Result<Bson, AccessError> {
    match ty {
        FieldType::String => Ok(Bson::String(literal.to_owned())),
        FieldType::Int => literal
            .parse::<i64>()
            .map(Bson::Int64)
            .map_err(|_| coercion_error(field, literal, "integer")),
        FieldType::Double => literal
            .parse::<f64>()
            .map(Bson::Double)
            .map_err(|_| coercion_error(field, literal, "double")),
        FieldType::Bool => literal
            .parse::<bool>()
            .map(Bson::Boolean)
            .map_err(|_| coercion_error(field, literal, "boolean")),
        FieldType::ObjectId => bson::oid::ObjectId::parse_str(literal)
            .map(Bson::ObjectId)
            .map_err(|_| coercion_error(field, literal, "object id")),
        FieldType::DateTime => parse_timestamp(field, literal).map(Bson::DateTime),
    }
}

/// Timestamp literals compare against values the store persists normalized
/// to UTC. A literal carrying an explicit offset is converted to UTC; a
/// literal without one is interpreted *as* UTC, never as local time, so the
/// clock time in the literal lines up with the stored clock time.
fn parse_timestamp(field: &str, literal: &str) -> Result<bson::DateTime, AccessError> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(literal) {
        let utc = dt.with_timezone(&Utc);
        return Ok(bson::DateTime::from_millis(utc.timestamp_millis()));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(literal, fmt) {
            return Ok(bson::DateTime::from_millis(naive.and_utc().timestamp_millis()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(literal, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(bson::DateTime::from_millis(naive.and_utc().timestamp_millis()));
    }
    Err(coercion_error(field, literal, "timestamp"))
}

fn coercion_error(field: &str, value: &str, target: &'static str) -> AccessError {
    AccessError::LiteralCoercion {
        field: field.to_owned(),
        value: value.to_owned(),
        target,
    }
}
