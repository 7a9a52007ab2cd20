//! SQLite type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the runtime storage class of a value
//! 2. `decode_column` extracts the value as the matching [`Value`] variant
//!
//! SQLite reports the storage class of each stored value, never the declared
//! column type, so booleans read back as `Value::Int` and JSON as
//! `Value::String`.

use crate::error::DbResult;
use crate::models::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Logical category for a SQLite storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Null,
    Integer,
    Float,
    Text,
    Binary,
}

/// Classify a SQLite type name into a storage category, following SQLite's
/// column affinity rules.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "null" {
        return TypeCategory::Null;
    }

    if lower.contains("int") {
        return TypeCategory::Integer;
    }

    if lower.contains("real") || lower.contains("floa") || lower.contains("doub") {
        return TypeCategory::Float;
    }

    if lower.contains("blob") {
        return TypeCategory::Binary;
    }

    // Default to text for everything else (varchar, text, char, date, time, etc.)
    TypeCategory::Text
}

/// Decode column `idx` of `row` by the storage class of the stored value.
pub fn decode_column(row: &SqliteRow, idx: usize) -> DbResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match categorize_type(raw.type_info().name()) {
        TypeCategory::Null => Value::Null,
        TypeCategory::Integer => Value::Int(row.try_get::<i64, _>(idx)?),
        TypeCategory::Float => Value::Float(row.try_get::<f64, _>(idx)?),
        TypeCategory::Binary => Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
        TypeCategory::Text => Value::String(row.try_get::<String, _>(idx)?),
    };
    Ok(value)
}
