//! Row decoding for SQL results
//!
//! Converts sqlx `AnyRow` instances to engine values, dispatching on the Any driver's
//! type names. Types the Any driver cannot represent fail before reaching here; the
//! error suggests a cast.

use super::EngineValue;
use crate::error::GateError;
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo};

/// Column names of a row, in engine order
pub fn column_names(row: &AnyRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Convert a sqlx row to engine values in column order
///
/// # Errors
/// Returns `GateError::Execution` if a column cannot be decoded as its reported type
pub fn row_to_values(row: &AnyRow) -> Result<Vec<EngineValue>, GateError> {
    let mut values = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let ordinal = column.ordinal();
        let type_name = column.type_info().name();

        let value = match type_name {
            "NULL" => EngineValue::Null,
            "BOOLEAN" => decode::<bool>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, EngineValue::Bool),
            "SMALLINT" => decode::<i16>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, |v| EngineValue::Int(v.into())),
            "INTEGER" => decode::<i32>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, |v| EngineValue::Int(v.into())),
            "BIGINT" => decode::<i64>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, EngineValue::Int),
            "REAL" => decode::<f32>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, |v| EngineValue::Float(v.into())),
            "DOUBLE" => decode::<f64>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, EngineValue::Float),
            "BLOB" => decode::<Vec<u8>>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, EngineValue::Bytes),
            // TEXT, and anything else the driver can still hand over as a string
            _ => decode::<String>(row, ordinal, type_name)?
                .map_or(EngineValue::Null, EngineValue::Text),
        };

        values.push(value);
    }

    Ok(values)
}

fn decode<'r, T>(row: &'r AnyRow, ordinal: usize, type_name: &str) -> Result<Option<T>, GateError>
where
    T: sqlx::Decode<'r, sqlx::Any> + sqlx::Type<sqlx::Any>,
{
    row.try_get::<Option<T>, _>(ordinal).map_err(|e| {
        let name = row
            .columns()
            .get(ordinal)
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        GateError::Execution(format!(
            "Failed to extract column '{}' as {}: {}. \
             Consider casting this column in your query: CAST({} AS TEXT)",
            name, type_name, e, name
        ))
    })
}
