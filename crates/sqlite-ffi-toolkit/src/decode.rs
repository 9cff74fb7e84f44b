use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlite_ffi_conn::{Row, Value};

use crate::{Error, Result};

/// Convert a SQLite value to a JSON value.
///
/// Note: BLOB values are returned as base64-encoded strings since JSON
/// has no native binary type. Booleans read back from the engine arrive as
/// INTEGER and stay numbers.
pub fn to_json(value: &Value) -> Result<JsonValue> {
   let result = match value {
      Value::Null => JsonValue::Null,
      Value::Integer(v) => JsonValue::Number((*v).into()),
      Value::Real(v) => serde_json::Number::from_f64(*v)
         .map(JsonValue::Number)
         .ok_or_else(|| Error::UnsupportedDatatype(format!("non-finite REAL value: {v}")))?,
      Value::Text(v) => JsonValue::String(v.clone()),
      Value::Blob(blob) => JsonValue::String(base64_encode(blob)),
      Value::Boolean(v) => JsonValue::Bool(*v),
   };

   Ok(result)
}

/// Convert a JSON parameter into a bindable value.
///
/// Integers keep their precision when they fit in `i64`; larger unsigned
/// integers fall back to REAL. Arrays and objects have no column
/// representation and are rejected.
pub fn value_from_json(value: JsonValue) -> Result<Value> {
   let result = match value {
      JsonValue::Null => Value::Null,
      JsonValue::Bool(v) => Value::Boolean(v),
      JsonValue::String(v) => Value::Text(v),
      JsonValue::Number(number) => {
         if let Some(int_val) = number.as_i64() {
            Value::Integer(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Too large for i64, precision is lost
            Value::Real(uint_val as f64)
         } else {
            Value::Real(number.as_f64().unwrap_or_default())
         }
      }
      JsonValue::Array(_) => {
         return Err(sqlite_ffi_conn::Error::UnsupportedType("JSON array".into()).into());
      }
      JsonValue::Object(_) => {
         return Err(sqlite_ffi_conn::Error::UnsupportedType("JSON object".into()).into());
      }
   };

   Ok(result)
}

/// Convert a list of JSON parameters, stopping at the first unsupported one.
pub fn values_from_json(values: Vec<JsonValue>) -> Result<Vec<Value>> {
   values.into_iter().map(value_from_json).collect()
}

/// Decode the current row into an ordered column-name to JSON map.
///
/// Columns the engine reports no name for are keyed by their 0-based index.
pub fn row_to_map(row: &Row<'_>) -> Result<IndexMap<String, JsonValue>> {
   let mut map = IndexMap::with_capacity(row.column_count());
   for i in 0..row.column_count() {
      let name = row.column_name(i).unwrap_or_else(|| i.to_string());
      map.insert(name, to_json(&row.get(i))?);
   }
   Ok(map)
}

/// Base64 encode binary data for JSON serialization.
fn base64_encode(data: &[u8]) -> String {
   use base64::Engine;
   base64::engine::general_purpose::STANDARD.encode(data)
}
