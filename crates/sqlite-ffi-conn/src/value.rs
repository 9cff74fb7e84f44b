//! Values that cross the binding boundary in either direction.

use std::ffi::c_int;

use libsqlite3_sys::{SQLITE_BLOB, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_NULL, SQLITE_TEXT};

use crate::error::Error;

/// Any datum that can be bound to a placeholder or read back from a column.
///
/// `Boolean` is not an engine type. It is bound as the integer 1 or 0 and read
/// back through [`Statement::column_bool`](crate::Statement::column_bool);
/// [`Statement::column_value`](crate::Statement::column_value) reports such a
/// column as `Integer`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
   Null,
   Integer(i64),
   Real(f64),
   Text(String),
   Blob(Vec<u8>),
   Boolean(bool),
}

impl Value {
   /// Name of the variant, used in diagnostics.
   pub fn type_name(&self) -> &'static str {
      match self {
         Value::Null => "null",
         Value::Integer(_) => "integer",
         Value::Real(_) => "real",
         Value::Text(_) => "text",
         Value::Blob(_) => "blob",
         Value::Boolean(_) => "boolean",
      }
   }

   pub fn is_null(&self) -> bool {
      matches!(self, Value::Null)
   }

   /// Interpret the value under the 0/1 boolean convention.
   pub fn as_bool(&self) -> Option<bool> {
      match self {
         Value::Boolean(b) => Some(*b),
         Value::Integer(0) => Some(false),
         Value::Integer(1) => Some(true),
         _ => None,
      }
   }
}

impl From<i32> for Value {
   fn from(v: i32) -> Self {
      Value::Integer(v.into())
   }
}

impl From<i64> for Value {
   fn from(v: i64) -> Self {
      Value::Integer(v)
   }
}

impl From<f32> for Value {
   fn from(v: f32) -> Self {
      Value::Real(v.into())
   }
}

impl From<f64> for Value {
   fn from(v: f64) -> Self {
      Value::Real(v)
   }
}

impl From<bool> for Value {
   fn from(v: bool) -> Self {
      Value::Boolean(v)
   }
}

impl From<&str> for Value {
   fn from(v: &str) -> Self {
      Value::Text(v.to_owned())
   }
}

impl From<String> for Value {
   fn from(v: String) -> Self {
      Value::Text(v)
   }
}

impl From<&[u8]> for Value {
   fn from(v: &[u8]) -> Self {
      Value::Blob(v.to_vec())
   }
}

impl From<Vec<u8>> for Value {
   fn from(v: Vec<u8>) -> Self {
      Value::Blob(v)
   }
}

impl<T: Into<Value>> From<Option<T>> for Value {
   fn from(v: Option<T>) -> Self {
      v.map_or(Value::Null, Into::into)
   }
}

impl TryFrom<u64> for Value {
   type Error = Error;

   fn try_from(v: u64) -> Result<Self, Self::Error> {
      i64::try_from(v)
         .map(Value::Integer)
         .map_err(|_| Error::UnsupportedType(format!("u64 {v} (exceeds i64::MAX)")))
   }
}

impl TryFrom<usize> for Value {
   type Error = Error;

   fn try_from(v: usize) -> Result<Self, Self::Error> {
      i64::try_from(v)
         .map(Value::Integer)
         .map_err(|_| Error::UnsupportedType(format!("usize {v} (exceeds i64::MAX)")))
   }
}

/// Storage class the engine reports for a column of the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
   Integer,
   Float,
   Text,
   Blob,
   Null,
}

impl ColumnType {
   pub(crate) fn from_raw(raw: c_int) -> Self {
      match raw {
         SQLITE_INTEGER => ColumnType::Integer,
         SQLITE_FLOAT => ColumnType::Float,
         SQLITE_TEXT => ColumnType::Text,
         SQLITE_BLOB => ColumnType::Blob,
         SQLITE_NULL => ColumnType::Null,
         _ => ColumnType::Null,
      }
   }
}
