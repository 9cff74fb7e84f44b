//! Error types for sqlite-ffi-conn

use thiserror::Error;

use crate::config::DbConfig;

/// Errors that may occur when talking to the SQLite engine.
///
/// Variants that originate inside the engine carry its primary result code and
/// the diagnostic text reported by `sqlite3_errmsg` (or `sqlite3_exec`'s error
/// output) at the time of the failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
   /// The database file could not be opened or created
   #[error("can't open database '{path}': {message}")]
   Open {
      path: String,
      code: i32,
      message: String,
   },

   /// The SQL text could not be compiled into a statement
   #[error("error preparing query: {message}")]
   Prepare { code: i32, message: String },

   /// A parameter index was out of range, or the engine rejected the value
   #[error("error binding parameter {index}: {message}")]
   Bind {
      index: usize,
      code: i32,
      message: String,
   },

   /// The number of supplied values does not match the statement's placeholders
   #[error("error binding parameters: statement expects {expected} value(s), got {actual}")]
   BindCount { expected: usize, actual: usize },

   /// The engine reported something other than a row or completion
   #[error("error stepping statement: {message}")]
   Step { code: i32, message: String },

   /// One-shot execution failed
   #[error("error executing query: {message}")]
   Exec { code: i32, message: String },

   /// Closing the native handle failed
   #[error("error closing database: {message}")]
   Close { code: i32, message: String },

   /// Unknown configuration option, or the engine rejected the configuration call
   #[error("configuration option {option} failed: {message}")]
   Config { option: i32, message: String },

   /// Configuration option that needs pointer or allocator arguments
   #[error("sqlite3_db_config with {0:?} is not supported")]
   UnsupportedConfig(DbConfig),

   /// A bind value that has no representation in [`Value`](crate::Value)
   #[error("unsupported type {0}")]
   UnsupportedType(String),

   /// The connection has been closed and cannot be used
   #[error("database connection is closed")]
   ConnectionClosed,

   /// The statement has been finalized and cannot be used
   #[error("statement has been finalized")]
   StatementFinalized,
}

impl Error {
   /// The engine's primary result code, for variants that carry one.
   pub fn code(&self) -> Option<i32> {
      match self {
         Error::Open { code, .. }
         | Error::Prepare { code, .. }
         | Error::Bind { code, .. }
         | Error::Step { code, .. }
         | Error::Exec { code, .. }
         | Error::Close { code, .. } => Some(*code),
         _ => None,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// `BindCount` reports as `BIND_ERROR`; supplying the wrong number of values
   /// is a binding failure like any other.
   pub fn error_code(&self) -> String {
      match self {
         Error::Open { .. } => "OPEN_ERROR",
         Error::Prepare { .. } => "PREPARE_ERROR",
         Error::Bind { .. } | Error::BindCount { .. } => "BIND_ERROR",
         Error::Step { .. } => "STEP_ERROR",
         Error::Exec { .. } => "EXEC_ERROR",
         Error::Close { .. } => "CLOSE_ERROR",
         Error::Config { .. } => "CONFIG_ERROR",
         Error::UnsupportedConfig(_) => "UNSUPPORTED_CONFIG",
         Error::UnsupportedType(_) => "UNSUPPORTED_TYPE",
         Error::ConnectionClosed => "CONNECTION_CLOSED",
         Error::StatementFinalized => "STATEMENT_FINALIZED",
      }
      .to_string()
   }
}
