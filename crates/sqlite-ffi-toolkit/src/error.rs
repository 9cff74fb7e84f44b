/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SQLite toolkit operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the connection layer.
   #[error(transparent)]
   Connection(#[from] sqlite_ffi_conn::Error),

   /// A bulk insert aborted at `row` and was rolled back.
   ///
   /// `column` is set when the failure happened while binding a specific value.
   #[error("bulk insert failed at row {row}{}: {message}", column_suffix(.column))]
   BulkInsert {
      row: usize,
      column: Option<usize>,
      message: String,
   },

   /// SQLite value that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Multiple rows returned from fetch_one query.
   #[error("fetch_one() query returned {0} rows, expected 0 or 1")]
   MultipleRowsReturned(usize),
}

fn column_suffix(column: &Option<usize>) -> String {
   column.map(|c| format!(", column {c}")).unwrap_or_default()
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Connection-layer errors keep their own code.
   pub fn error_code(&self) -> String {
      match self {
         Error::Connection(e) => e.error_code(),
         Error::BulkInsert { .. } => "BULK_INSERT_ERROR".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::MultipleRowsReturned(_) => "MULTIPLE_ROWS_RETURNED".to_string(),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_bulk_insert_with_column() {
      let err = Error::BulkInsert {
         row: 50_000,
         column: Some(1),
         message: "datatype mismatch".into(),
      };
      assert_eq!(err.error_code(), "BULK_INSERT_ERROR");
      assert_eq!(
         err.to_string(),
         "bulk insert failed at row 50000, column 1: datatype mismatch"
      );
   }

   #[test]
   fn test_error_code_bulk_insert_without_column() {
      let err = Error::BulkInsert {
         row: 3,
         column: None,
         message: "constraint failed".into(),
      };
      assert_eq!(err.to_string(), "bulk insert failed at row 3: constraint failed");
   }

   #[test]
   fn test_error_code_passes_through_connection_errors() {
      let err = Error::from(sqlite_ffi_conn::Error::ConnectionClosed);
      assert_eq!(err.error_code(), "CONNECTION_CLOSED");
      assert_eq!(err.to_string(), "database connection is closed");
   }

   #[test]
   fn test_error_code_multiple_rows_returned() {
      let err = Error::MultipleRowsReturned(5);
      assert_eq!(err.error_code(), "MULTIPLE_ROWS_RETURNED");
      assert!(err.to_string().contains("5 rows"));
   }

   #[test]
   fn test_error_code_unsupported_datatype() {
      let err = Error::UnsupportedDatatype("NaN".into());
      assert_eq!(err.error_code(), "UNSUPPORTED_DATATYPE");
   }
}
