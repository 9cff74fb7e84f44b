use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlite_ffi_conn::{Connection, ConnectionConfig};
use tracing::debug;

use crate::bulk::{BulkInsertJob, BulkInsertReport};
use crate::decode::{row_to_map, values_from_json};
use crate::transactions::run_in_transaction;
use crate::{Error, Result};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only set for INSERT operations on tables with a ROWID.
   /// Tables created with `WITHOUT ROWID` will not set this value.
   pub last_insert_id: i64,
}

/// High-level API over a single [`Connection`] taking JSON parameters and
/// returning rows as ordered JSON maps.
///
/// Every call prepares its own statement and finalizes it before returning.
pub struct DatabaseWrapper {
   conn: Connection,
}

impl DatabaseWrapper {
   /// Open (creating if needed) the database at `path`.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// # fn example() -> Result<(), sqlite_ffi_toolkit::Error> {
   /// use sqlite_ffi_toolkit::DatabaseWrapper;
   ///
   /// let db = DatabaseWrapper::connect("/tmp/my.db", None)?;
   /// # Ok(())
   /// # }
   /// ```
   pub fn connect(path: impl AsRef<Path>, config: Option<ConnectionConfig>) -> Result<Self> {
      let conn = Connection::open_with(path, config)?;
      Ok(Self { conn })
   }

   /// Wrap an already open connection.
   pub fn from_connection(conn: Connection) -> Self {
      Self { conn }
   }

   /// Access the underlying connection for statement-level work.
   pub fn connection(&self) -> &Connection {
      &self.conn
   }

   /// Run a write query (INSERT/UPDATE/DELETE) with positional parameters.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// # fn example(db: &sqlite_ffi_toolkit::DatabaseWrapper) -> Result<(), sqlite_ffi_toolkit::Error> {
   /// use serde_json::json;
   ///
   /// let result = db.execute(
   ///     "INSERT INTO users (name, age) VALUES (?, ?)",
   ///     vec![json!("Alice"), json!(30)],
   /// )?;
   ///
   /// println!("Inserted row {}", result.last_insert_id);
   /// # Ok(())
   /// # }
   /// ```
   pub fn execute(&self, query: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
      execute_on(&self.conn, query, values)
   }

   /// Run several write queries atomically.
   ///
   /// All statements either succeed together or are rolled back together.
   /// Results are returned in statement order.
   pub fn execute_transaction(
      &self,
      statements: Vec<(&str, Vec<JsonValue>)>,
   ) -> Result<Vec<WriteQueryResult>> {
      run_in_transaction(&self.conn, |conn| {
         let mut results = Vec::with_capacity(statements.len());
         for (query, values) in statements {
            results.push(execute_on(conn, query, values)?);
         }
         Ok::<_, Error>(results)
      })
   }

   /// Run a SELECT and decode every row.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// # fn example(db: &sqlite_ffi_toolkit::DatabaseWrapper) -> Result<(), sqlite_ffi_toolkit::Error> {
   /// let rows = db.fetch_all(
   ///     "SELECT name, age FROM users WHERE age > ?",
   ///     vec![serde_json::json!(21)],
   /// )?;
   ///
   /// for row in &rows {
   ///     println!("{}: {}", row["name"], row["age"]);
   /// }
   /// # Ok(())
   /// # }
   /// ```
   pub fn fetch_all(
      &self,
      query: &str,
      values: Vec<JsonValue>,
   ) -> Result<Vec<IndexMap<String, JsonValue>>> {
      let values = values_from_json(values)?;
      let mut stmt = self.conn.prepare(query)?;
      stmt.bind_all(&values)?;

      let mut rows = Vec::new();
      while let Some(row) = stmt.next()? {
         rows.push(row_to_map(&row)?);
      }

      stmt.finalize()?;
      Ok(rows)
   }

   /// Run a SELECT expected to return zero or one row.
   ///
   /// Returns [`Error::MultipleRowsReturned`] if the query returns more.
   pub fn fetch_one(
      &self,
      query: &str,
      values: Vec<JsonValue>,
   ) -> Result<Option<IndexMap<String, JsonValue>>> {
      let mut rows = self.fetch_all(query, values)?;

      match rows.len() {
         0 | 1 => Ok(rows.pop()),
         count => Err(Error::MultipleRowsReturned(count)),
      }
   }

   /// Run a bulk insert job on this connection.
   pub fn bulk_insert(&self, job: &BulkInsertJob) -> Result<BulkInsertReport> {
      job.execute(&self.conn)
   }

   /// Close the database connection.
   pub fn close(mut self) -> Result<()> {
      debug!("Closing wrapper for db: {}", self.conn.path().display());
      self.conn.close()?;
      Ok(())
   }
}

fn execute_on(conn: &Connection, query: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
   let values = values_from_json(values)?;
   let mut stmt = conn.prepare(query)?;

   // changes() keeps the count of the last INSERT/UPDATE/DELETE, so statements
   // that modify nothing would report a stale value
   let before = conn.total_changes();
   stmt.execute(&values)?;
   stmt.finalize()?;

   Ok(WriteQueryResult {
      rows_affected: conn.total_changes().saturating_sub(before),
      last_insert_id: conn.last_insert_rowid(),
   })
}
