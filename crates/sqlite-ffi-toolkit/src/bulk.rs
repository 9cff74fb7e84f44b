//! All-or-nothing bulk loading through one prepared statement.
//!
//! The template is compiled once and every row goes through a bind/step/reset
//! cycle inside a single transaction. The first failing row aborts the job and
//! rolls the whole batch back, so a partial batch is never visible.

use serde::Serialize;
use sqlite_ffi_conn::{Connection, Statement, StepResult, Value};
use tracing::{debug, warn};

use crate::transactions::{self, rollback_quietly};
use crate::{Error, Result};

/// Outcome of a committed bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkInsertReport {
   pub rows_inserted: usize,
}

/// A parameterized SQL template and the rows to run it with.
///
/// Every row must supply exactly one value per placeholder in the template.
///
/// # Examples
///
/// ```no_run
/// use sqlite_ffi_conn::{Connection, Value};
/// use sqlite_ffi_toolkit::BulkInsertJob;
///
/// # fn example(conn: &Connection) -> sqlite_ffi_toolkit::Result<()> {
/// let report = BulkInsertJob::new("INSERT INTO todos (text, done) VALUES (?, ?)")
///     .row([Value::from("Write docs"), Value::from(false)])
///     .row([Value::from("Ship it"), Value::from(true)])
///     .execute(conn)?;
///
/// assert_eq!(report.rows_inserted, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BulkInsertJob {
   sql: String,
   rows: Vec<Vec<Value>>,
}

impl BulkInsertJob {
   pub fn new(sql: impl Into<String>) -> Self {
      Self {
         sql: sql.into(),
         rows: Vec::new(),
      }
   }

   /// Build a job whose values are all bound as text.
   pub fn from_text_rows<R, S>(sql: impl Into<String>, rows: impl IntoIterator<Item = R>) -> Self
   where
      R: IntoIterator<Item = S>,
      S: Into<String>,
   {
      Self::new(sql).rows(
         rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| Value::Text(v.into()))),
      )
   }

   /// Append one row.
   pub fn row<I, V>(mut self, values: I) -> Self
   where
      I: IntoIterator<Item = V>,
      V: Into<Value>,
   {
      self.push_row(values);
      self
   }

   /// Append many rows.
   pub fn rows<R, I, V>(mut self, rows: R) -> Self
   where
      R: IntoIterator<Item = I>,
      I: IntoIterator<Item = V>,
      V: Into<Value>,
   {
      for row in rows {
         self.push_row(row);
      }
      self
   }

   pub fn push_row<I, V>(&mut self, values: I)
   where
      I: IntoIterator<Item = V>,
      V: Into<Value>,
   {
      self.rows.push(values.into_iter().map(Into::into).collect());
   }

   pub fn sql(&self) -> &str {
      &self.sql
   }

   pub fn len(&self) -> usize {
      self.rows.len()
   }

   pub fn is_empty(&self) -> bool {
      self.rows.is_empty()
   }

   /// Insert every row in one transaction.
   ///
   /// An empty job succeeds without touching the engine. Otherwise the first
   /// failure rolls back every row already inserted and is reported as
   /// [`Error::BulkInsert`] with the 0-based row index. Failures to compile
   /// the template or to begin the transaction are returned as they are.
   pub fn execute(&self, conn: &Connection) -> Result<BulkInsertReport> {
      if self.rows.is_empty() {
         debug!("Bulk insert has no rows, nothing to do");
         return Ok(BulkInsertReport { rows_inserted: 0 });
      }

      let mut stmt = conn.prepare(&self.sql)?;
      let columns = stmt.parameter_count();

      transactions::begin(conn)?;

      for (row, values) in self.rows.iter().enumerate() {
         if let Err(failure) = insert_row(&mut stmt, columns, row, values) {
            rollback_quietly(conn);
            if let Err(e) = stmt.finalize() {
               warn!("Finalize after failed bulk insert also failed: {}", e);
            }
            debug!("Bulk insert aborted at row {} and rolled back", row);
            return Err(failure);
         }
      }

      if let Err(e) = stmt.finalize() {
         rollback_quietly(conn);
         return Err(e.into());
      }

      if let Err(e) = transactions::commit(conn) {
         rollback_quietly(conn);
         return Err(e);
      }

      debug!("Bulk insert committed {} rows", self.rows.len());
      Ok(BulkInsertReport {
         rows_inserted: self.rows.len(),
      })
   }
}

/// One bind/step/reset cycle. The statement is left `Ready` on every path that
/// reached the step.
fn insert_row(
   stmt: &mut Statement<'_>,
   columns: usize,
   row: usize,
   values: &[Value],
) -> Result<()> {
   if values.len() != columns {
      return Err(Error::BulkInsert {
         row,
         column: None,
         message: format!("expected {columns} value(s), got {}", values.len()),
      });
   }

   for (column, value) in values.iter().enumerate() {
      stmt
         .bind_value(column + 1, value)
         .map_err(|e| bulk_error(row, Some(column), e))?;
   }

   let stepped = stmt.step();
   let reset = stmt.reset();

   match stepped {
      Ok(StepResult::Done) => {}
      Ok(StepResult::Row) => {
         return Err(Error::BulkInsert {
            row,
            column: None,
            message: "statement returned a row, expected completion".to_string(),
         });
      }
      Err(e) => return Err(bulk_error(row, None, e)),
   }

   reset.map_err(|e| bulk_error(row, None, e))
}

fn bulk_error(row: usize, column: Option<usize>, source: sqlite_ffi_conn::Error) -> Error {
   Error::BulkInsert {
      row,
      column,
      message: source.to_string(),
   }
}
