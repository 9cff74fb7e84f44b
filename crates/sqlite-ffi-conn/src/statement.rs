//! Prepared statements: the step/reset state machine, positional parameter
//! binding, and column extraction.

use std::ffi::{CStr, c_char, c_int};
use std::{mem, ptr, slice};

use libsqlite3_sys::{
   SQLITE_DONE, SQLITE_NULL, SQLITE_OK, SQLITE_RANGE, SQLITE_ROW, SQLITE_TOOBIG, SQLITE_TRANSIENT,
   sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int, sqlite3_bind_int64,
   sqlite3_bind_null, sqlite3_bind_parameter_count, sqlite3_bind_text, sqlite3_clear_bindings,
   sqlite3_column_blob, sqlite3_column_bytes, sqlite3_column_count, sqlite3_column_double,
   sqlite3_column_int, sqlite3_column_int64, sqlite3_column_name, sqlite3_column_text,
   sqlite3_column_type, sqlite3_finalize, sqlite3_reset, sqlite3_sql, sqlite3_step, sqlite3_stmt,
};
use tracing::{debug, error, trace, warn};

use crate::Result;
use crate::connection::Connection;
use crate::error::Error;
use crate::value::{ColumnType, Value};

/// Where a statement is in its execution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
   /// Compiled, no row fetched since the last reset
   Ready,
   /// A row is available for column extraction
   HasRow,
   /// No more rows; must be reset before reuse
   Exhausted,
   /// The last step failed
   Error,
   /// Finalized; no further operation is valid
   Finalized,
}

/// Outcome of a successful [`Statement::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
   Row,
   Done,
}

/// A compiled statement owned by the caller and borrowed from its connection.
///
/// The borrow is what keeps the statement from outliving its connection: the
/// connection cannot be closed while a statement is alive. The native handle
/// is finalized exactly once, either by [`finalize`](Self::finalize) or on drop.
///
/// Column accessors are permissive: outside [`StatementState::HasRow`], or for
/// a column index past the end, they return the engine's coercion defaults
/// (`0`, `0.0`, empty string, empty blob, `false`, `Null`) instead of failing.
#[derive(Debug)]
pub struct Statement<'conn> {
   conn: &'conn Connection,
   /// Null once finalized
   raw: *mut sqlite3_stmt,
   state: StatementState,
}

impl<'conn> Statement<'conn> {
   pub(crate) fn new(conn: &'conn Connection, raw: *mut sqlite3_stmt) -> Self {
      Self {
         conn,
         raw,
         state: StatementState::Ready,
      }
   }

   pub fn state(&self) -> StatementState {
      self.state
   }

   /// The connection this statement was prepared on.
   pub fn connection(&self) -> &'conn Connection {
      self.conn
   }

   fn handle(&self) -> Result<*mut sqlite3_stmt> {
      if self.raw.is_null() {
         return Err(Error::StatementFinalized);
      }
      Ok(self.raw)
   }

   /// SQL text the statement was compiled from.
   pub fn sql(&self) -> String {
      let Ok(raw) = self.handle() else {
         return String::new();
      };
      // SAFETY: raw is live; the text is owned by the statement
      let text = unsafe { sqlite3_sql(raw) };
      if text.is_null() {
         return String::new();
      }
      unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
   }

   /// Number of positional placeholders in the statement.
   pub fn parameter_count(&self) -> usize {
      match self.handle() {
         // SAFETY: raw is live
         Ok(raw) => unsafe { sqlite3_bind_parameter_count(raw) }.max(0) as usize,
         Err(_) => 0,
      }
   }

   // ------------------------------------------------------------------
   // State machine
   // ------------------------------------------------------------------

   /// Advance execution by one unit.
   ///
   /// Once the statement is exhausted, further steps keep reporting `Done`
   /// without touching the engine until [`reset`](Self::reset) is called.
   pub fn step(&mut self) -> Result<StepResult> {
      let raw = self.handle()?;

      if self.state == StatementState::Exhausted {
         return Ok(StepResult::Done);
      }

      // SAFETY: raw is live and the owning connection is open
      match unsafe { sqlite3_step(raw) } {
         SQLITE_ROW => {
            self.state = StatementState::HasRow;
            Ok(StepResult::Row)
         }
         SQLITE_DONE => {
            self.state = StatementState::Exhausted;
            trace!("Statement exhausted");
            Ok(StepResult::Done)
         }
         rc => {
            self.state = StatementState::Error;
            Err(Error::Step {
               code: rc,
               message: self.conn.error_message(),
            })
         }
      }
   }

   /// Step and expose the row, if any.
   pub fn next(&mut self) -> Result<Option<Row<'_>>> {
      match self.step()? {
         StepResult::Row => Ok(Some(Row { stmt: self })),
         StepResult::Done => Ok(None),
      }
   }

   /// Return the statement to `Ready`. Bound values are kept.
   ///
   /// After a failed step the engine repeats that step's error code here; the
   /// repeat is not reported again.
   pub fn reset(&mut self) -> Result<()> {
      let raw = self.handle()?;

      // SAFETY: raw is live
      let rc = unsafe { sqlite3_reset(raw) };
      let previous = mem::replace(&mut self.state, StatementState::Ready);

      if rc != SQLITE_OK && previous != StatementState::Error {
         return Err(Error::Step {
            code: rc,
            message: self.conn.error_message(),
         });
      }

      trace!("Statement reset");
      Ok(())
   }

   /// Release the native handle. Calling it again is a no-op.
   pub fn finalize(&mut self) -> Result<()> {
      if self.raw.is_null() {
         trace!("Finalize called on already-finalized statement");
         return Ok(());
      }

      // SAFETY: raw is live and is nulled out right after, so it is never
      // released twice.
      let rc = unsafe { sqlite3_finalize(self.raw) };
      self.raw = ptr::null_mut();
      let previous = mem::replace(&mut self.state, StatementState::Finalized);

      debug!("Finalized statement");

      if rc != SQLITE_OK && previous != StatementState::Error {
         return Err(Error::Step {
            code: rc,
            message: self.conn.error_message(),
         });
      }
      Ok(())
   }

   // ------------------------------------------------------------------
   // Parameter binding
   // ------------------------------------------------------------------

   /// Bind `value` to the 1-based placeholder `index`.
   pub fn bind_value(&mut self, index: usize, value: &Value) -> Result<()> {
      let raw = self.handle()?;
      let count = self.parameter_count();

      if index == 0 || index > count {
         return Err(Error::Bind {
            index,
            code: SQLITE_RANGE,
            message: format!("index out of range (statement has {count} parameter(s))"),
         });
      }
      // count came from a c_int, so index fits
      let i = index as c_int;

      // SAFETY: raw is live and i is in range. Text and blob contents are
      // copied by the engine (SQLITE_TRANSIENT) before the call returns, so the
      // borrowed buffers only need to live for the call.
      let rc = match value {
         Value::Null => unsafe { sqlite3_bind_null(raw, i) },
         Value::Integer(v) => unsafe { sqlite3_bind_int64(raw, i, *v) },
         Value::Real(v) => unsafe { sqlite3_bind_double(raw, i, *v) },
         Value::Boolean(v) => unsafe { sqlite3_bind_int(raw, i, c_int::from(*v)) },
         Value::Text(v) => {
            let len = byte_len(index, v.len())?;
            unsafe {
               sqlite3_bind_text(raw, i, v.as_ptr().cast::<c_char>(), len, SQLITE_TRANSIENT())
            }
         }
         Value::Blob(v) => {
            let len = byte_len(index, v.len())?;
            unsafe { sqlite3_bind_blob(raw, i, v.as_ptr().cast(), len, SQLITE_TRANSIENT()) }
         }
      };

      if rc != SQLITE_OK {
         return Err(Error::Bind {
            index,
            code: rc,
            message: self.conn.error_message(),
         });
      }
      Ok(())
   }

   pub fn bind_int(&mut self, index: usize, value: i32) -> Result<()> {
      self.bind_value(index, &Value::from(value))
   }

   pub fn bind_int64(&mut self, index: usize, value: i64) -> Result<()> {
      self.bind_value(index, &Value::Integer(value))
   }

   pub fn bind_float(&mut self, index: usize, value: f64) -> Result<()> {
      self.bind_value(index, &Value::Real(value))
   }

   pub fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
      self.bind_value(index, &Value::from(value))
   }

   pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
      self.bind_value(index, &Value::from(value))
   }

   pub fn bind_null(&mut self, index: usize) -> Result<()> {
      self.bind_value(index, &Value::Null)
   }

   /// Bind `true`/`false` as the integers 1/0.
   pub fn bind_bool(&mut self, index: usize, value: bool) -> Result<()> {
      self.bind_value(index, &Value::Boolean(value))
   }

   /// Bind every placeholder, in order.
   ///
   /// `values` must have exactly one entry per placeholder.
   pub fn bind_all(&mut self, values: &[Value]) -> Result<()> {
      self.handle()?;

      let expected = self.parameter_count();
      if values.len() != expected {
         return Err(Error::BindCount {
            expected,
            actual: values.len(),
         });
      }

      for (i, value) in values.iter().enumerate() {
         self.bind_value(i + 1, value)?;
      }
      Ok(())
   }

   /// Reset every bound parameter to NULL.
   pub fn clear_bindings(&mut self) -> Result<()> {
      let raw = self.handle()?;
      // SAFETY: raw is live
      unsafe { sqlite3_clear_bindings(raw) };
      Ok(())
   }

   /// Bind `values`, step once, and reset so the statement can be reused.
   ///
   /// A statement that is not `Ready` is reset first. The statement is reset
   /// even when the step fails; the step's error is the one returned.
   pub fn execute(&mut self, values: &[Value]) -> Result<()> {
      if self.state != StatementState::Ready {
         self.reset()?;
      }

      self.bind_all(values)?;

      let stepped = self.step();
      let reset = self.reset();
      stepped?;
      reset
   }

   /// Run the statement to completion and collect every row.
   ///
   /// The statement is left `Ready` with its bindings intact.
   pub fn query_all(&mut self) -> Result<Vec<Vec<Value>>> {
      if self.state != StatementState::Ready {
         self.reset()?;
      }

      let mut rows = Vec::new();
      loop {
         match self.step() {
            Ok(StepResult::Row) => rows.push(self.row_values()),
            Ok(StepResult::Done) => break,
            Err(e) => {
               if let Err(reset_err) = self.reset() {
                  warn!("Reset after failed query also failed: {}", reset_err);
               }
               return Err(e);
            }
         }
      }

      self.reset()?;
      Ok(rows)
   }

   // ------------------------------------------------------------------
   // Column extraction
   // ------------------------------------------------------------------

   /// Number of columns in the result set. Valid in any state.
   pub fn column_count(&self) -> usize {
      match self.handle() {
         // SAFETY: raw is live
         Ok(raw) => unsafe { sqlite3_column_count(raw) }.max(0) as usize,
         Err(_) => 0,
      }
   }

   /// Name of a result column. Valid in any state.
   pub fn column_name(&self, index: usize) -> Option<String> {
      let raw = self.handle().ok()?;
      if index >= self.column_count() {
         return None;
      }
      // SAFETY: raw is live and index is in range
      let name = unsafe { sqlite3_column_name(raw, index as c_int) };
      if name.is_null() {
         return None;
      }
      Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
   }

   /// Handle and index for a column read, or `None` when no row is current.
   fn row_column(&self, index: usize) -> Option<(*mut sqlite3_stmt, c_int)> {
      if self.state != StatementState::HasRow || self.raw.is_null() {
         return None;
      }
      if index >= self.column_count() {
         return None;
      }
      Some((self.raw, index as c_int))
   }

   pub fn column_type(&self, index: usize) -> ColumnType {
      match self.row_column(index) {
         // SAFETY: a row is current and index is in range
         Some((raw, i)) => ColumnType::from_raw(unsafe { sqlite3_column_type(raw, i) }),
         None => ColumnType::Null,
      }
   }

   pub fn is_column_null(&self, index: usize) -> bool {
      match self.row_column(index) {
         Some((raw, i)) => {
            // SAFETY: a row is current and index is in range
            let column_type = unsafe { sqlite3_column_type(raw, i) };
            column_type == SQLITE_NULL
         }
         None => true,
      }
   }

   pub fn column_int(&self, index: usize) -> i32 {
      match self.row_column(index) {
         // SAFETY: a row is current and index is in range
         Some((raw, i)) => unsafe { sqlite3_column_int(raw, i) },
         None => 0,
      }
   }

   pub fn column_int64(&self, index: usize) -> i64 {
      match self.row_column(index) {
         // SAFETY: a row is current and index is in range
         Some((raw, i)) => unsafe { sqlite3_column_int64(raw, i) },
         None => 0,
      }
   }

   pub fn column_float(&self, index: usize) -> f64 {
      match self.row_column(index) {
         // SAFETY: a row is current and index is in range
         Some((raw, i)) => unsafe { sqlite3_column_double(raw, i) },
         None => 0.0,
      }
   }

   /// Column read under the 0/1 convention: only the integer 1 is `true`.
   ///
   /// Read as a 64-bit integer so values that truncate to 1 stay `false`.
   pub fn column_bool(&self, index: usize) -> bool {
      self.column_int64(index) == 1
   }

   /// Owned copy of a column's text. The length comes from the engine, so
   /// embedded NUL bytes survive; invalid UTF-8 is replaced.
   pub fn column_text(&self, index: usize) -> String {
      let Some((raw, i)) = self.row_column(index) else {
         return String::new();
      };

      // SAFETY: a row is current and index is in range. The text pointer must
      // be fetched before the byte count, and both are only valid until the
      // next step/reset, so the bytes are copied out immediately.
      unsafe {
         let text = sqlite3_column_text(raw, i);
         let len = sqlite3_column_bytes(raw, i);
         if text.is_null() || len <= 0 {
            return String::new();
         }
         String::from_utf8_lossy(slice::from_raw_parts(text, len as usize)).into_owned()
      }
   }

   /// Owned copy of a column's bytes.
   pub fn column_blob(&self, index: usize) -> Vec<u8> {
      let Some((raw, i)) = self.row_column(index) else {
         return Vec::new();
      };

      // SAFETY: as for column_text
      unsafe {
         let blob = sqlite3_column_blob(raw, i);
         let len = sqlite3_column_bytes(raw, i);
         if blob.is_null() || len <= 0 {
            return Vec::new();
         }
         slice::from_raw_parts(blob.cast::<u8>(), len as usize).to_vec()
      }
   }

   /// Column read according to its storage class.
   pub fn column_value(&self, index: usize) -> Value {
      match self.column_type(index) {
         ColumnType::Null => Value::Null,
         ColumnType::Integer => Value::Integer(self.column_int64(index)),
         ColumnType::Float => Value::Real(self.column_float(index)),
         ColumnType::Text => Value::Text(self.column_text(index)),
         ColumnType::Blob => Value::Blob(self.column_blob(index)),
      }
   }

   fn row_values(&self) -> Vec<Value> {
      (0..self.column_count()).map(|i| self.column_value(i)).collect()
   }
}

impl Drop for Statement<'_> {
   fn drop(&mut self) {
      if let Err(e) = self.finalize() {
         error!("Failed to finalize statement: {}", e);
      }
   }
}

fn byte_len(index: usize, len: usize) -> Result<c_int> {
   c_int::try_from(len).map_err(|_| Error::Bind {
      index,
      code: SQLITE_TOOBIG,
      message: format!("value of {len} bytes is too large to bind"),
   })
}

/// Read-only view of the current row of a statement.
///
/// Every accessor returns an owned copy, so values stay valid after the
/// statement moves on.
#[derive(Debug)]
pub struct Row<'stmt> {
   stmt: &'stmt Statement<'stmt>,
}

impl Row<'_> {
   pub fn column_count(&self) -> usize {
      self.stmt.column_count()
   }

   pub fn column_name(&self, index: usize) -> Option<String> {
      self.stmt.column_name(index)
   }

   pub fn column_type(&self, index: usize) -> ColumnType {
      self.stmt.column_type(index)
   }

   pub fn is_null(&self, index: usize) -> bool {
      self.stmt.is_column_null(index)
   }

   pub fn int(&self, index: usize) -> i32 {
      self.stmt.column_int(index)
   }

   pub fn int64(&self, index: usize) -> i64 {
      self.stmt.column_int64(index)
   }

   pub fn float(&self, index: usize) -> f64 {
      self.stmt.column_float(index)
   }

   pub fn text(&self, index: usize) -> String {
      self.stmt.column_text(index)
   }

   pub fn blob(&self, index: usize) -> Vec<u8> {
      self.stmt.column_blob(index)
   }

   pub fn boolean(&self, index: usize) -> bool {
      self.stmt.column_bool(index)
   }

   pub fn get(&self, index: usize) -> Value {
      self.stmt.column_value(index)
   }

   /// Every column of the row, in order.
   pub fn values(&self) -> Vec<Value> {
      self.stmt.row_values()
   }
}
