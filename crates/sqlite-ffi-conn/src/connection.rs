//! A single native SQLite connection handle.

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;

use libsqlite3_sys::{
   SQLITE_MISUSE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE, SQLITE_TOOBIG, sqlite3,
   sqlite3_changes, sqlite3_close, sqlite3_db_config, sqlite3_errcode, sqlite3_errmsg,
   sqlite3_errstr, sqlite3_exec, sqlite3_finalize, sqlite3_free, sqlite3_last_insert_rowid,
   sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_stmt, sqlite3_total_changes,
};
use tracing::{debug, error, trace, warn};

use crate::Result;
use crate::config::{ConnectionConfig, DbConfig};
use crate::error::Error;
use crate::statement::Statement;

/// An open connection to a SQLite database file.
///
/// The connection exclusively owns its native handle. Statements prepared from
/// it borrow the connection, so it cannot be closed (which needs `&mut self`)
/// while any of them is still alive.
///
/// A connection is not meant to be shared between threads; the type is `Send`
/// but not `Sync`.
///
/// # Example
///
/// ```no_run
/// use sqlite_ffi_conn::{Connection, Value};
///
/// # fn example() -> sqlite_ffi_conn::Result<()> {
/// let mut conn = Connection::open("todos.db")?;
/// conn.execute("CREATE TABLE IF NOT EXISTS todos (id INTEGER PRIMARY KEY, text TEXT, done BOOLEAN)")?;
///
/// let mut insert = conn.prepare("INSERT INTO todos (text, done) VALUES (?, ?)")?;
/// insert.execute(&["Learn Rust".into(), Value::from(false)])?;
/// drop(insert);
///
/// conn.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connection {
   /// Null once closed
   db: *mut sqlite3,

   path: PathBuf,
}

// SAFETY: The handle is only ever used through `&self`/`&mut self` of a single
// owner, and the bundled engine is built in serialized threading mode. Moving
// the owner to another thread is sound; sharing it is not, hence no `Sync`.
unsafe impl Send for Connection {}

impl Connection {
   /// Open (or create) the database file at `path` with engine defaults.
   pub fn open(path: impl AsRef<Path>) -> Result<Self> {
      Self::open_with(path, None)
   }

   /// Open a private in-memory database.
   pub fn open_in_memory() -> Result<Self> {
      Self::open(":memory:")
   }

   /// Open (or create) the database file at `path` and apply `custom_config`.
   ///
   /// Pass `None` to keep the engine's defaults. If applying the configuration
   /// fails, the handle is closed before the error is returned.
   pub fn open_with(
      path: impl AsRef<Path>,
      custom_config: Option<ConnectionConfig>,
   ) -> Result<Self> {
      let config = custom_config.unwrap_or_default();
      let path = path.as_ref();
      let path_str = path.display().to_string();

      if path.as_os_str().is_empty() {
         return Err(Error::Open {
            path: path_str,
            code: SQLITE_MISUSE,
            message: "database path cannot be empty".to_string(),
         });
      }

      let c_path = path
         .to_str()
         .and_then(|p| CString::new(p).ok())
         .ok_or_else(|| Error::Open {
            path: path_str.clone(),
            code: SQLITE_MISUSE,
            message: "database path must be valid UTF-8 without NUL bytes".to_string(),
         })?;

      let mut db: *mut sqlite3 = ptr::null_mut();
      let flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE;

      // SAFETY: c_path is a valid NUL-terminated string for the duration of
      // the call and db is a valid out-pointer.
      let rc = unsafe { sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
      if rc != SQLITE_OK {
         let message = if db.is_null() {
            errstr(rc)
         } else {
            // SAFETY: db was allocated by sqlite3_open_v2 even though it failed
            unsafe { errmsg(db) }
         };
         // SAFETY: the engine hands back a handle that must be closed even on
         // failure; closing a null handle is a no-op.
         unsafe { sqlite3_close(db) };
         return Err(Error::Open {
            path: path_str,
            code: rc,
            message,
         });
      }

      debug!("Opened database: {}", path_str);

      let conn = Self {
         db,
         path: path.to_path_buf(),
      };
      conn.apply_config(&config)?;

      Ok(conn)
   }

   fn apply_config(&self, config: &ConnectionConfig) -> Result<()> {
      if let Some(mode) = config.journal_mode {
         self.set_journal_mode(mode)?;
      }
      if let Some(level) = config.synchronous {
         self.set_synchronous(level)?;
      }
      if let Some(enable) = config.foreign_keys {
         self.enable_foreign_key_constraints(enable)?;
      }
      if let Some(mode) = config.auto_vacuum {
         self.set_auto_vacuum(mode)?;
      }
      Ok(())
   }

   /// Path this connection was opened with.
   pub fn path(&self) -> &Path {
      &self.path
   }

   pub fn is_closed(&self) -> bool {
      self.db.is_null()
   }

   /// Raw handle, or `ConnectionClosed` once the connection has been closed.
   pub(crate) fn handle(&self) -> Result<*mut sqlite3> {
      if self.db.is_null() {
         return Err(Error::ConnectionClosed);
      }
      Ok(self.db)
   }

   /// Release the native handle.
   ///
   /// Closing an already-closed connection is a no-op that only logs a warning.
   pub fn close(&mut self) -> Result<()> {
      if self.db.is_null() {
         warn!("Close called on already-closed database: {}", self.path.display());
         return Ok(());
      }

      // SAFETY: db is a live handle; every statement borrowing this connection
      // has been dropped (and thereby finalized) since we hold `&mut self`.
      let rc = unsafe { sqlite3_close(self.db) };
      if rc != SQLITE_OK {
         // SAFETY: the handle stays valid when close fails
         let message = unsafe { errmsg(self.db) };
         return Err(Error::Close { code: rc, message });
      }

      self.db = ptr::null_mut();
      debug!("Closed database: {}", self.path.display());
      Ok(())
   }

   /// Run one or more complete SQL statements that take no parameters.
   pub fn execute(&self, sql: &str) -> Result<()> {
      let db = self.handle()?;

      // Scoped to this call; freed on every return path.
      let c_sql = CString::new(sql).map_err(|_| Error::Exec {
         code: SQLITE_MISUSE,
         message: "SQL text contains an interior NUL byte".to_string(),
      })?;

      let mut raw_message: *mut c_char = ptr::null_mut();
      // SAFETY: db is live, c_sql is NUL-terminated, no callback is installed
      // and raw_message is a valid out-pointer.
      let rc = unsafe { sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut raw_message) };
      let engine_message = EngineMessage(raw_message);

      if rc != SQLITE_OK {
         let message = engine_message
            .text()
            // SAFETY: db is live
            .unwrap_or_else(|| unsafe { errmsg(db) });
         return Err(Error::Exec { code: rc, message });
      }

      trace!("Executed: {}", sql);
      Ok(())
   }

   /// Compile `sql` into a reusable statement bound to this connection.
   ///
   /// `sql` must hold exactly one statement; trailing whitespace and comments
   /// are allowed. Text with no statement at all, or with a second statement
   /// after the first, is rejected instead of being partially compiled.
   pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
      let db = self.handle()?;

      let (raw, consumed) = compile(db, sql)?;
      if raw.is_null() {
         return Err(Error::Prepare {
            code: SQLITE_MISUSE,
            message: "SQL text contains no statement".to_string(),
         });
      }
      // Finalized on drop if the tail check below fails
      let stmt = Statement::new(self, raw);

      let rest = sql.get(consumed..).unwrap_or_default();
      if !rest.trim().is_empty() {
         let has_more = match compile(db, rest) {
            Ok((extra, _)) if extra.is_null() => false,
            Ok((extra, _)) => {
               // SAFETY: extra was just compiled and is not referenced elsewhere
               unsafe { sqlite3_finalize(extra) };
               true
            }
            Err(_) => true,
         };
         if has_more {
            return Err(Error::Prepare {
               code: SQLITE_MISUSE,
               message: "SQL text contains more than one statement".to_string(),
            });
         }
      }

      debug!("Prepared statement: {}", sql);
      Ok(stmt)
   }

   /// Rowid of the most recent successful INSERT on this connection.
   pub fn last_insert_rowid(&self) -> i64 {
      match self.handle() {
         // SAFETY: db is live
         Ok(db) => unsafe { sqlite3_last_insert_rowid(db) },
         Err(_) => 0,
      }
   }

   /// Rows modified by the most recent INSERT, UPDATE or DELETE.
   pub fn changes(&self) -> u64 {
      match self.handle() {
         // SAFETY: db is live
         Ok(db) => u64::try_from(unsafe { sqlite3_changes(db) }).unwrap_or(0),
         Err(_) => 0,
      }
   }

   /// Rows modified since the connection was opened.
   pub fn total_changes(&self) -> u64 {
      match self.handle() {
         // SAFETY: db is live
         Ok(db) => u64::try_from(unsafe { sqlite3_total_changes(db) }).unwrap_or(0),
         Err(_) => 0,
      }
   }

   /// Result code of the most recent engine call on this connection.
   ///
   /// Reports `SQLITE_MISUSE` once the connection is closed.
   pub fn error_code(&self) -> i32 {
      match self.handle() {
         // SAFETY: db is live
         Ok(db) => unsafe { sqlite3_errcode(db) },
         Err(_) => SQLITE_MISUSE,
      }
   }

   /// Diagnostic text of the most recent engine call on this connection.
   pub fn error_message(&self) -> String {
      match self.handle() {
         // SAFETY: db is live
         Ok(db) => unsafe { errmsg(db) },
         Err(e) => e.to_string(),
      }
   }

   /// Set an on/off style `sqlite3_db_config` option.
   ///
   /// Options that take pointer arguments (`MainDbName`, `Lookaside`) are
   /// rejected with `UnsupportedConfig` before the engine is called.
   pub fn configure(&self, option: DbConfig, value: i32) -> Result<()> {
      if !option.is_supported() {
         return Err(Error::UnsupportedConfig(option));
      }

      let db = self.handle()?;

      // SAFETY: db is live; every supported option takes (int, int*) and a null
      // int* is permitted when the caller does not want the resulting setting.
      let rc = unsafe {
         sqlite3_db_config(db, option.as_raw(), value as c_int, ptr::null_mut::<c_int>())
      };
      if rc != SQLITE_OK {
         return Err(Error::Config {
            option: option.as_raw(),
            message: format!("sqlite3_db_config failed: {}", errstr(rc)),
         });
      }

      debug!(?option, value, "Applied database configuration");
      Ok(())
   }

   /// Like [`configure`](Self::configure), for an identifier that has not been
   /// validated yet. Out-of-range identifiers never reach the engine.
   pub fn configure_raw(&self, option: i32, value: i32) -> Result<()> {
      self.configure(DbConfig::try_from(option)?, value)
   }
}

impl Drop for Connection {
   fn drop(&mut self) {
      if self.db.is_null() {
         return;
      }

      if let Err(e) = self.close() {
         error!("Failed to close database {}: {}", self.path.display(), e);
      }
   }
}

/// Compile the first statement of `sql`, returning the raw handle (null when
/// `sql` holds only whitespace or comments) and the number of bytes consumed.
fn compile(db: *mut sqlite3, sql: &str) -> Result<(*mut sqlite3_stmt, usize)> {
   let len = c_int::try_from(sql.len()).map_err(|_| Error::Prepare {
      code: SQLITE_TOOBIG,
      message: "SQL text is too long".to_string(),
   })?;

   let start = sql.as_ptr().cast::<c_char>();
   let mut stmt: *mut sqlite3_stmt = ptr::null_mut();
   let mut tail: *const c_char = ptr::null();
   // SAFETY: db is live, sql points to len readable bytes (no NUL terminator
   // needed when a length is passed) and both out-pointers are valid.
   let rc = unsafe { sqlite3_prepare_v2(db, start, len, &mut stmt, &mut tail) };
   if rc != SQLITE_OK {
      return Err(Error::Prepare {
         code: rc,
         // SAFETY: db is live
         message: unsafe { errmsg(db) },
      });
   }

   let consumed = if tail.is_null() {
      sql.len()
   } else {
      // tail points into sql, at or after start
      (tail as usize).saturating_sub(start as usize).min(sql.len())
   };
   Ok((stmt, consumed))
}

/// An error string allocated by the engine, freed when dropped.
struct EngineMessage(*mut c_char);

impl EngineMessage {
   fn text(&self) -> Option<String> {
      if self.0.is_null() {
         return None;
      }
      // SAFETY: non-null pointers come from sqlite3_exec and are NUL-terminated
      Some(unsafe { CStr::from_ptr(self.0) }.to_string_lossy().into_owned())
   }
}

impl Drop for EngineMessage {
   fn drop(&mut self) {
      if !self.0.is_null() {
         // SAFETY: allocated by the engine with sqlite3_malloc
         unsafe { sqlite3_free(self.0.cast::<c_void>()) };
      }
   }
}

/// Diagnostic text for the most recent failure on `db`.
///
/// # Safety
///
/// `db` must be a handle returned by `sqlite3_open_v2` that has not been closed.
pub(crate) unsafe fn errmsg(db: *mut sqlite3) -> String {
   // SAFETY: guaranteed by caller; the returned string is owned by the engine
   // and copied before any further call on db.
   let message = unsafe { sqlite3_errmsg(db) };
   if message.is_null() {
      return String::new();
   }
   unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
}

/// English description of a result code, usable without a handle.
pub(crate) fn errstr(rc: c_int) -> String {
   // SAFETY: sqlite3_errstr returns a static string for any code
   let message = unsafe { sqlite3_errstr(rc) };
   if message.is_null() {
      return format!("result code {rc}");
   }
   unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
}
