//! Explicit transaction control over a single connection.

use std::ops::Deref;

use sqlite_ffi_conn::Connection;
use tracing::{debug, error, warn};

use crate::Result;

/// Locking behavior requested when a transaction begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionBehavior {
   /// Locks are acquired on first read/write
   #[default]
   Deferred,
   /// The write lock is acquired immediately
   Immediate,
   Exclusive,
}

impl TransactionBehavior {
   fn begin_sql(self) -> &'static str {
      match self {
         TransactionBehavior::Deferred => "BEGIN TRANSACTION",
         TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
         TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
      }
   }
}

/// Begin a deferred transaction
pub fn begin(conn: &Connection) -> Result<()> {
   begin_with(conn, TransactionBehavior::Deferred)
}

pub fn begin_with(conn: &Connection, behavior: TransactionBehavior) -> Result<()> {
   conn.execute(behavior.begin_sql())?;
   debug!("Transaction started for db: {}", conn.path().display());
   Ok(())
}

/// Commit the current transaction
pub fn commit(conn: &Connection) -> Result<()> {
   conn.execute("COMMIT")?;
   debug!("Transaction committed for db: {}", conn.path().display());
   Ok(())
}

/// Rollback the current transaction
pub fn rollback(conn: &Connection) -> Result<()> {
   conn.execute("ROLLBACK")?;
   debug!("Transaction rolled back for db: {}", conn.path().display());
   Ok(())
}

/// Roll back after a primary failure, logging (not returning) any rollback error.
pub(crate) fn rollback_quietly(conn: &Connection) {
   if let Err(rollback_err) = rollback(conn) {
      warn!("Rollback after failure also failed: {}", rollback_err);
   }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` succeeds. When `work` fails the transaction is rolled
/// back and the failure from `work` is returned; a rollback failure is only
/// logged. A failed commit is rolled back and its error returned.
///
/// # Examples
///
/// ```no_run
/// use sqlite_ffi_conn::Connection;
/// use sqlite_ffi_toolkit::{Error, run_in_transaction};
///
/// # fn example(conn: &Connection) -> Result<(), Error> {
/// run_in_transaction(conn, |conn| {
///     conn.execute("INSERT INTO accounts (id, balance) VALUES (1, 100)")?;
///     conn.execute("INSERT INTO accounts (id, balance) VALUES (2, 0)")?;
///     Ok::<_, Error>(())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn run_in_transaction<T, E, F>(conn: &Connection, work: F) -> std::result::Result<T, E>
where
   F: FnOnce(&Connection) -> std::result::Result<T, E>,
   E: From<crate::Error>,
{
   begin(conn)?;

   match work(conn) {
      Ok(value) => {
         if let Err(commit_err) = commit(conn) {
            rollback_quietly(conn);
            return Err(commit_err.into());
         }
         Ok(value)
      }
      Err(e) => {
         rollback_quietly(conn);
         Err(e)
      }
   }
}

/// A transaction scoped to a borrow of its connection.
///
/// Derefs to the connection so statements can be prepared and executed
/// through it. Rolls back automatically if dropped without an explicit
/// [`commit`](Self::commit) or [`rollback`](Self::rollback).
#[must_use = "if unused, the transaction is immediately rolled back"]
pub struct Transaction<'conn> {
   conn: &'conn Connection,
   active: bool,
}

impl<'conn> Transaction<'conn> {
   pub fn begin(conn: &'conn Connection) -> Result<Self> {
      Self::begin_with(conn, TransactionBehavior::Deferred)
   }

   pub fn begin_with(conn: &'conn Connection, behavior: TransactionBehavior) -> Result<Self> {
      begin_with(conn, behavior)?;
      Ok(Self { conn, active: true })
   }

   pub fn connection(&self) -> &'conn Connection {
      self.conn
   }

   /// Commit this transaction
   ///
   /// If the commit fails, the transaction is rolled back when dropped.
   pub fn commit(mut self) -> Result<()> {
      commit(self.conn)?;
      self.active = false;
      Ok(())
   }

   /// Rollback this transaction
   pub fn rollback(mut self) -> Result<()> {
      self.active = false;
      rollback(self.conn)
   }
}

impl Deref for Transaction<'_> {
   type Target = Connection;

   fn deref(&self) -> &Self::Target {
      self.conn
   }
}

impl Drop for Transaction<'_> {
   fn drop(&mut self) {
      if !self.active {
         return;
      }

      debug!(
         "Dropping transaction for db: {} (will auto-rollback)",
         self.conn.path().display()
      );
      if let Err(e) = rollback(self.conn) {
         error!("Auto-rollback failed: {}", e);
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::Error;

   fn memory_db() -> Connection {
      let conn = Connection::open_in_memory().unwrap();
      conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
      conn
   }

   fn count(conn: &Connection) -> i64 {
      let mut stmt = conn.prepare("SELECT COUNT(*) FROM t").unwrap();
      let n = stmt.next().unwrap().unwrap().int64(0);
      n
   }

   #[test]
   fn test_begin_commit_rollback() {
      let conn = memory_db();

      begin(&conn).unwrap();
      conn.execute("INSERT INTO t VALUES (1)").unwrap();
      rollback(&conn).unwrap();
      assert_eq!(count(&conn), 0);

      begin_with(&conn, TransactionBehavior::Immediate).unwrap();
      conn.execute("INSERT INTO t VALUES (1)").unwrap();
      commit(&conn).unwrap();
      assert_eq!(count(&conn), 1);
   }

   #[test]
   fn test_nested_begin_fails() {
      let conn = memory_db();
      begin(&conn).unwrap();

      let err = begin(&conn).unwrap_err();
      assert_eq!(err.error_code(), "EXEC_ERROR");
      assert!(err.to_string().contains("within a transaction"), "{err}");
   }

   #[test]
   fn test_commit_without_transaction_fails() {
      let conn = memory_db();
      assert!(commit(&conn).is_err());
      assert!(rollback(&conn).is_err());
   }

   #[test]
   fn test_run_in_transaction_surfaces_work_error_even_if_rollback_fails() {
      let conn = memory_db();

      // The work ends the transaction itself, so the follow-up rollback fails
      let result: std::result::Result<(), Error> = run_in_transaction(&conn, |conn| {
         conn.execute("INSERT INTO t VALUES (1)")?;
         conn.execute("COMMIT")?;
         Err(Error::UnsupportedDatatype("work failed".into()))
      });

      let err = result.unwrap_err();
      assert!(matches!(err, Error::UnsupportedDatatype(ref m) if m == "work failed"));
   }

   #[test]
   fn test_guard_rolls_back_on_drop() {
      let conn = memory_db();
      {
         let tx = Transaction::begin(&conn).unwrap();
         tx.execute("INSERT INTO t VALUES (1)").unwrap();
      }
      assert_eq!(count(&conn), 0);

      let tx = Transaction::begin(&conn).unwrap();
      tx.execute("INSERT INTO t VALUES (2)").unwrap();
      tx.commit().unwrap();
      assert_eq!(count(&conn), 1);
   }
}
