//! One-line configuration wrappers over [`Connection::execute`] and
//! [`Connection::configure`].

use crate::Result;
use crate::config::{AutoVacuum, DbConfig, JournalMode, Synchronous};
use crate::connection::Connection;

impl Connection {
   /// Enable or disable foreign key enforcement.
   pub fn enable_foreign_key_constraints(&self, enable: bool) -> Result<()> {
      self.configure(DbConfig::EnableFkey, i32::from(enable))
   }

   pub fn set_journal_mode(&self, mode: JournalMode) -> Result<()> {
      self.execute(&format!("PRAGMA journal_mode={}", mode.as_sql()))
   }

   /// Switch to write-ahead logging.
   ///
   /// In-memory databases silently stay in `memory` journal mode.
   pub fn enable_wal_mode(&self) -> Result<()> {
      self.set_journal_mode(JournalMode::Wal)
   }

   /// Switch back to the default rollback journal.
   pub fn enable_default_journal_mode(&self) -> Result<()> {
      self.set_journal_mode(JournalMode::Delete)
   }

   pub fn set_synchronous(&self, level: Synchronous) -> Result<()> {
      self.execute(&format!("PRAGMA synchronous={}", level.as_sql()))
   }

   pub fn enable_synchronous_mode(&self) -> Result<()> {
      self.set_synchronous(Synchronous::Full)
   }

   pub fn set_auto_vacuum(&self, mode: AutoVacuum) -> Result<()> {
      self.execute(&format!("PRAGMA auto_vacuum={}", mode.as_sql()))
   }

   pub fn enable_auto_vacuum_mode(&self) -> Result<()> {
      self.set_auto_vacuum(AutoVacuum::Full)
   }
}
