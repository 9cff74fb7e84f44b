//! Configuration applied to a connection when it is opened, and the engine's
//! `sqlite3_db_config` option identifiers.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Journal mode set through `PRAGMA journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
   /// Default rollback journal
   Delete,
   /// Write-ahead logging
   Wal,
}

impl JournalMode {
   pub(crate) fn as_sql(self) -> &'static str {
      match self {
         JournalMode::Delete => "DELETE",
         JournalMode::Wal => "WAL",
      }
   }
}

/// Durability level set through `PRAGMA synchronous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
   Off,
   Normal,
   Full,
}

impl Synchronous {
   pub(crate) fn as_sql(self) -> &'static str {
      match self {
         Synchronous::Off => "OFF",
         Synchronous::Normal => "NORMAL",
         Synchronous::Full => "FULL",
      }
   }
}

/// Auto-vacuum mode set through `PRAGMA auto_vacuum`.
///
/// Only takes effect on a database that has no tables yet, or after a `VACUUM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoVacuum {
   None,
   Full,
   Incremental,
}

impl AutoVacuum {
   pub(crate) fn as_sql(self) -> &'static str {
      match self {
         AutoVacuum::None => "NONE",
         AutoVacuum::Full => "FULL",
         AutoVacuum::Incremental => "INCREMENTAL",
      }
   }
}

/// Settings applied by [`Connection::open_with`](crate::Connection::open_with)
/// right after the native handle is opened.
///
/// Every field is optional; `None` leaves the engine's default in place.
///
/// # Examples
///
/// ```
/// use sqlite_ffi_conn::{ConnectionConfig, JournalMode, Synchronous};
///
/// // Use engine defaults
/// let config = ConnectionConfig::default();
///
/// // WAL with relaxed syncing, the usual pairing
/// let config = ConnectionConfig {
///     journal_mode: Some(JournalMode::Wal),
///     synchronous: Some(Synchronous::Normal),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
   /// Journal mode to switch to after opening
   pub journal_mode: Option<JournalMode>,

   /// Durability level
   pub synchronous: Option<Synchronous>,

   /// Enable or disable foreign key enforcement
   ///
   /// Applied through `sqlite3_db_config`, not the `foreign_keys` pragma.
   pub foreign_keys: Option<bool>,

   /// Auto-vacuum mode
   pub auto_vacuum: Option<AutoVacuum>,
}

/// Option identifiers accepted by `sqlite3_db_config`.
///
/// See <https://www.sqlite.org/c3ref/c_dbconfig_defensive.html>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DbConfig {
   /// Name of the main database schema (takes a string pointer)
   MainDbName = 1000,
   /// Lookaside memory allocator (takes a buffer pointer and two sizes)
   Lookaside = 1001,
   EnableFkey = 1002,
   EnableTrigger = 1003,
   EnableFts3Tokenizer = 1004,
   EnableLoadExtension = 1005,
   NoCkptOnClose = 1006,
   EnableQpsg = 1007,
   TriggerEqp = 1008,
   ResetDatabase = 1009,
   Defensive = 1010,
   WritableSchema = 1011,
   LegacyAlterTable = 1012,
   DqsDml = 1013,
   DqsDdl = 1014,
   EnableView = 1015,
   LegacyFileFormat = 1016,
   TrustedSchema = 1017,
   StmtScanstatus = 1018,
   ReverseScanorder = 1019,
}

impl DbConfig {
   /// Lowest identifier in the enumeration.
   pub const MIN: i32 = DbConfig::MainDbName as i32;

   /// Highest identifier in the enumeration.
   pub const MAX: i32 = DbConfig::ReverseScanorder as i32;

   const ALL: [DbConfig; 20] = [
      DbConfig::MainDbName,
      DbConfig::Lookaside,
      DbConfig::EnableFkey,
      DbConfig::EnableTrigger,
      DbConfig::EnableFts3Tokenizer,
      DbConfig::EnableLoadExtension,
      DbConfig::NoCkptOnClose,
      DbConfig::EnableQpsg,
      DbConfig::TriggerEqp,
      DbConfig::ResetDatabase,
      DbConfig::Defensive,
      DbConfig::WritableSchema,
      DbConfig::LegacyAlterTable,
      DbConfig::DqsDml,
      DbConfig::DqsDdl,
      DbConfig::EnableView,
      DbConfig::LegacyFileFormat,
      DbConfig::TrustedSchema,
      DbConfig::StmtScanstatus,
      DbConfig::ReverseScanorder,
   ];

   /// Whether the option can be driven with a single integer argument.
   pub fn is_supported(self) -> bool {
      !matches!(self, DbConfig::MainDbName | DbConfig::Lookaside)
   }

   pub fn as_raw(self) -> i32 {
      self as i32
   }
}

impl TryFrom<i32> for DbConfig {
   type Error = Error;

   fn try_from(option: i32) -> Result<Self, Self::Error> {
      if !(DbConfig::MIN..=DbConfig::MAX).contains(&option) {
         return Err(Error::Config {
            option,
            message: format!(
               "invalid configuration option (expected {}..={})",
               DbConfig::MIN,
               DbConfig::MAX
            ),
         });
      }

      Ok(DbConfig::ALL[(option - DbConfig::MIN) as usize])
   }
}
