//! Transactions, atomic bulk loading, and JSON decoding on top of `sqlite-ffi-conn`.
//!
//! This crate sits between the low-level connection crate (`sqlite-ffi-conn`)
//! and application-level code. It provides:
//!
//! - [`DatabaseWrapper`]: main entry point taking JSON parameters and returning JSON rows
//! - Transaction control ([`begin`], [`commit`], [`rollback`], [`run_in_transaction`], [`Transaction`])
//! - All-or-nothing bulk loading ([`BulkInsertJob`])
//! - JSON type decoding for SQLite values
//!
//! # Example
//!
//! ```no_run
//! use sqlite_ffi_toolkit::{BulkInsertJob, DatabaseWrapper};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseWrapper::connect("mydb.db", None)?;
//!
//! // Write
//! db.execute("INSERT INTO users (name) VALUES (?)", vec![json!("Alice")])?;
//!
//! // Read
//! let rows = db.fetch_all("SELECT * FROM users", vec![])?;
//!
//! // Transaction
//! let results = db.execute_transaction(vec![
//!    ("INSERT INTO users (name) VALUES (?)", vec![json!("Bob")]),
//!    ("INSERT INTO users (name) VALUES (?)", vec![json!("Charlie")]),
//! ])?;
//!
//! // Bulk load
//! let job = BulkInsertJob::from_text_rows(
//!    "INSERT INTO users (name) VALUES (?)",
//!    [["Dana"], ["Eve"]],
//! );
//! db.bulk_insert(&job)?;
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod decode;
pub mod error;
pub mod transactions;
pub mod wrapper;

pub use bulk::{BulkInsertJob, BulkInsertReport};
pub use decode::{row_to_map, to_json, value_from_json, values_from_json};
pub use error::{Error, Result};
pub use transactions::{
   Transaction, TransactionBehavior, begin, begin_with, commit, rollback, run_in_transaction,
};
pub use wrapper::{DatabaseWrapper, WriteQueryResult};

// Re-export commonly used types from the connection crate
pub use sqlite_ffi_conn::{Connection, ConnectionConfig, Row, Statement, Value};
