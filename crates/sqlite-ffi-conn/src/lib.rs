//! # sqlite-ffi-conn
//!
//! A synchronous client layer over SQLite's C API: connections, prepared
//! statements, typed parameter binding and row materialization.
//!
//! ## Core Types
//!
//! - **[`Connection`]**: owns one native database handle
//! - **[`Statement`]**: a compiled statement with a `Ready → HasRow/Exhausted → Ready`
//!   state machine, borrowed from its connection
//! - **[`Row`]**: read-only view of the current row, handing out owned copies
//! - **[`Value`]**: the closed set of bindable and readable data
//! - **[`ConnectionConfig`]** / **[`DbConfig`]**: open-time settings and
//!   `sqlite3_db_config` option identifiers
//! - **[`Error`]**: error type for every operation
//!
//! ## Usage
//!
//! ```no_run
//! use sqlite_ffi_conn::{Connection, Value};
//!
//! # fn main() -> sqlite_ffi_conn::Result<()> {
//! let conn = Connection::open("todos.db")?;
//! conn.execute("CREATE TABLE IF NOT EXISTS todos (id INTEGER PRIMARY KEY, text TEXT, done BOOLEAN)")?;
//!
//! // Prepare once, execute many times
//! let mut insert = conn.prepare("INSERT INTO todos (text, done) VALUES (?, ?)")?;
//! insert.execute(&["Learn Rust".into(), Value::from(false)])?;
//! insert.execute(&["Learn SQLite".into(), Value::from(true)])?;
//!
//! let mut select = conn.prepare("SELECT id, text, done FROM todos")?;
//! while let Some(row) = select.next()? {
//!     println!("{} {} {}", row.int64(0), row.text(1), row.boolean(2));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Every call blocks until the engine returns. A [`Connection`] can be moved to
//! another thread but not shared; use one connection per worker.
//!
mod config;
mod connection;
mod error;
mod pragma;
mod statement;
mod value;

// Re-export public types
pub use config::{AutoVacuum, ConnectionConfig, DbConfig, JournalMode, Synchronous};
pub use connection::Connection;
pub use error::Error;
pub use statement::{Row, Statement, StatementState, StepResult};
pub use value::{ColumnType, Value};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
