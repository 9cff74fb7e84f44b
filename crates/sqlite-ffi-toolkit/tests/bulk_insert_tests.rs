//! Atomic bulk loading against file-backed databases.

use sqlite_ffi_conn::{Connection, Value};
use sqlite_ffi_toolkit::{BulkInsertJob, DatabaseWrapper, Error};
use tempfile::TempDir;

const ROWS: usize = 100_000;
const INSERT_TODO: &str = "INSERT INTO todos (text, done) VALUES (?, ?)";

fn create_todos_db() -> (Connection, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let conn = Connection::open(temp_dir.path().join("bulk.db")).unwrap();
   conn
      .execute("CREATE TABLE todos (id INTEGER PRIMARY KEY, text TEXT, done BOOLEAN)")
      .unwrap();
   (conn, temp_dir)
}

fn count_todos(conn: &Connection) -> i64 {
   let mut stmt = conn.prepare("SELECT COUNT(*) FROM todos").unwrap();
   let row = stmt.next().unwrap().expect("COUNT(*) always returns a row");
   row.int64(0)
}

fn todo_rows() -> Vec<Vec<Value>> {
   (0..ROWS)
      .map(|_| vec![Value::from("x"), Value::from(false)])
      .collect()
}

#[test]
fn test_bulk_insert_commits_every_row() {
   let (conn, _temp) = create_todos_db();

   let report = BulkInsertJob::new(INSERT_TODO)
      .rows(todo_rows())
      .execute(&conn)
      .unwrap();

   assert_eq!(report.rows_inserted, ROWS);
   assert_eq!(count_todos(&conn), ROWS as i64);
}

#[test]
fn test_malformed_row_rolls_back_entire_batch() {
   let (conn, _temp) = create_todos_db();

   let mut rows = todo_rows();
   rows[50_000] = vec![Value::from("x")];

   let err = BulkInsertJob::new(INSERT_TODO)
      .rows(rows)
      .execute(&conn)
      .unwrap_err();

   assert!(
      matches!(err, Error::BulkInsert { row: 50_000, column: None, .. }),
      "{err:?}"
   );
   assert_eq!(err.error_code(), "BULK_INSERT_ERROR");
   assert_eq!(count_todos(&conn), 0);

   // The connection is back in autocommit mode and fully usable
   conn
      .execute("INSERT INTO todos (text, done) VALUES ('after', 1)")
      .unwrap();
   assert_eq!(count_todos(&conn), 1);
}

#[test]
fn test_engine_failure_mid_batch_rolls_back() {
   let temp_dir = TempDir::new().unwrap();
   let conn = Connection::open(temp_dir.path().join("unique.db")).unwrap();
   conn.execute("CREATE TABLE tags (name TEXT UNIQUE NOT NULL)").unwrap();

   let mut job = BulkInsertJob::new("INSERT INTO tags (name) VALUES (?)");
   for i in 0..1_000 {
      job.push_row([format!("tag-{i}")]);
   }
   // Violates UNIQUE
   job.push_row(["tag-7"]);

   let err = job.execute(&conn).unwrap_err();
   match err {
      Error::BulkInsert { row, column, message } => {
         assert_eq!(row, 1_000);
         assert_eq!(column, None);
         assert!(message.contains("UNIQUE"), "{message}");
      }
      other => panic!("expected BulkInsert, got {other:?}"),
   }

   let mut stmt = conn.prepare("SELECT COUNT(*) FROM tags").unwrap();
   assert_eq!(stmt.next().unwrap().unwrap().int64(0), 0);
}

#[test]
fn test_rollback_survives_reopen() {
   let temp_dir = TempDir::new().unwrap();
   let path = temp_dir.path().join("durable.db");

   {
      let mut conn = Connection::open(&path).unwrap();
      conn
         .execute("CREATE TABLE todos (id INTEGER PRIMARY KEY, text TEXT, done BOOLEAN)")
         .unwrap();

      let err = BulkInsertJob::new(INSERT_TODO)
         .row([Value::from("kept out"), Value::from(true)])
         .row([Value::from("short")])
         .execute(&conn)
         .unwrap_err();
      assert!(matches!(err, Error::BulkInsert { row: 1, .. }));

      BulkInsertJob::new(INSERT_TODO)
         .row([Value::from("kept"), Value::from(true)])
         .execute(&conn)
         .unwrap();
      conn.close().unwrap();
   }

   let conn = Connection::open(&path).unwrap();
   let mut stmt = conn.prepare("SELECT text, done FROM todos").unwrap();
   assert_eq!(
      stmt.query_all().unwrap(),
      vec![vec![Value::from("kept"), Value::Integer(1)]]
   );
}

#[test]
fn test_text_rows_through_wrapper() {
   let temp_dir = TempDir::new().unwrap();
   let db = DatabaseWrapper::connect(temp_dir.path().join("wrapper.db"), None).unwrap();
   db.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)", vec![])
      .unwrap();

   let job = BulkInsertJob::from_text_rows(
      "INSERT INTO kv (k, v) VALUES (?, ?)",
      [["a", "1"], ["b", "2"], ["c", "3"]],
   );
   assert_eq!(db.bulk_insert(&job).unwrap().rows_inserted, 3);

   let rows = db.fetch_all("SELECT v FROM kv ORDER BY k", vec![]).unwrap();
   let values: Vec<_> = rows.iter().map(|r| r["v"].clone()).collect();
   assert_eq!(values, [serde_json::json!("1"), serde_json::json!("2"), serde_json::json!("3")]);

   db.close().unwrap();
}

#[test]
fn test_empty_job_is_noop() {
   let (conn, _temp) = create_todos_db();
   let report = BulkInsertJob::new(INSERT_TODO).execute(&conn).unwrap();
   assert_eq!(report.rows_inserted, 0);
   assert_eq!(count_todos(&conn), 0);
}
