//! Statement lifecycle, binding and column extraction against a real engine.

use sqlite_ffi_conn::{ColumnType, Connection, Error, StatementState, StepResult, Value};
use tempfile::TempDir;

fn setup_todos() -> (Connection, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let conn = Connection::open(temp_dir.path().join("todos.db")).unwrap();
   conn
      .execute("CREATE TABLE todos (id INTEGER PRIMARY KEY, text TEXT, done BOOLEAN)")
      .unwrap();
   (conn, temp_dir)
}

fn read_todos(conn: &Connection) -> Vec<(i64, String, bool)> {
   let mut stmt = conn
      .prepare("SELECT id, text, done FROM todos ORDER BY id")
      .unwrap();
   let mut todos = Vec::new();
   while let Some(row) = stmt.next().unwrap() {
      todos.push((row.int64(0), row.text(1), row.boolean(2)));
   }
   todos
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_plain_inserts_then_query() {
   let (conn, _temp) = setup_todos();

   conn.execute("INSERT INTO todos (text, done) VALUES ('Learn Go', false)")
      .unwrap();
   conn.execute("INSERT INTO todos (text, done) VALUES ('Learn SQLite3', false)")
      .unwrap();

   assert_eq!(
      read_todos(&conn),
      vec![
         (1, "Learn Go".to_string(), false),
         (2, "Learn SQLite3".to_string(), false),
      ]
   );
}

#[test]
fn test_prepared_insert_reused_with_booleans() {
   let (conn, _temp) = setup_todos();

   let mut insert = conn
      .prepare("INSERT INTO todos (text, done) VALUES (?, ?)")
      .unwrap();
   insert.execute(&["Learn Go".into(), false.into()]).unwrap();
   insert.execute(&["Learn SQLite3".into(), true.into()]).unwrap();
   assert_eq!(insert.state(), StatementState::Ready);
   drop(insert);

   assert_eq!(
      read_todos(&conn),
      vec![
         (1, "Learn Go".to_string(), false),
         (2, "Learn SQLite3".to_string(), true),
      ]
   );
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_reused_statement_matches_fresh_statement() {
   let (conn, _temp) = setup_todos();
   for (text, done) in [("a", false), ("b", true), ("c", true)] {
      let mut stmt = conn
         .prepare("INSERT INTO todos (text, done) VALUES (?, ?)")
         .unwrap();
      stmt.execute(&[text.into(), done.into()]).unwrap();
   }

   let mut reused = conn
      .prepare("SELECT text FROM todos WHERE done = ? ORDER BY id")
      .unwrap();

   for _ in 0..5 {
      for done in [true, false] {
         reused.reset().unwrap();
         reused.bind_bool(1, done).unwrap();
         let from_reused = reused.query_all().unwrap();

         let mut fresh = conn
            .prepare("SELECT text FROM todos WHERE done = ? ORDER BY id")
            .unwrap();
         fresh.bind_bool(1, done).unwrap();
         let from_fresh = fresh.query_all().unwrap();

         assert_eq!(from_reused, from_fresh);
      }
   }
}

#[test]
fn test_value_round_trip() {
   let conn = Connection::open_in_memory().unwrap();
   conn.execute("CREATE TABLE v (x)").unwrap();

   let values = vec![
      Value::Null,
      Value::Integer(i64::MIN),
      Value::Integer(i64::MAX),
      Value::Real(-1.5e300),
      Value::Text("héllo wörld".into()),
      Value::Text(String::new()),
      Value::Blob(vec![0, 255, 0, 128]),
   ];

   for value in &values {
      conn.execute("DELETE FROM v").unwrap();
      let mut insert = conn.prepare("INSERT INTO v (x) VALUES (?)").unwrap();
      insert.execute(std::slice::from_ref(value)).unwrap();
      drop(insert);

      let mut select = conn.prepare("SELECT x FROM v").unwrap();
      let row = select.next().unwrap().unwrap();
      assert_eq!(&row.get(0), value);
   }

   for flag in [true, false] {
      conn.execute("DELETE FROM v").unwrap();
      let mut insert = conn.prepare("INSERT INTO v (x) VALUES (?)").unwrap();
      insert.execute(&[Value::Boolean(flag)]).unwrap();
      drop(insert);

      let mut select = conn.prepare("SELECT x FROM v").unwrap();
      let row = select.next().unwrap().unwrap();
      assert_eq!(row.boolean(0), flag);
      assert_eq!(row.get(0), Value::Integer(i64::from(flag)));
   }
}

#[test]
fn test_row_values_outlive_the_step() {
   let conn = Connection::open_in_memory().unwrap();
   let mut stmt = conn
      .prepare("SELECT 'first', x'0102' UNION ALL SELECT 'second', x'0304'")
      .unwrap();

   let (text, blob) = {
      let row = stmt.next().unwrap().unwrap();
      (row.text(0), row.blob(1))
   };
   stmt.step().unwrap();
   stmt.reset().unwrap();

   assert_eq!(text, "first");
   assert_eq!(blob, vec![1, 2]);
}

#[test]
fn test_typed_accessors() {
   let conn = Connection::open_in_memory().unwrap();
   let mut stmt = conn.prepare("SELECT ?, ?, ?, ?, ?").unwrap();
   stmt.bind_int(1, 7).unwrap();
   stmt.bind_int64(2, 1 << 40).unwrap();
   stmt.bind_float(3, 2.5).unwrap();
   stmt.bind_null(4).unwrap();
   stmt.bind_text(5, "12").unwrap();

   assert_eq!(stmt.step().unwrap(), StepResult::Row);
   assert_eq!(stmt.column_int(0), 7);
   assert_eq!(stmt.column_int64(1), 1 << 40);
   assert_eq!(stmt.column_float(2), 2.5);
   assert!(stmt.is_column_null(3));
   assert_eq!(stmt.column_type(3), ColumnType::Null);
   assert_eq!(stmt.column_type(4), ColumnType::Text);
   // Engine coercion applies
   assert_eq!(stmt.column_int(4), 12);
}

#[test]
fn test_bindings_survive_reset_until_cleared() {
   let conn = Connection::open_in_memory().unwrap();
   let mut stmt = conn.prepare("SELECT ?").unwrap();
   stmt.bind_text(1, "sticky").unwrap();

   assert_eq!(stmt.query_all().unwrap(), vec![vec![Value::from("sticky")]]);
   assert_eq!(stmt.query_all().unwrap(), vec![vec![Value::from("sticky")]]);

   stmt.clear_bindings().unwrap();
   assert_eq!(stmt.query_all().unwrap(), vec![vec![Value::Null]]);
}

#[test]
fn test_execute_with_wrong_value_count() {
   let (conn, _temp) = setup_todos();
   let mut insert = conn
      .prepare("INSERT INTO todos (text, done) VALUES (?, ?)")
      .unwrap();

   let err = insert.execute(&["only one".into()]).unwrap_err();
   assert!(matches!(
      err,
      Error::BindCount {
         expected: 2,
         actual: 1
      }
   ));

   // The statement is still usable afterwards
   insert.execute(&["ok".into(), true.into()]).unwrap();
   drop(insert);
   assert_eq!(read_todos(&conn).len(), 1);
}

#[test]
fn test_execute_failure_leaves_statement_reusable() {
   let conn = Connection::open_in_memory().unwrap();
   conn.execute("CREATE TABLE u (name TEXT UNIQUE)").unwrap();

   let mut insert = conn.prepare("INSERT INTO u VALUES (?)").unwrap();
   insert.execute(&["a".into()]).unwrap();

   let err = insert.execute(&["a".into()]).unwrap_err();
   assert_eq!(err.error_code(), "STEP_ERROR");
   assert_eq!(insert.state(), StatementState::Ready);

   insert.execute(&["b".into()]).unwrap();
}

#[test]
fn test_bind_on_active_statement_is_rejected_by_engine() {
   let conn = Connection::open_in_memory().unwrap();
   let mut stmt = conn.prepare("SELECT ? UNION ALL SELECT 2").unwrap();
   stmt.bind_int(1, 1).unwrap();
   stmt.step().unwrap();

   let err = stmt.bind_int(1, 5).unwrap_err();
   assert!(matches!(err, Error::Bind { index: 1, .. }), "{err:?}");
}
