//! Local file database walkthrough.
//!
//! Run with the native library on the loader path, or point `LIBSQL_RUNTIME_PATH` at it:
//!
//! ```text
//! RUST_LOG=libsql_driver=debug cargo run --example local
//! ```

use libsql_driver::{Batchable, Driver, Value};
use tracing_subscriber::EnvFilter;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::Builder::new().prefix("libsql-").tempdir()?;
    let dsn = format!("file:{}", dir.path().join("test.db").display());
    let conn = Driver.open(&dsn)?;

    conn.batch("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")?;
    for i in 0..10 {
        conn.prepare("INSERT INTO test (id, name) VALUES (?, ?)")?
            .execute(&[Value::Integer(i), format!("test-{i}").into()])?;
    }

    let mut select = conn.prepare("SELECT * FROM test")?;
    for (i, row) in select.query(&[])?.enumerate() {
        let row = row?;
        let want = [Value::Integer(i as i64), Value::Text(format!("test-{i}"))];
        if row != want {
            return Err(format!("row {i}: expected {want:?}, got {row:?}").into());
        }
    }

    conn.batch(
        "
        create table foo (i integer);
        insert into foo values (1);
        ",
    )?;
    println!("ok: {dsn}");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
