use std::{fs, path::Path};

use flatdb::{
    config::Config,
    error::{Error, Result},
    export,
    sql::{
        engine::{FlatEngine, Session},
        executor::ResultSet,
    },
    storage::disk::DiskEngine,
};
use tempfile::TempDir;

type DiskSession = Session<FlatEngine<DiskEngine>>;

fn open(dir: &TempDir) -> Result<DiskSession> {
    Session::open(&Config::builder().data_dir(dir.path()).build())
}

fn table_file(dir: &TempDir, file: &str) -> Result<String> {
    Ok(fs::read_to_string(
        dir.path().join("databases").join("shop").join("items").join(file),
    )?)
}

fn audit_lines(dir: &Path) -> usize {
    fs::read_to_string(dir.join("operation.log"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn setup(dir: &TempDir) -> Result<DiskSession> {
    let mut s = open(dir)?;
    s.execute("CREATE DATABASE shop;")?;
    s.execute("USE shop;")?;
    s.execute("CREATE TABLE items (id int pk, name varchar);")?;
    Ok(s)
}

#[test]
fn test_shop_items_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    let mut s = setup(&dir)?;

    assert_eq!(table_file(&dir, "metadata.txt")?, "id int pk\nname varchar\n\n");
    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n");

    s.execute("INSERT INTO items (id, name) VALUES (1, 'pen');")?;
    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n1 ### pen\n");

    // duplicate key leaves the store untouched
    assert!(matches!(
        s.execute("INSERT INTO items (id, name) VALUES (1, 'pen');"),
        Err(Error::DuplicateKey(_))
    ));
    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n1 ### pen\n");

    assert_eq!(
        s.execute("SELECT name FROM items WHERE id=1;")?,
        ResultSet::Select { columns: vec!["name".into()], rows: vec![vec!["pen".into()]] }
    );
    Ok(())
}

#[test]
fn test_state_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let mut s = setup(&dir)?;
        s.execute("INSERT INTO items (id, name) VALUES (1, 'pen')")?;
        s.execute("INSERT INTO items (id, name) VALUES (2, 'ink')")?;
        s.execute("UPDATE items SET name = 'gel' WHERE id = 2")?;
        s.execute("DELETE FROM items WHERE id = 1")?;
    }

    let mut s = open(&dir)?;
    // the active database is not persisted
    assert_eq!(s.execute("SELECT * FROM items"), Err(Error::NoDatabaseSelected));
    s.execute("USE shop")?;
    assert_eq!(
        s.execute("SELECT * FROM items")?,
        ResultSet::Select {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec!["2".into(), "gel".into()]],
        }
    );
    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n2 ### gel\n");
    // CREATE DATABASE, CREATE TABLE and four row mutations
    assert_eq!(audit_lines(dir.path()), 6);
    Ok(())
}

#[test]
fn test_transaction_rollback() -> Result<()> {
    let dir = TempDir::new()?;
    let mut s = setup(&dir)?;
    let audit_before = audit_lines(dir.path());

    s.execute("BEGIN")?;
    assert!(dir.path().join("temp_operation.log").exists());
    assert_eq!(
        s.execute("INSERT INTO items (id, name) VALUES (1, 'pen')")?,
        ResultSet::Deferred { pending: 1 }
    );
    // deferred statements are not visible before commit
    assert!(matches!(
        s.execute("SELECT * FROM items")?,
        ResultSet::Select { rows, .. } if rows.is_empty()
    ));
    assert!(matches!(s.execute("BEGIN"), Err(Error::TransactionState(_))));
    assert_eq!(s.execute("ROLLBACK")?, ResultSet::Rollback { discarded: 1 });

    assert!(!dir.path().join("temp_operation.log").exists());
    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n");
    assert_eq!(audit_lines(dir.path()), audit_before);
    assert!(matches!(s.execute("ROLLBACK"), Err(Error::TransactionState(_))));
    Ok(())
}

#[test]
fn test_transaction_commit() -> Result<()> {
    let dir = TempDir::new()?;
    let mut s = setup(&dir)?;
    let audit_before = audit_lines(dir.path());

    s.execute("BEGIN")?;
    s.execute("INSERT INTO items (id, name) VALUES (1, 'pen')")?;
    // syntax is checked before a statement is deferred
    assert!(matches!(s.execute("INSERT INTO items VALUES (1)"), Err(Error::Parse(_))));
    assert_eq!(
        s.execute("COMMIT")?,
        ResultSet::Commit { applied: 1, skipped: vec![] }
    );

    assert_eq!(table_file(&dir, "data.txt")?, "id ### name\n1 ### pen\n");
    assert_eq!(audit_lines(dir.path()), audit_before + 1);
    let audit = fs::read_to_string(dir.path().join("operation.log"))?;
    assert_eq!(audit.lines().last(), Some("INSERT INTO items (id, name) VALUES (1, 'pen')"));
    assert!(!dir.path().join("temp_operation.log").exists());
    assert!(!s.in_transaction());
    Ok(())
}

#[test]
fn test_stale_pending_log_discarded() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let mut s = setup(&dir)?;
        s.execute("BEGIN")?;
        s.execute("INSERT INTO items (id, name) VALUES (1, 'pen')")?;
        // dropped without COMMIT, as after a crash
    }
    assert!(dir.path().join("temp_operation.log").exists());

    let mut s = open(&dir)?;
    assert!(!dir.path().join("temp_operation.log").exists());
    s.execute("USE shop")?;
    assert!(matches!(
        s.execute("SELECT * FROM items")?,
        ResultSet::Select { rows, .. } if rows.is_empty()
    ));
    Ok(())
}

#[test]
fn test_reports_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let mut s = setup(&dir)?;
    s.execute("INSERT INTO items (id, name) VALUES (1, 'pen')")?;

    let dump = export::dump(s.engine(), "shop")?;
    assert!(dump.contains("CREATE TABLE items (\n    id int pk,\n    name varchar\n);"));
    assert!(dump.contains("INSERT INTO items (id, name) VALUES (1, 'pen');"));

    let erd = export::erd(s.engine(), "shop")?;
    assert_eq!(erd, "Table : items\n\tid int pk\n\tname varchar\n***************************\n");
    Ok(())
}
