use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    storage::disk::DiskEngine,
};

use super::{
    executor::{Executor, ResultSet},
    parser::{ast::Statement, Parser},
    schema::Table,
    types::{column_position, Row},
};

pub mod flat;
pub mod transaction;

pub use flat::FlatEngine;
use transaction::Transaction;

/// Catalog and row store trait (databases, tables and rows)
///
/// Different from storage::engine::Engine which only knows about files and
/// lines. Every table operation is addressed by (database, table).
pub trait Engine {
    /// Rows of one table, header row first
    type Rows<'a>: Iterator<Item = Result<Row>>
    where
        Self: 'a;

    fn database_exists(&self, db: &str) -> bool;
    fn list_databases(&self) -> Result<Vec<String>>;
    fn create_database(&mut self, db: &str) -> Result<()>;

    fn list_tables(&self, db: &str) -> Result<Vec<String>>;
    fn table_exists(&self, db: &str, table: &str) -> bool;
    /// Validates and stores a new table: catalog entry plus header row
    fn create_table(&mut self, db: &str, table: Table) -> Result<()>;
    fn get_table(&self, db: &str, table: &str) -> Result<Option<Table>>;
    /// Returns table info, returns error if table doesn't exist
    fn must_get_table(&self, db: &str, table: &str) -> Result<Table> {
        self.get_table(db, table)?
            .ok_or_else(|| Error::NotFound(format!("table {}", table)))
    }

    /// Appends one row as-is; field count is checked by the caller
    fn append_row(&mut self, db: &str, table: &str, row: &[String]) -> Result<()>;
    /// Lazily scans the row store, header included
    fn scan_rows(&self, db: &str, table: &str) -> Result<Self::Rows<'_>>;
    /// Replaces every data row; the header is rewritten from the catalog
    fn rewrite_rows(&mut self, db: &str, table: &str, rows: &[Row]) -> Result<()>;
    fn drop_table(&mut self, db: &str, table: &str) -> Result<()>;

    /// Case-insensitive position of a column in the table header
    fn find_column_index(&self, db: &str, table: &str, column: &str) -> Result<usize> {
        let header = match self.scan_rows(db, table)?.next() {
            Some(header) => header?,
            None => Vec::new(),
        };
        column_position(&header, column)
            .ok_or_else(|| Error::NotFound(format!("column {} in table {}", column, table)))
    }

    // Transaction log plumbing
    fn create_pending(&mut self) -> Result<()>;
    fn append_pending(&mut self, line: &str) -> Result<()>;
    fn read_pending(&self) -> Result<Vec<String>>;
    fn discard_pending(&mut self) -> Result<()>;
    fn has_pending(&self) -> bool;
    fn append_audit(&mut self, line: &str) -> Result<()>;
}

/// Explicit session state handed to every executor
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Active database selected by USE
    pub database: Option<String>,
    /// Relationship label used when a REFERENCES clause gives none
    pub default_relation: String,
}

impl Context {
    pub fn new(default_relation: impl Into<String>) -> Self {
        Self { database: None, default_relation: default_relation.into() }
    }

    /// Returns the active database or `NoDatabaseSelected`
    pub fn must_database(&self) -> Result<&str> {
        self.database.as_deref().ok_or(Error::NoDatabaseSelected)
    }
}

/// Statement session: owns the engine, the context and the transaction
pub struct Session<E: Engine> {
    engine: E,
    context: Context,
    txn: Transaction,
}

impl Session<FlatEngine<DiskEngine>> {
    /// Opens a session on the configured data directory
    pub fn open(config: &Config) -> Result<Self> {
        let storage = DiskEngine::new(&config.data_dir)?;
        info!("opened data directory {}", storage.root().display());
        let engine = FlatEngine::with_logs(storage, &config.pending_log, &config.audit_log);
        Self::new(engine, Context::new(config.default_relation.clone()))
    }
}

impl<E: Engine + 'static> Session<E> {
    /// Creates a session; a pending log left by a crashed session is discarded
    pub fn new(mut engine: E, context: Context) -> Result<Self> {
        if engine.has_pending() {
            let stale = engine.read_pending()?.len();
            warn!("discarding stale pending log with {} unapplied statement(s)", stale);
            engine.discard_pending()?;
        }
        Ok(Self { engine, context, txn: Transaction::new() })
    }

    /// Executes one statement
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let kind = Parser::new(sql).statement_kind()?;
        // Database selection is checked before the statement body
        if kind.is_table_scoped() {
            self.context.must_database()?;
        }
        let stmt = Parser::new(sql).parse()?;
        debug!("executing {:?} statement", kind);

        let result = match stmt {
            Statement::Begin => self.txn.begin(&mut self.engine, &self.context),
            Statement::Commit => self.txn.commit(&mut self.engine, &self.context),
            Statement::Rollback => self.txn.rollback(&mut self.engine),
            _ if self.txn.is_open() && kind.is_mutating() => {
                self.txn.defer(&mut self.engine, &log_line(sql))
            }
            stmt => self.execute_statement(stmt, sql),
        };

        match result {
            Err(err @ Error::Internal(_)) if self.txn.is_open() => {
                warn!("rolling back open transaction after failure: {}", err);
                self.txn.rollback(&mut self.engine)?;
                Err(err)
            }
            result => result,
        }
    }

    fn execute_statement(&mut self, stmt: Statement, sql: &str) -> Result<ResultSet> {
        let mutating = stmt.kind().is_mutating();
        let result = <dyn Executor<E>>::build(stmt)?.execute(&mut self.engine, &mut self.context)?;
        if mutating {
            self.engine.append_audit(&log_line(sql))?;
        }
        Ok(result)
    }

    /// Active database, if any
    pub fn database(&self) -> Option<&str> {
        self.context.database.as_deref()
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.is_open()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

/// Flattens a statement to the single line stored in the pending and audit logs
pub fn log_line(sql: &str) -> String {
    sql.trim().replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{log_line, Context, Engine, FlatEngine, Session};
    use crate::{
        error::{Error, Result},
        sql::executor::ResultSet,
        storage::{engine::Engine as StorageEngine, memory::MemoryEngine},
    };

    fn session() -> Result<Session<FlatEngine<MemoryEngine>>> {
        Session::new(FlatEngine::new(MemoryEngine::new()), Context::new("relates to"))
    }

    #[test]
    fn test_database_selection() -> Result<()> {
        let mut s = session()?;
        assert_eq!(s.database(), None);

        // table-scoped statements fail before their body is parsed
        assert_eq!(s.execute("select * from"), Err(Error::NoDatabaseSelected));
        assert_eq!(s.execute("create table t (id int)"), Err(Error::NoDatabaseSelected));
        assert_eq!(s.execute("begin"), Err(Error::NoDatabaseSelected));
        assert!(matches!(s.execute("use shop"), Err(Error::NotFound(_))));

        s.execute("create database shop;")?;
        assert_eq!(s.execute("USE shop;")?, ResultSet::Use { database: "shop".into() });
        assert_eq!(s.database(), Some("shop"));
        Ok(())
    }

    #[test]
    fn test_statement_errors() -> Result<()> {
        let mut s = session()?;
        assert!(matches!(s.execute("alter table t add c int"), Err(Error::UnsupportedStatement(_))));
        assert!(matches!(s.execute("create database"), Err(Error::Parse(_))));
        assert!(matches!(s.execute(""), Err(Error::UnsupportedStatement(_))));
        Ok(())
    }

    #[test]
    fn test_stale_pending_discarded() -> Result<()> {
        let mut engine = FlatEngine::new(MemoryEngine::new());
        engine.append_pending("INSERT INTO t (a) VALUES (1)")?;
        let s = Session::new(engine, Context::new("relates to"))?;
        assert!(!s.engine().has_pending());
        assert!(!s.in_transaction());
        Ok(())
    }

    /// Storage holding database `shop` with table `broken`, whose catalog
    /// cannot be decoded
    fn broken_storage() -> Result<MemoryEngine> {
        let mut storage = MemoryEngine::new();
        let dir = Path::new("databases").join("shop").join("broken");
        storage.create_dir(&dir)?;
        storage.write_lines(&dir.join("metadata.txt"), &["lonely".to_string()])?;
        storage.write_lines(&dir.join("data.txt"), &["lonely".to_string()])?;
        Ok(storage)
    }

    #[test]
    fn test_internal_error_rolls_back() -> Result<()> {
        let mut s = Session::new(FlatEngine::new(broken_storage()?), Context::new("relates to"))?;
        s.execute("USE shop")?;
        s.execute("BEGIN")?;
        s.execute("INSERT INTO broken (lonely) VALUES (1)")?;
        assert!(s.engine().has_pending());

        assert!(matches!(s.execute("SELECT * FROM broken"), Err(Error::Internal(_))));
        assert!(!s.in_transaction());
        assert!(!s.engine().has_pending());
        assert!(matches!(s.execute("COMMIT"), Err(Error::TransactionState(_))));
        Ok(())
    }

    #[test]
    fn test_commit_aborts_on_internal_error() -> Result<()> {
        let mut s = Session::new(FlatEngine::new(broken_storage()?), Context::new("relates to"))?;
        s.execute("USE shop")?;
        s.execute("CREATE TABLE items (id int pk)")?;
        s.execute("BEGIN")?;
        s.execute("INSERT INTO items (id) VALUES (1)")?;
        s.execute("INSERT INTO broken (lonely) VALUES (1)")?;
        s.execute("INSERT INTO items (id) VALUES (2)")?;

        assert!(matches!(s.execute("COMMIT"), Err(Error::Internal(_))));
        assert!(!s.in_transaction());
        assert!(!s.engine().has_pending());
        // lines before the fault stay applied, lines after it are dropped
        let rows = s.engine().scan_rows("shop", "items")?.skip(1).collect::<Result<Vec<_>>>()?;
        assert_eq!(rows, vec![vec!["1"]]);
        Ok(())
    }

    #[test]
    fn test_log_line() {
        assert_eq!(
            log_line("INSERT INTO items (id)\n   VALUES (1);"),
            "INSERT INTO items (id)    VALUES (1);"
        );
    }
}
