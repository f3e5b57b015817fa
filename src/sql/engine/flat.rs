use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        schema::Table,
        types::{column_position, decode_row, encode_row, Row},
    },
    storage::engine::{Engine as StorageEngine, LineIterator},
};

use super::Engine;

/// Directory holding one subdirectory per database
pub const DATABASES_DIR: &str = "databases";
/// Default pending log file name, relative to the storage root
pub const PENDING_LOG: &str = "temp_operation.log";
/// Default audit log file name, relative to the storage root
pub const AUDIT_LOG: &str = "operation.log";

const METADATA_FILE: &str = "metadata.txt";
const DATA_FILE: &str = "data.txt";

/// Flat-file backed SQL engine
///
/// Layout below the storage root:
///
/// ```text
/// databases/<db>/<table>/metadata.txt   one column definition per line
/// databases/<db>/<table>/data.txt       header row, then data rows
/// temp_operation.log                    pending log of an open transaction
/// operation.log                         audit log
/// ```
pub struct FlatEngine<E: StorageEngine> {
    storage: E,
    pending_log: PathBuf,
    audit_log: PathBuf,
}

impl<E: StorageEngine> FlatEngine<E> {
    pub fn new(storage: E) -> Self {
        Self::with_logs(storage, PENDING_LOG, AUDIT_LOG)
    }

    /// Creates an engine with custom log file names
    pub fn with_logs(storage: E, pending_log: impl Into<PathBuf>, audit_log: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            pending_log: pending_log.into(),
            audit_log: audit_log.into(),
        }
    }

    pub fn storage(&self) -> &E {
        &self.storage
    }

    fn database_dir(db: &str) -> PathBuf {
        Path::new(DATABASES_DIR).join(db)
    }

    fn table_dir(db: &str, table: &str) -> PathBuf {
        Self::database_dir(db).join(table)
    }

    fn metadata_file(db: &str, table: &str) -> PathBuf {
        Self::table_dir(db, table).join(METADATA_FILE)
    }

    fn data_file(db: &str, table: &str) -> PathBuf {
        Self::table_dir(db, table).join(DATA_FILE)
    }

    fn must_table_exist(&self, db: &str, table: &str) -> Result<()> {
        if !self.table_exists(db, table) {
            return Err(Error::NotFound(format!("table {}", table)));
        }
        Ok(())
    }

    /// Checks every foreign key of `table` against the current catalog
    fn check_references(&self, db: &str, table: &Table) -> Result<()> {
        for col in &table.columns {
            let Some(fk) = &col.references else {
                continue;
            };
            if !self.table_exists(db, &fk.table) {
                return Err(Error::Reference(format!(
                    "column {} references missing table {}",
                    col.name, fk.table
                )));
            }
            let header = self.read_header(db, &fk.table)?;
            if column_position(&header, &fk.column).is_none() {
                return Err(Error::Reference(format!(
                    "column {} references missing column {}.{}",
                    col.name, fk.table, fk.column
                )));
            }
        }
        Ok(())
    }

    fn read_header(&self, db: &str, table: &str) -> Result<Row> {
        match self.scan_rows(db, table)?.next() {
            Some(header) => header,
            None => Err(Error::Internal(format!("table {} has no header row", table))),
        }
    }
}

impl<E: StorageEngine> Engine for FlatEngine<E> {
    type Rows<'a>
        = RowIter<E::LineIterator<'a>>
    where
        Self: 'a;

    fn database_exists(&self, db: &str) -> bool {
        self.storage.is_dir(&Self::database_dir(db))
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        self.storage.list_dirs(Path::new(DATABASES_DIR))
    }

    fn create_database(&mut self, db: &str) -> Result<()> {
        if self.database_exists(db) {
            return Err(Error::AlreadyExists(format!("database {}", db)));
        }
        debug!("creating database directory for {}", db);
        self.storage.create_dir(&Self::database_dir(db))
    }

    fn list_tables(&self, db: &str) -> Result<Vec<String>> {
        if !self.database_exists(db) {
            return Err(Error::NotFound(format!("database {}", db)));
        }
        Ok(self
            .storage
            .list_dirs(&Self::database_dir(db))?
            .into_iter()
            .filter(|t| self.table_exists(db, t))
            .collect())
    }

    fn table_exists(&self, db: &str, table: &str) -> bool {
        self.storage.exists(&Self::data_file(db, table))
    }

    fn create_table(&mut self, db: &str, table: Table) -> Result<()> {
        if !self.database_exists(db) {
            return Err(Error::NotFound(format!("database {}", db)));
        }
        table.validate()?;
        if self.table_exists(db, &table.name) {
            return Err(Error::AlreadyExists(format!("table {}", table.name)));
        }
        // Nothing is allocated until every reference resolves
        self.check_references(db, &table)?;

        self.storage.create_dir(&Self::table_dir(db, &table.name))?;
        self.storage
            .write_lines(&Self::metadata_file(db, &table.name), &table.to_metadata())?;
        self.storage.write_lines(
            &Self::data_file(db, &table.name),
            &[encode_row(&table.header())],
        )?;
        debug!("created table {} in {}", table.name, db);
        Ok(())
    }

    fn get_table(&self, db: &str, table: &str) -> Result<Option<Table>> {
        let path = Self::metadata_file(db, table);
        if !self.table_exists(db, table) || !self.storage.exists(&path) {
            return Ok(None);
        }
        let lines = self.storage.read_lines(&path)?.collect::<Result<Vec<_>>>()?;
        Ok(Some(Table::from_metadata(table, lines)?))
    }

    fn append_row(&mut self, db: &str, table: &str, row: &[String]) -> Result<()> {
        self.must_table_exist(db, table)?;
        self.storage.append_line(&Self::data_file(db, table), &encode_row(row))
    }

    fn scan_rows(&self, db: &str, table: &str) -> Result<Self::Rows<'_>> {
        self.must_table_exist(db, table)?;
        Ok(RowIter { lines: self.storage.read_lines(&Self::data_file(db, table))? })
    }

    fn rewrite_rows(&mut self, db: &str, table: &str, rows: &[Row]) -> Result<()> {
        let schema = self.must_get_table(db, table)?;
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(encode_row(&schema.header()));
        lines.extend(rows.iter().map(|r| encode_row(r)));
        debug!("rewriting {} rows of {}.{}", rows.len(), db, table);
        self.storage.write_lines(&Self::data_file(db, table), &lines)
    }

    fn drop_table(&mut self, db: &str, table: &str) -> Result<()> {
        self.must_table_exist(db, table)?;
        self.storage.remove_dir(&Self::table_dir(db, table))
    }

    fn create_pending(&mut self) -> Result<()> {
        self.storage.write_lines(&self.pending_log, &[])
    }

    fn append_pending(&mut self, line: &str) -> Result<()> {
        self.storage.append_line(&self.pending_log, line)
    }

    fn read_pending(&self) -> Result<Vec<String>> {
        if !self.storage.exists(&self.pending_log) {
            return Ok(Vec::new());
        }
        self.storage.read_lines(&self.pending_log)?.collect()
    }

    fn discard_pending(&mut self) -> Result<()> {
        self.storage.remove_file(&self.pending_log)
    }

    fn has_pending(&self) -> bool {
        self.storage.exists(&self.pending_log)
    }

    fn append_audit(&mut self, line: &str) -> Result<()> {
        self.storage.append_line(&self.audit_log, line)
    }
}

/// Decoded rows of one table, header first, blank lines skipped
pub struct RowIter<I: LineIterator> {
    lines: I,
}

impl<I: LineIterator> Iterator for RowIter<I> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some(Ok(decode_row(&line))),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
