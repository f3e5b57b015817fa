use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    sql::{
        engine::{Context, Engine},
        executor::{Executor, ResultSet},
        types::{check_field, check_row, column_position, Row},
    },
};

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    values: Vec<String>,
}

impl Insert {
    pub fn new(table_name: String, columns: Vec<String>, values: Vec<String>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

impl<E: Engine> Executor<E> for Insert {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        let table = engine.must_get_table(db, &self.table_name)?;

        if self.columns.len() != self.values.len() {
            return Err(Error::Parse(format!(
                "{} columns given but {} values",
                self.columns.len(),
                self.values.len()
            )));
        }
        for (i, col) in self.columns.iter().enumerate() {
            table.get_col_index(col)?;
            if column_position(&self.columns[..i], col).is_some() {
                return Err(Error::Parse(format!("column {} listed twice", col)));
            }
        }
        let header = table.header();
        if self.values.len() != header.len() {
            return Err(Error::Parse(format!(
                "table {} has {} columns but {} values were given",
                table.name,
                header.len(),
                self.values.len()
            )));
        }
        for value in &self.values {
            check_field(value)?;
        }

        // Values are stored in the order the statement lists them
        let ordered = self
            .columns
            .iter()
            .zip(&header)
            .all(|(c, h)| c.eq_ignore_ascii_case(h));
        if !ordered {
            warn!(
                "insert into {} lists columns out of schema order, storing them as given",
                table.name
            );
        }

        let row: Row = self.values.iter().map(|v| v.trim().to_string()).collect();
        check_row(&row)?;
        let existing = engine
            .scan_rows(db, &self.table_name)?
            .skip(1)
            .collect::<Result<Vec<_>>>()?;

        if existing.contains(&row) {
            return Err(Error::DuplicateKey(format!(
                "row ({}) already exists in {}",
                row.join(", "),
                table.name
            )));
        }
        if let Some(pk) = table.primary_key() {
            if let Some(pos) = column_position(&self.columns, &pk.name) {
                if existing.iter().any(|r| r.get(pos) == Some(&row[pos])) {
                    return Err(Error::DuplicateKey(format!(
                        "primary key {} = {} already exists in {}",
                        pk.name, row[pos], table.name
                    )));
                }
            }
        }

        engine.append_row(db, &self.table_name, &row)?;
        debug!("inserted 1 row into {}", table.name);
        Ok(ResultSet::Insert { count: 1 })
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    columns: Vec<(String, String)>,
    where_clause: (String, String),
}

impl Update {
    pub fn new(
        table_name: String,
        columns: Vec<(String, String)>,
        where_clause: (String, String),
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            where_clause,
        })
    }
}

impl<E: Engine> Executor<E> for Update {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        let table = engine.must_get_table(db, &self.table_name)?;

        // Every referenced column is resolved before any row is touched
        let (field, expected) = &self.where_clause;
        let filter = engine.find_column_index(db, &self.table_name, field)?;
        let mut targets = Vec::with_capacity(self.columns.len());
        for (col, value) in &self.columns {
            check_field(value)?;
            targets.push((table.get_col_index(col)?, value.trim().to_string()));
        }

        let mut rows = engine
            .scan_rows(db, &self.table_name)?
            .skip(1)
            .collect::<Result<Vec<_>>>()?;
        let mut count = 0;
        for row in rows.iter_mut().filter(|r| matches(r, filter, expected)) {
            for (i, value) in &targets {
                if let Some(field) = row.get_mut(*i) {
                    *field = value.clone();
                }
            }
            check_row(row)?;
            count += 1;
        }

        if count > 0 {
            engine.rewrite_rows(db, &self.table_name, &rows)?;
        }
        debug!("updated {} row(s) in {}", count, table.name);
        Ok(ResultSet::Update { count })
    }
}

/// DELETE executor
pub struct Delete {
    table_name: String,
    where_clause: (String, String),
}

impl Delete {
    pub fn new(table_name: String, where_clause: (String, String)) -> Box<Self> {
        Box::new(Self {
            table_name,
            where_clause,
        })
    }
}

impl<E: Engine> Executor<E> for Delete {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        let table = engine.must_get_table(db, &self.table_name)?;
        let (field, expected) = &self.where_clause;
        let filter = engine.find_column_index(db, &self.table_name, field)?;

        let rows = engine
            .scan_rows(db, &self.table_name)?
            .skip(1)
            .collect::<Result<Vec<_>>>()?;
        let (removed, kept): (Vec<Row>, Vec<Row>) =
            rows.into_iter().partition(|r| matches(r, filter, expected));

        let count = removed.len();
        if count > 0 {
            engine.rewrite_rows(db, &self.table_name, &kept)?;
        }
        debug!("deleted {} row(s) from {}", count, table.name);
        Ok(ResultSet::Delete { count })
    }
}

/// WHERE equality: exact comparison of trimmed text
pub(super) fn matches(row: &Row, index: usize, expected: &str) -> bool {
    row.get(index).is_some_and(|v| v.trim() == expected.trim())
}
