use std::fmt::Display;

use crate::{
    error::{Error, Result},
    sql::{
        engine::{Context, Engine},
        executor::{
            mutation::{Delete, Insert, Update},
            query::Select,
            schema::{CreateDatabase, CreateTable, DropTable, Use},
        },
        parser::ast::Statement,
        types::Row,
    },
};

mod mutation;
mod query;
mod schema;

/// Statement executor trait
pub trait Executor<E: Engine> {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet>;
}

/// Builds an executor from a parsed statement
///
/// The `'static` bound is required for trait object usage.
impl<E: Engine + 'static> dyn Executor<E> {
    pub fn build(stmt: Statement) -> Result<Box<dyn Executor<E>>> {
        let executor: Box<dyn Executor<E>> = match stmt {
            Statement::CreateDatabase { name } => CreateDatabase::new(name),
            Statement::CreateTable { name, columns } => CreateTable::new(name, columns),
            Statement::Use { name } => Use::new(name),
            Statement::DropTable { table_name } => DropTable::new(table_name),
            Statement::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Statement::Select {
                projection,
                table_name,
                where_clause,
            } => Select::new(table_name, projection, where_clause),
            Statement::Update {
                table_name,
                columns,
                where_clause,
            } => Update::new(table_name, columns, where_clause),
            Statement::Delete {
                table_name,
                where_clause,
            } => Delete::new(table_name, where_clause),
            // Transaction control is handled by the coordinator
            stmt @ (Statement::Begin | Statement::Commit | Statement::Rollback) => {
                return Err(Error::UnsupportedStatement(format!("{:?}", stmt.kind())));
            }
        };
        Ok(executor)
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateDatabase { name: String },
    CreateTable { table_name: String },
    Use { database: String },
    Insert { count: usize },
    Select { columns: Vec<String>, rows: Vec<Row> },
    Update { count: usize },
    Delete { count: usize },
    DropTable { table_name: String },
    Begin { database: String },
    /// Statement was appended to the pending log; `pending` lines are queued
    Deferred { pending: usize },
    /// Replayed lines that applied, and the lines skipped with their error
    Commit {
        applied: usize,
        skipped: Vec<(String, Error)>,
    },
    Rollback { discarded: usize },
}

impl Display for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::CreateDatabase { name } => write!(f, "database {} created", name),
            ResultSet::CreateTable { table_name } => write!(f, "table {} created", table_name),
            ResultSet::Use { database } => write!(f, "using database {}", database),
            ResultSet::Insert { count } => write!(f, "{} row(s) inserted", count),
            ResultSet::Select { columns, rows } => {
                writeln!(f, "{}", columns.join(" | "))?;
                for row in rows {
                    writeln!(f, "{}", row.join(" | "))?;
                }
                write!(f, "({} row(s))", rows.len())
            }
            ResultSet::Update { count } => write!(f, "{} row(s) updated", count),
            ResultSet::Delete { count } => write!(f, "{} row(s) deleted", count),
            ResultSet::DropTable { table_name } => write!(f, "table {} dropped", table_name),
            ResultSet::Begin { database } => write!(f, "transaction started on {}", database),
            ResultSet::Deferred { pending } => {
                write!(f, "statement deferred ({} pending)", pending)
            }
            ResultSet::Commit { applied, skipped } => {
                write!(f, "committed: {} applied, {} skipped", applied, skipped.len())?;
                for (line, err) in skipped {
                    write!(f, "\n  skipped {}: {}", line, err)?;
                }
                Ok(())
            }
            ResultSet::Rollback { discarded } => {
                write!(f, "rolled back: {} statement(s) discarded", discarded)
            }
        }
    }
}
