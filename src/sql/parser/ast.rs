/// Abstract Syntax Tree (AST) node definitions for statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE DATABASE statement
    CreateDatabase { name: String },
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        columns: Vec<Column>,
    },
    /// USE statement
    Use { name: String },
    /// INSERT statement, values are positional to `columns`
    Insert {
        table_name: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    /// SELECT statement
    Select {
        projection: Projection,
        table_name: String,
        where_clause: Option<(String, String)>,
    },
    /// UPDATE statement
    Update {
        table_name: String,
        /// SET targets in statement order
        columns: Vec<(String, String)>,
        where_clause: (String, String),
    },
    /// DELETE statement
    Delete {
        table_name: String,
        where_clause: (String, String),
    },
    /// DROP TABLE statement
    DropTable { table_name: String },
    Begin,
    Commit,
    Rollback,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::CreateDatabase { .. } => StatementKind::CreateDatabase,
            Statement::CreateTable { .. } => StatementKind::CreateTable,
            Statement::Use { .. } => StatementKind::Use,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Select { .. } => StatementKind::Select,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
            Statement::DropTable { .. } => StatementKind::DropTable,
            Statement::Begin => StatementKind::Begin,
            Statement::Commit => StatementKind::Commit,
            Statement::Rollback => StatementKind::Rollback,
        }
    }
}

/// Statement kind, recognizable from the leading keywords alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateDatabase,
    CreateTable,
    Use,
    Insert,
    Select,
    Update,
    Delete,
    DropTable,
    Begin,
    Commit,
    Rollback,
}

impl StatementKind {
    /// Statements that change stored state
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::CreateDatabase
                | Self::CreateTable
                | Self::Insert
                | Self::Update
                | Self::Delete
                | Self::DropTable
        )
    }

    /// Statements that need an active database
    pub fn is_table_scoped(self) -> bool {
        matches!(
            self,
            Self::CreateTable
                | Self::Insert
                | Self::Select
                | Self::Update
                | Self::Delete
                | Self::DropTable
        )
    }

    /// Statements a commit can replay from the pending log
    pub fn is_replayable(self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// SELECT column list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    Columns(Vec<String>),
}

/// Column definition for CREATE TABLE statements
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: String,
    pub primary_key: bool,
    /// `REFERENCES <table>.<column>`
    pub references: Option<(String, String)>,
    /// Optional relationship label written after the reference
    pub relation: Option<String>,
}
