use std::fmt::Display;

/// Custom Result type for flatdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flatdb
///
/// Every statement either succeeds or fails with exactly one of these. All of
/// them are recovered at the statement boundary; only `Internal` signals an
/// unexpected fault (I/O, persistence, configuration).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Statement was recognized but its body is malformed
    Parse(String),
    /// A table-scoped statement ran without an active database
    NoDatabaseSelected,
    /// Database, table, column or field does not exist
    NotFound(String),
    /// Database or table name is already taken
    AlreadyExists(String),
    /// Foreign key names a table or column that does not exist
    Reference(String),
    /// Insert would duplicate a full row or a primary key value
    DuplicateKey(String),
    /// Statement text matches no known statement shape
    UnsupportedStatement(String),
    /// A replayed pending-log line is not an INSERT, UPDATE or DELETE
    UnknownOperation(String),
    /// BEGIN/COMMIT/ROLLBACK issued in the wrong transaction state
    TransactionState(String),
    /// Internal error (storage, configuration, etc.)
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Error::Internal(value.error.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Internal(format!("invalid config: {}", value))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(value: toml::ser::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error: {}", err),
            Error::NoDatabaseSelected => write!(f, "no database selected"),
            Error::NotFound(what) => write!(f, "{} does not exist", what),
            Error::AlreadyExists(what) => write!(f, "{} already exists", what),
            Error::Reference(err) => write!(f, "reference error: {}", err),
            Error::DuplicateKey(err) => write!(f, "duplicate key: {}", err),
            Error::UnsupportedStatement(sql) => write!(f, "unsupported statement: {}", sql),
            Error::UnknownOperation(sql) => write!(f, "unknown operation: {}", sql),
            Error::TransactionState(err) => write!(f, "transaction error: {}", err),
            Error::Internal(err) => write!(f, "internal error: {}", err),
        }
    }
}
