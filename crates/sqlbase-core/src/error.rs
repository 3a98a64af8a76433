//! Error types for sqlbase.
//!
//! Every fallible operation in the workspace returns [`Result`], built on the
//! single [`Error`] enum below. Callers see one of:
//!
//! - a configuration problem (`Config`), which is never recovered,
//! - a missing or mistyped path (`NotFound`, `WrongKind`),
//! - a propagated storage error (`Query`),
//! - a usage error raised before any storage work (`Usage`),
//! - the exactly-one accessor outcomes (`NoResultFound`, `MultipleResultsFound`),
//! - a value conversion problem (`Conversion`) or an I/O failure (`Io`).

use std::fmt;
use std::path::PathBuf;

use crate::dialect::Dialect;
use crate::unique::UniqueViolation;

/// Result alias used throughout sqlbase.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all sqlbase operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration, such as an unsupported dialect or a malformed URL.
    Config(String),
    /// A filesystem target that does not exist.
    NotFound(PathBuf),
    /// A filesystem target that exists but is not of the expected kind.
    WrongKind {
        /// The offending path.
        path: PathBuf,
        /// What the caller expected to find there.
        expected: PathKind,
    },
    /// An error reported by the storage driver.
    Query(QueryError),
    /// The caller invoked an operation without required information.
    Usage(String),
    /// An exactly-one accessor found zero rows.
    NoResultFound,
    /// An exactly-one accessor found more than one row.
    MultipleResultsFound {
        /// Number of rows that matched.
        count: usize,
    },
    /// A value could not be converted to or from a column type.
    Conversion {
        /// Column being converted, when known.
        column: Option<String>,
        /// Human-readable description.
        message: String,
    },
    /// Filesystem I/O error.
    Io(std::io::Error),
}

/// Kind of filesystem entry expected by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A directory.
    Directory,
    /// A regular file.
    File,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Directory => write!(f, "directory"),
            PathKind::File => write!(f, "file"),
        }
    }
}

/// Error reported by the storage driver.
#[derive(Debug)]
pub struct QueryError {
    /// Classification of the failure.
    pub kind: QueryErrorKind,
    /// Driver-provided message, unmodified.
    pub message: String,
    /// SQL statement that failed, when known.
    pub sql: Option<String>,
    /// Underlying driver error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Broad classification of storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Integrity constraint violation (unique, foreign key, not null, check).
    Constraint,
    /// SQL syntax or unknown object error.
    Syntax,
    /// The connection is unusable.
    Connection,
    /// Any other database-side failure.
    Database,
}

impl QueryError {
    /// Create a query error with the given kind and message.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Attach the SQL statement that failed.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Attach the underlying driver error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Shorthand for a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    /// Shorthand for a conversion error on a known column.
    pub fn conversion(column: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Conversion {
            column: Some(column.into()),
            message: msg.into(),
        }
    }

    /// Shorthand for a storage error of kind [`QueryErrorKind::Database`].
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Query(QueryError::new(QueryErrorKind::Database, msg))
    }

    /// Error for a column name that the record type does not define.
    pub fn unknown_field(table: &str, column: &str) -> Self {
        Error::Usage(format!("table \"{table}\" has no column \"{column}\""))
    }

    /// Tag a conversion error with the column it occurred on.
    ///
    /// Other variants, and conversion errors that already name a column, are
    /// returned unchanged.
    #[must_use]
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Error::Conversion {
                column: None,
                message,
            } => Error::Conversion {
                column: Some(column.to_string()),
                message,
            },
            other => other,
        }
    }

    /// Returns the query error if this is a storage error.
    pub fn as_query(&self) -> Option<&QueryError> {
        match self {
            Error::Query(q) => Some(q),
            _ => None,
        }
    }

    /// Whether this is a constraint violation reported by the driver.
    pub fn is_constraint(&self) -> bool {
        matches!(self, Error::Query(q) if q.kind == QueryErrorKind::Constraint)
    }

    /// Whether this is a uniqueness violation, optionally implicating `field`.
    ///
    /// Only constraint errors are considered; classification is done by
    /// matching the driver's message text for `dialect`.
    pub fn is_unique_violation(&self, dialect: Dialect, field: Option<&str>) -> bool {
        match self {
            Error::Query(q) if q.kind == QueryErrorKind::Constraint => {
                UniqueViolation::matches(dialect, &q.message, field)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::NotFound(path) => write!(f, "not found: {}", path.display()),
            Error::WrongKind { path, expected } => write!(
                f,
                "path found, but \"{}\" is not a {expected}",
                path.display()
            ),
            Error::Query(q) => write!(f, "{q}"),
            Error::Usage(msg) => write!(f, "usage error: {msg}"),
            Error::NoResultFound => write!(f, "No row was found for one()"),
            Error::MultipleResultsFound { count } => {
                write!(f, "Multiple rows were found for one() (found {count})")
            }
            Error::Conversion { column, message } => match column {
                Some(col) => write!(f, "conversion error on column \"{col}\": {message}"),
                None => write!(f, "conversion error: {message}"),
            },
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(sql) = &self.sql {
            write!(f, " [SQL: {sql}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(q) => q
                .source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::Query(e)
    }
}
