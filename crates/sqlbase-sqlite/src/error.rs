//! Mapping of rusqlite errors onto the sqlbase error taxonomy.

use rusqlite::ErrorCode;
use sqlbase_core::{Error, QueryError, QueryErrorKind};

/// Convert a driver error, keeping the driver message verbatim.
///
/// The message text is what the uniqueness classifier inspects, so it is
/// never rewritten.
pub fn map_error(err: rusqlite::Error, sql: &str) -> Error {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => QueryErrorKind::Constraint,
            ErrorCode::Unknown => QueryErrorKind::Syntax,
            ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::PermissionDenied => {
                QueryErrorKind::Connection
            }
            _ => QueryErrorKind::Database,
        },
        _ => QueryErrorKind::Database,
    };
    let message = err.to_string();
    Error::Query(QueryError::new(kind, message).with_sql(sql).with_source(err))
}

/// Convert a failure to open a database file.
pub fn map_open_error(err: rusqlite::Error, target: &str) -> Error {
    let message = format!("cannot open SQLite database {target}: {err}");
    Error::Query(QueryError::new(QueryErrorKind::Connection, message).with_source(err))
}
