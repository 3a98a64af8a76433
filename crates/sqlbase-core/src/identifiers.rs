//! Identifier quoting and validation.

use crate::dialect::Dialect;
use crate::error::{Error, QueryError, QueryErrorKind, Result};

/// Quote an identifier for `dialect`.
///
/// SQLite and PostgreSQL use double quotes, SQL Server uses brackets. Embedded
/// closing quote characters are doubled.
pub fn quote_ident(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::Sqlite | Dialect::Postgresql => format!("\"{}\"", name.replace('"', "\"\"")),
        Dialect::Mssql => quote_ident_mssql(name),
    }
}

/// Quote an identifier with SQL Server brackets.
pub fn quote_ident_mssql(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Check that `name` can be used unquoted as a savepoint name.
///
/// Names must start with a letter or underscore, contain only ASCII
/// alphanumerics and underscores, and be at most 63 characters.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
    let invalid = |msg: String| Error::Query(QueryError::new(QueryErrorKind::Syntax, msg));
    if name.is_empty() {
        return Err(invalid("Savepoint name cannot be empty".to_string()));
    }
    if name.len() > 63 {
        return Err(invalid(
            "Savepoint name exceeds maximum length of 63 characters".to_string(),
        ));
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(invalid(
                "Savepoint name must start with a letter or underscore".to_string(),
            ));
        }
    }
    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(invalid(format!(
            "Savepoint name contains invalid character: '{c}'"
        )));
    }
    Ok(())
}
