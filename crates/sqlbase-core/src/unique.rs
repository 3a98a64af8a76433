//! Uniqueness-violation detection from driver error text.
//!
//! Drivers do not expose a structured "unique violation" code above the
//! connection layer, so classification matches known fragments of each
//! dialect's message wording. This is a heuristic: a driver that rewords its
//! messages will produce false negatives. The fragments below have not been
//! verified against current driver releases.

use crate::dialect::Dialect;
use crate::error::Result;

const POSTGRESQL_PATTERNS: &[&str] = &[
    "duplicate key value violates unique constraint",
    "is not unique",
];

const MSSQL_PATTERNS: &[&str] = &[
    "Cannot insert duplicate key",
    "Violation of UNIQUE KEY constraint",
    "unique index",
];

const SQLITE_PATTERNS: &[&str] = &[
    "UNIQUE constraint failed",
    "is not unique",
    "are not unique",
];

/// Dialect-aware uniqueness-violation classifier.
pub struct UniqueViolation;

impl UniqueViolation {
    /// Message fragments that indicate a uniqueness violation for `dialect`.
    #[must_use]
    pub const fn patterns(dialect: Dialect) -> &'static [&'static str] {
        match dialect {
            Dialect::Postgresql => POSTGRESQL_PATTERNS,
            Dialect::Mssql => MSSQL_PATTERNS,
            Dialect::Sqlite => SQLITE_PATTERNS,
        }
    }

    /// Whether `error_text` reports a uniqueness violation.
    ///
    /// With `field` set, the field token must also appear in the text.
    #[must_use]
    pub fn matches(dialect: Dialect, error_text: &str, field: Option<&str>) -> bool {
        let pattern_hit = Self::patterns(dialect)
            .iter()
            .any(|p| error_text.contains(p));
        if !pattern_hit {
            return false;
        }
        field.is_none_or(|f| error_text.contains(f))
    }
}

/// Classify `error_text` for a dialect given by name.
///
/// Fails with a configuration error when `dialect` is not one of the
/// supported dialects rather than silently answering `false`.
pub fn is_unique_violation(dialect: &str, error_text: &str, field: Option<&str>) -> Result<bool> {
    let dialect: Dialect = dialect.parse()?;
    Ok(UniqueViolation::matches(dialect, error_text, field))
}
