//! Database dialect identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of database dialects sqlbase knows how to talk about.
///
/// A dialect is fixed for the lifetime of a connection. Everything that
/// differs per backend (placeholders, identifier quoting, driver error text)
/// keys off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgresql,
    /// Microsoft SQL Server.
    Mssql,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 3] = [Dialect::Sqlite, Dialect::Postgresql, Dialect::Mssql];

    /// Canonical lowercase name, also used as the SQL file suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Mssql => "mssql",
        }
    }

    /// Bind parameter placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Postgresql => format!("${index}"),
            Dialect::Mssql => format!("@P{index}"),
        }
    }

    /// Statement that opens a transaction.
    #[must_use]
    pub const fn begin_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => "BEGIN",
            Dialect::Mssql => "BEGIN TRANSACTION",
        }
    }

    /// Statement that commits the open transaction.
    #[must_use]
    pub const fn commit_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => "COMMIT",
            Dialect::Mssql => "COMMIT TRANSACTION",
        }
    }

    /// Statement that rolls back the open transaction.
    #[must_use]
    pub const fn rollback_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => "ROLLBACK",
            Dialect::Mssql => "ROLLBACK TRANSACTION",
        }
    }

    /// Statement that creates a savepoint.
    #[must_use]
    pub fn savepoint_sql(self, name: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => format!("SAVEPOINT {name}"),
            Dialect::Mssql => format!("SAVE TRANSACTION {name}"),
        }
    }

    /// Statement that releases a savepoint, if the dialect has one.
    ///
    /// SQL Server has no RELEASE; its savepoints live until the transaction ends.
    #[must_use]
    pub fn release_savepoint_sql(self, name: &str) -> Option<String> {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => Some(format!("RELEASE SAVEPOINT {name}")),
            Dialect::Mssql => None,
        }
    }

    /// Statement that rolls back to a savepoint.
    #[must_use]
    pub fn rollback_to_savepoint_sql(self, name: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgresql => format!("ROLLBACK TO SAVEPOINT {name}"),
            Dialect::Mssql => format!("ROLLBACK TRANSACTION {name}"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            "mssql" => Ok(Dialect::Mssql),
            other => Err(Error::config(format!("unsupported dialect: {other}"))),
        }
    }
}
