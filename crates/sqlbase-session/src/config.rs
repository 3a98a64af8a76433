//! Database configuration.
//!
//! A [`DbConfig`] carries the database URL plus the handful of switches that
//! govern sessions and test setup. It can be deserialized from an application
//! settings file or built in code:
//!
//! ```ignore
//! let config = DbConfig::new("sqlite:///app.db").echo(true);
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use sqlbase_core::{Dialect, Error, Result};

/// Environment variable read by [`DbConfig::from_env`].
pub const DATABASE_URL_ENV: &str = "SQLBASE_DATABASE_URL";

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Database URL, e.g. `sqlite:///app.db` or `postgresql://user@host/db`.
    pub url: String,
    /// Log every SQL statement at info level instead of debug.
    pub echo: bool,
    /// Open a transaction implicitly on the first statement of a session.
    pub auto_begin: bool,
    /// Rebuild the schema before a test run.
    pub pre_test_init: bool,
    /// When rebuilding for tests, delete rows instead of dropping objects.
    pub clear_data_only: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://".to_string(),
            echo: false,
            auto_begin: false,
            pre_test_init: true,
            clear_data_only: false,
        }
    }
}

impl DbConfig {
    /// Configuration for `url` with default switches.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let config = Self::new(url);
        config.dialect()?;
        Ok(config)
    }

    /// Read the URL from `SQLBASE_DATABASE_URL`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(DATABASE_URL_ENV)
            .map_err(|_| Error::config(format!("{DATABASE_URL_ENV} is not set")))?;
        Self::from_url(&url)
    }

    /// Set SQL echo.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set implicit transaction begin.
    pub fn auto_begin(mut self, auto_begin: bool) -> Self {
        self.auto_begin = auto_begin;
        self
    }

    /// Set whether tests rebuild the schema first.
    pub fn pre_test_init(mut self, enabled: bool) -> Self {
        self.pre_test_init = enabled;
        self
    }

    /// Set whether test setup only deletes rows.
    pub fn clear_data_only(mut self, data_only: bool) -> Self {
        self.clear_data_only = data_only;
        self
    }

    /// URL scheme, without any `+driver` suffix.
    fn scheme(&self) -> Result<&str> {
        let (scheme, _) = self
            .url
            .split_once("://")
            .ok_or_else(|| Error::config(format!("malformed database URL: {}", self.url)))?;
        Ok(scheme.split('+').next().unwrap_or(scheme))
    }

    /// Dialect named by the URL scheme.
    pub fn dialect(&self) -> Result<Dialect> {
        self.scheme()?.parse()
    }

    /// Database file for a SQLite URL; `None` means in-memory.
    ///
    /// `sqlite://` is in-memory, `sqlite:///app.db` is relative to the working
    /// directory and `sqlite:////var/db/app.db` is absolute.
    pub fn sqlite_path(&self) -> Result<Option<PathBuf>> {
        if self.dialect()? != Dialect::Sqlite {
            return Err(Error::config(format!(
                "not a SQLite URL: {}",
                self.url
            )));
        }
        let rest = self
            .url
            .split_once("://")
            .map_or("", |(_, rest)| rest);
        let path = rest.strip_prefix('/').unwrap_or(rest);
        if path.is_empty() || path == ":memory:" {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(path)))
        }
    }
}
