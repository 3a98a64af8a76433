//! SQLite driver for sqlbase.
//!
//! Wraps a [`rusqlite::Connection`] behind [`sqlbase_core::Connection`].
//! Foreign keys are switched on for every connection; timestamps are stored as
//! text in [`sqlbase_core::TIMESTAMP_FORMAT`].

pub mod connection;
pub mod error;

use sqlbase_core::{Connection, Dialect, Error, Result};
use sqlbase_session::DbConfig;

pub use connection::SqliteConnection;

/// Open a connection for `config`.
///
/// Suitable as the connector passed to [`sqlbase_session::SessionFactory`].
/// `sqlite://` opens a private in-memory database; `sqlite:///path` opens a
/// file relative to the working directory and `sqlite:////path` an absolute
/// one.
pub fn connect(config: &DbConfig) -> Result<Box<dyn Connection>> {
    let dialect = config.dialect()?;
    if dialect != Dialect::Sqlite {
        return Err(Error::config(format!(
            "the SQLite driver cannot open a {} database",
            dialect.name()
        )));
    }
    let conn = match config.sqlite_path()? {
        Some(path) => SqliteConnection::open(&path)?,
        None => SqliteConnection::open_in_memory()?,
    };
    Ok(Box::new(conn))
}
