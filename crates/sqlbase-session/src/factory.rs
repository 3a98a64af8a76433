//! Scoped session acquisition.
//!
//! The factory plays the part of request middleware: it opens a session for a
//! unit of work and, when the work is done, rolls back anything left open and
//! releases the connection.

use sqlbase_core::{Connection, Result};

use crate::config::DbConfig;
use crate::session::Session;

/// Opens a driver connection for a configuration.
pub type Connector = Box<dyn Fn(&DbConfig) -> Result<Box<dyn Connection>> + Send + Sync>;

/// Creates sessions from one configuration.
pub struct SessionFactory {
    config: DbConfig,
    connector: Connector,
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionFactory {
    /// Create a factory. The dialect of `config` is validated up front.
    pub fn new<F>(config: DbConfig, connector: F) -> Result<Self>
    where
        F: Fn(&DbConfig) -> Result<Box<dyn Connection>> + Send + Sync + 'static,
    {
        config.dialect()?;
        Ok(Self {
            config,
            connector: Box::new(connector),
        })
    }

    /// The configuration sessions are created from.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Open a new session. The caller is responsible for closing it.
    pub fn open(&self) -> Result<Session> {
        let conn = (self.connector)(&self.config)?;
        Ok(Session::with_config(conn, &self.config))
    }

    /// Run `work` with a fresh session, then close it.
    ///
    /// Closing rolls back any transaction `work` left open. An error from
    /// `work` takes precedence over an error from closing.
    #[tracing::instrument(level = "debug", skip(self, work))]
    pub fn scope<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.open()?;
        let result = work(&mut session);
        let closed = session.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(error = %close_err, "closing session after failed work");
                Err(err)
            }
        }
    }
}
