//! The session: an explicit unit-of-work context over one connection.
//!
//! A [`Session`] owns a boxed [`Connection`] and tracks the transaction state
//! on it. It is passed explicitly to every data-access call; nothing is kept
//! in thread-local or global state, and there is no identity map, so every
//! read goes to storage.
//!
//! `Session` itself implements [`Connection`], which lets the statement
//! builders run against it directly while the session applies SQL echo and
//! implicit transaction begin.

use std::cell::Cell;

use sqlbase_core::{Connection, Dialect, Result, Row, Value, validate_savepoint_name};

use crate::config::DbConfig;

/// A unit-of-work context.
pub struct Session {
    conn: Box<dyn Connection>,
    echo: bool,
    auto_begin: bool,
    in_transaction: Cell<bool>,
    wrapper_depth: usize,
    savepoint_seq: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.conn.dialect())
            .field("echo", &self.echo)
            .field("auto_begin", &self.auto_begin)
            .field("in_transaction", &self.in_transaction.get())
            .field("wrapper_depth", &self.wrapper_depth)
            .finish()
    }
}

impl Session {
    /// Wrap a connection with default settings.
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self {
            conn,
            echo: false,
            auto_begin: false,
            in_transaction: Cell::new(false),
            wrapper_depth: 0,
            savepoint_seq: 0,
        }
    }

    /// Wrap a connection, taking echo and auto-begin from `config`.
    pub fn with_config(conn: Box<dyn Connection>, config: &DbConfig) -> Self {
        let mut session = Self::new(conn);
        session.echo = config.echo;
        session.auto_begin = config.auto_begin;
        session
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    /// Nesting depth of transaction wrappers currently running.
    pub fn wrapper_depth(&self) -> usize {
        self.wrapper_depth
    }

    pub(crate) fn enter_wrapper(&mut self) {
        self.wrapper_depth += 1;
    }

    pub(crate) fn exit_wrapper(&mut self) {
        self.wrapper_depth = self.wrapper_depth.saturating_sub(1);
    }

    fn log_sql(&self, sql: &str) {
        if self.echo {
            tracing::info!(dialect = %self.conn.dialect(), sql, "sql");
        } else {
            tracing::trace!(dialect = %self.conn.dialect(), sql, "sql");
        }
    }

    fn ensure_begun(&self) -> Result<()> {
        if self.auto_begin && !self.in_transaction.get() {
            self.begin_inner()?;
        }
        Ok(())
    }

    fn begin_inner(&self) -> Result<()> {
        let sql = self.conn.dialect().begin_sql();
        self.log_sql(sql);
        self.conn.execute_raw(sql)?;
        self.in_transaction.set(true);
        Ok(())
    }

    /// Begin a transaction. Does nothing if one is already open.
    pub fn begin(&mut self) -> Result<()> {
        if self.in_transaction.get() {
            return Ok(());
        }
        tracing::debug!("Beginning transaction");
        self.begin_inner()
    }

    /// Commit the open transaction. Does nothing if none is open.
    pub fn commit(&mut self) -> Result<()> {
        if !self.in_transaction.get() {
            return Ok(());
        }
        tracing::info!("Committing transaction");
        let sql = self.conn.dialect().commit_sql();
        self.log_sql(sql);
        self.conn.execute_raw(sql)?;
        self.in_transaction.set(false);
        Ok(())
    }

    /// Roll back the open transaction. Does nothing if none is open.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction.get() {
            return Ok(());
        }
        tracing::info!("Rolling back transaction");
        let sql = self.conn.dialect().rollback_sql();
        self.log_sql(sql);
        // The transaction is gone whether or not ROLLBACK itself succeeds.
        self.in_transaction.set(false);
        self.conn.execute_raw(sql)
    }

    /// Create a savepoint inside the open transaction and return its name.
    pub fn savepoint(&mut self) -> Result<String> {
        self.begin()?;
        self.savepoint_seq += 1;
        let name = format!("sp_{}", self.savepoint_seq);
        validate_savepoint_name(&name)?;
        let sql = self.conn.dialect().savepoint_sql(&name);
        self.log_sql(&sql);
        self.conn.execute_raw(&sql)?;
        Ok(name)
    }

    /// Release a savepoint, keeping its changes.
    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        if let Some(sql) = self.conn.dialect().release_savepoint_sql(name) {
            self.log_sql(&sql);
            self.conn.execute_raw(&sql)?;
        }
        Ok(())
    }

    /// Undo everything since a savepoint.
    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        tracing::debug!(savepoint = name, "Rolling back to savepoint");
        let sql = self.conn.dialect().rollback_to_savepoint_sql(name);
        self.log_sql(&sql);
        self.conn.execute_raw(&sql)?;
        self.release_savepoint(name)
    }

    /// Roll back anything left open and drop the connection.
    pub fn close(mut self) -> Result<()> {
        if self.in_transaction.get() {
            tracing::warn!("Session closed with an open transaction; rolling back");
        }
        self.rollback()
    }
}

impl Connection for Session {
    fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.ensure_begun()?;
        self.log_sql(sql);
        self.conn.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.ensure_begun()?;
        self.log_sql(sql);
        self.conn.query(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.ensure_begun()?;
        self.log_sql(sql);
        self.conn.insert(sql, params)
    }

    fn execute_raw(&self, sql: &str) -> Result<()> {
        self.ensure_begun()?;
        self.log_sql(sql);
        self.conn.execute_raw(sql)
    }
}
