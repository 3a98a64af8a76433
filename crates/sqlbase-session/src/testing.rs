//! A scripted in-memory connection for session tests.

use std::sync::{Arc, Mutex};

use sqlbase_core::{Connection, Dialect, QueryError, QueryErrorKind, Result, Row, Value};

/// Shared log of statements seen by a [`ScriptedConnection`].
#[derive(Debug, Clone, Default)]
pub(crate) struct SqlLog(Arc<Mutex<Vec<String>>>);

impl SqlLog {
    pub(crate) fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, sql: &str) {
        self.0.lock().unwrap().push(sql.to_string());
    }
}

/// Records every statement and fails those containing a configured fragment.
pub(crate) struct ScriptedConnection {
    dialect: Dialect,
    log: SqlLog,
    failures: Vec<(String, QueryErrorKind, String)>,
}

impl ScriptedConnection {
    pub(crate) fn new(dialect: Dialect) -> (Self, SqlLog) {
        let log = SqlLog::default();
        let conn = Self {
            dialect,
            log: log.clone(),
            failures: Vec::new(),
        };
        (conn, log)
    }

    pub(crate) fn fail_on(mut self, fragment: &str, kind: QueryErrorKind, message: &str) -> Self {
        self.failures
            .push((fragment.to_string(), kind, message.to_string()));
        self
    }

    fn run(&self, sql: &str) -> Result<()> {
        self.log.push(sql);
        match self.failures.iter().find(|(frag, _, _)| sql.contains(frag.as_str())) {
            Some((_, kind, message)) => Err(QueryError::new(*kind, message.clone())
                .with_sql(sql)
                .into()),
            None => Ok(()),
        }
    }
}

impl Connection for ScriptedConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.run(sql).map(|()| 1)
    }

    fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql).map(|()| Vec::new())
    }

    fn insert(&self, sql: &str, _params: &[Value]) -> Result<i64> {
        self.run(sql).map(|()| 1)
    }

    fn execute_raw(&self, sql: &str) -> Result<()> {
        self.run(sql)
    }
}
