//! The database connection contract implemented by drivers.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A synchronous database connection.
///
/// Methods take `&self`; drivers own whatever interior state they need.
/// Transaction control is issued as plain SQL through [`Connection::execute_raw`]
/// using the statements from [`Dialect`], so drivers do not implement it
/// separately.
pub trait Connection: Send {
    /// Dialect of the backing database.
    fn dialect(&self) -> Dialect;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute an INSERT and return the generated id.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Execute SQL text without parameters.
    fn execute_raw(&self, sql: &str) -> Result<()>;

    /// Run a query expected to return at most one row.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }
}
