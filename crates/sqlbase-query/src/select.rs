//! SELECT and COUNT builders.

use std::marker::PhantomData;

use sqlbase_core::{Connection, Dialect, Error, Record, Result, Row, Value, quote_ident};

use crate::expr::Expr;
use crate::order::OrderBy;

/// SELECT builder over one record type.
///
/// Without an explicit ordering, results are sorted by ascending `id`, so
/// repeated queries over unchanged data return rows in the same order.
///
/// # Example
///
/// ```ignore
/// let cars = Select::<Car>::new()
///     .filter(Expr::col("make").eq("chevy"))
///     .order_by(OrderBy::desc("year"))
///     .all(&session)?;
/// ```
#[derive(Debug, Clone)]
pub struct Select<M: Record> {
    filter: Option<Expr>,
    order: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Record> Default for Select<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Record> Select<M> {
    /// Select every row of the table.
    pub fn new() -> Self {
        Self {
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }

    /// Add a WHERE condition, ANDed with any existing one.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Replace the ORDER BY terms.
    #[must_use]
    pub fn order_by_all(mut self, order: &[OrderBy]) -> Self {
        self.order = order.to_vec();
        self
    }

    /// Limit the number of rows.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip rows.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Build the SELECT SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let columns: Vec<String> = M::fields()
            .iter()
            .map(|f| quote_ident(dialect, f.name))
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(dialect, M::TABLE_NAME)
        );

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.build(dialect, &mut params));
        }

        let order: Vec<String> = if self.order.is_empty() {
            vec![OrderBy::asc("id").build(dialect)]
        } else {
            self.order.iter().map(|o| o.build(dialect)).collect()
        };
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        match dialect {
            Dialect::Mssql => {
                if self.limit.is_some() || self.offset.is_some() {
                    sql.push_str(&format!(" OFFSET {} ROWS", self.offset.unwrap_or(0)));
                    if let Some(limit) = self.limit {
                        sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                    }
                }
            }
            Dialect::Sqlite | Dialect::Postgresql => {
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" LIMIT {limit}"));
                } else if self.offset.is_some() && dialect == Dialect::Sqlite {
                    sql.push_str(" LIMIT -1");
                }
                if let Some(offset) = self.offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
            }
        }

        (sql, params)
    }

    /// Fetch the raw rows.
    pub fn rows(&self, conn: &dyn Connection) -> Result<Vec<Row>> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, params = params.len(), "select");
        conn.query(&sql, &params)
    }

    /// Fetch all matching records.
    pub fn all(&self, conn: &dyn Connection) -> Result<Vec<M>> {
        self.rows(conn)?.iter().map(M::from_row).collect()
    }

    /// Fetch the first matching record, if any.
    pub fn first(&self, conn: &dyn Connection) -> Result<Option<M>> {
        let rows = self.clone().limit(1).rows(conn)?;
        rows.first().map(M::from_row).transpose()
    }

    /// Fetch exactly one record.
    ///
    /// Fails with [`Error::NoResultFound`] when nothing matches and with
    /// [`Error::MultipleResultsFound`] when more than one row matches.
    pub fn one(&self, conn: &dyn Connection) -> Result<M> {
        let rows = self.rows(conn)?;
        match rows.len() {
            0 => Err(Error::NoResultFound),
            1 => M::from_row(&rows[0]),
            count => Err(Error::MultipleResultsFound { count }),
        }
    }
}

/// `SELECT COUNT(*)` builder.
#[derive(Debug, Clone)]
pub struct Count<M: Record> {
    filter: Option<Expr>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Record> Default for Count<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Record> Count<M> {
    /// Count every row of the table.
    pub fn new() -> Self {
        Self {
            filter: None,
            _marker: PhantomData,
        }
    }

    /// Add a WHERE condition, ANDed with any existing one.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Build the COUNT SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT COUNT(*) AS {} FROM {}",
            quote_ident(dialect, "count"),
            quote_ident(dialect, M::TABLE_NAME)
        );
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.build(dialect, &mut params));
        }
        (sql, params)
    }

    /// Run the count.
    pub fn execute(&self, conn: &dyn Connection) -> Result<u64> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "count");
        let row = conn
            .query_one(&sql, &params)?
            .ok_or_else(|| Error::database("COUNT(*) returned no rows"))?;
        let n: i64 = row.get_as("count")?;
        u64::try_from(n).map_err(|_| Error::conversion("count", format!("negative count {n}")))
    }
}
