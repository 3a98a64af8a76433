//! INSERT, UPDATE and DELETE builders.

use std::marker::PhantomData;

use sqlbase_core::{Connection, Dialect, Error, Record, Result, Value, quote_ident};

use crate::expr::Expr;

/// INSERT builder for one record.
///
/// Bookkeeping columns whose value is still NULL (`id`, `createdts`,
/// `updatedts`) are left out so storage defaults apply.
#[derive(Debug)]
pub struct Insert<'a, M: Record> {
    record: &'a M,
}

impl<'a, M: Record> Insert<'a, M> {
    /// Create an INSERT builder for `record`.
    pub fn new(record: &'a M) -> Self {
        Self { record }
    }

    /// Build the INSERT SQL and parameters.
    ///
    /// PostgreSQL gets `RETURNING "id"` and SQL Server `OUTPUT INSERTED.[id]`
    /// so drivers can read the generated key from the statement itself.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for field in M::fields() {
            let value = self.record.get_value(field.name).unwrap_or(Value::Null);
            if field.is_meta() && value.is_null() {
                continue;
            }
            columns.push(quote_ident(dialect, field.name));
            params.push(value);
        }
        let table = quote_ident(dialect, M::TABLE_NAME);
        let placeholders: Vec<String> = (1..=params.len()).map(|i| dialect.placeholder(i)).collect();

        let sql = match dialect {
            Dialect::Mssql if columns.is_empty() => {
                format!("INSERT INTO {table} OUTPUT INSERTED.[id] DEFAULT VALUES")
            }
            Dialect::Mssql => format!(
                "INSERT INTO {table} ({}) OUTPUT INSERTED.[id] VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
            _ if columns.is_empty() => format!("INSERT INTO {table} DEFAULT VALUES"),
            _ => format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
        };
        let sql = if dialect == Dialect::Postgresql {
            format!("{sql} RETURNING \"id\"")
        } else {
            sql
        };
        (sql, params)
    }

    /// Execute the INSERT and return the generated id.
    pub fn execute(&self, conn: &dyn Connection) -> Result<i64> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "insert");
        conn.insert(&sql, &params)
    }
}

/// UPDATE builder.
///
/// # Example
///
/// ```ignore
/// // Persist every column of a loaded record
/// Update::for_record(&car)?.execute(&session)?;
///
/// // Explicit SET
/// Update::<Car>::new()
///     .set("owner_id", Value::Null)
///     .filter(Expr::col("owner_id").eq(7))
///     .execute(&session)?;
/// ```
#[derive(Debug, Clone)]
pub struct Update<M: Record> {
    sets: Vec<(String, Value)>,
    filter: Option<Expr>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Record> Default for Update<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Record> Update<M> {
    /// An UPDATE with no SET columns and no filter.
    pub fn new() -> Self {
        Self {
            sets: Vec::new(),
            filter: None,
            _marker: PhantomData,
        }
    }

    /// Write every column of `record` except `id` and `createdts`, matching
    /// on its id.
    pub fn for_record(record: &M) -> Result<Self> {
        let id = record.id().ok_or_else(|| {
            Error::usage(format!(
                "cannot update a \"{}\" record that has no id",
                M::TABLE_NAME
            ))
        })?;
        let mut update = Self::new();
        for field in M::fields() {
            if matches!(field.name, "id" | "createdts") {
                continue;
            }
            let value = record.get_value(field.name).unwrap_or(Value::Null);
            update = update.set(field.name, value);
        }
        Ok(update.filter(Expr::col("id").eq(id)))
    }

    /// Set a column.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.sets.push((column.to_string(), value.into()));
        self
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

    /// Build the UPDATE SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|(col, value)| {
                params.push(value.clone());
                format!(
                    "{} = {}",
                    quote_ident(dialect, col),
                    dialect.placeholder(params.len())
                )
            })
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(dialect, M::TABLE_NAME),
            sets.join(", ")
        );
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.build(dialect, &mut params));
        }
        (sql, params)
    }

    /// Execute the UPDATE and return the number of affected rows.
    pub fn execute(&self, conn: &dyn Connection) -> Result<u64> {
        if self.sets.is_empty() {
            return Ok(0);
        }
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "update");
        conn.execute(&sql, &params)
    }
}

/// DELETE builder. Without a filter every row is deleted.
#[derive(Debug, Clone)]
pub struct Delete<M: Record> {
    filter: Option<Expr>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Record> Default for Delete<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Record> Delete<M> {
    /// Delete every row of the table.
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

    /// Build the DELETE SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote_ident(dialect, M::TABLE_NAME));
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.build(dialect, &mut params));
        }
        (sql, params)
    }

    /// Execute the DELETE and return the number of affected rows.
    pub fn execute(&self, conn: &dyn Connection) -> Result<u64> {
        let (sql, params) = self.build_with_dialect(conn.dialect());
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "delete");
        conn.execute(&sql, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Gadget;

    #[test]
    fn test_insert_skips_unset_meta_columns() {
        let gadget = Gadget::new("widget", Some(3));
        let (sql, params) = Insert::new(&gadget).build_with_dialect(Dialect::Sqlite);
        assert_eq!(
            sql,
            "INSERT INTO \"gadgets\" (\"label\", \"size\") VALUES (?1, ?2)"
        );
        assert_eq!(params, vec![Value::from("widget"), Value::BigInt(3)]);
    }

    #[test]
    fn test_insert_returning_id_per_dialect() {
        let gadget = Gadget::new("widget", None);
        let (pg, _) = Insert::new(&gadget).build_with_dialect(Dialect::Postgresql);
        assert!(pg.ends_with("VALUES ($1, $2) RETURNING \"id\""));
        let (ms, _) = Insert::new(&gadget).build_with_dialect(Dialect::Mssql);
        assert_eq!(
            ms,
            "INSERT INTO [gadgets] ([label], [size]) OUTPUT INSERTED.[id] VALUES (@P1, @P2)"
        );
    }

    #[test]
    fn test_update_for_record_requires_id() {
        let mut gadget = Gadget::new("widget", None);
        assert!(matches!(
            Update::for_record(&gadget).unwrap_err(),
            Error::Usage(_)
        ));

        gadget.meta.id = Some(9);
        let (sql, params) = Update::for_record(&gadget)
            .unwrap()
            .build_with_dialect(Dialect::Sqlite);
        assert_eq!(
            sql,
            "UPDATE \"gadgets\" SET \"updatedts\" = ?1, \"label\" = ?2, \"size\" = ?3 WHERE \"id\" = ?4"
        );
        assert_eq!(params[3], Value::BigInt(9));
    }

    #[test]
    fn test_delete_with_and_without_filter() {
        let (all, _) = Delete::<Gadget>::new().build_with_dialect(Dialect::Sqlite);
        assert_eq!(all, "DELETE FROM \"gadgets\"");
        let (one, params) = Delete::<Gadget>::new()
            .filter(Expr::col("id").eq(4))
            .build_with_dialect(Dialect::Mssql);
        assert_eq!(one, "DELETE FROM [gadgets] WHERE [id] = @P1");
        assert_eq!(params, vec![Value::BigInt(4)]);
    }
}
