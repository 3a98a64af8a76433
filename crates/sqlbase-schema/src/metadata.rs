//! Table registry and DDL generation.
//!
//! [`MetaData`] collects the tables of an application and creates, drops or
//! empties them together. Tables are processed in foreign-key dependency
//! order: referenced tables are created first and dropped last.

use sqlbase_core::{
    Connection, Dialect, FieldInfo, Record, Result, UniqueConstraint, quote_ident,
    quote_ident_mssql,
};
use sqlbase_session::{DbConfig, Session, transaction};

/// Static description of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    /// Table name.
    pub name: &'static str,
    /// Columns, in table order.
    pub fields: &'static [FieldInfo],
    /// Multi-column unique constraints.
    pub unique_constraints: &'static [UniqueConstraint],
}

impl TableDef {
    /// Table description of a record type.
    pub fn of<M: Record>() -> Self {
        Self {
            name: M::TABLE_NAME,
            fields: M::fields(),
            unique_constraints: M::unique_constraints(),
        }
    }

    /// Tables this one references through foreign keys, excluding itself.
    pub fn references(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter_map(|f| f.references)
            .filter(move |t| *t != self.name)
    }
}

/// A set of tables managed together.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    tables: Vec<TableDef>,
}

impl MetaData {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table of a record type. Registering twice is a no-op.
    pub fn register<M: Record>(&mut self) -> &mut Self {
        self.register_table(TableDef::of::<M>())
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<M: Record>(mut self) -> Self {
        self.register::<M>();
        self
    }

    /// Register a table description.
    pub fn register_table(&mut self, table: TableDef) -> &mut Self {
        if self.table(table.name).is_none() {
            tracing::debug!(table = table.name, "Registering table");
            self.tables.push(table);
        }
        self
    }

    /// Registered tables, in registration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Look up a registered table.
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables ordered so that every table follows the tables it references.
    ///
    /// References to unregistered tables are ignored. Tables caught in a
    /// reference cycle keep their registration order.
    pub fn sorted_tables(&self) -> Vec<&TableDef> {
        let mut placed: Vec<&TableDef> = Vec::with_capacity(self.tables.len());
        let mut pending: Vec<&TableDef> = self.tables.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|table| {
                let ready = table.references().all(|dep| {
                    self.table(dep).is_none() || placed.iter().any(|p| p.name == dep)
                });
                if ready {
                    placed.push(*table);
                }
                !ready
            });
            if pending.len() == before {
                tracing::warn!(
                    tables = ?pending.iter().map(|t| t.name).collect::<Vec<_>>(),
                    "Foreign key cycle; keeping registration order"
                );
                placed.append(&mut pending);
            }
        }
        placed
    }

    /// Statements creating every table and its unique indexes.
    pub fn create_statements(&self, dialect: Dialect) -> Vec<String> {
        self.sorted_tables()
            .into_iter()
            .flat_map(|t| create_table_sql(t, dialect))
            .collect()
    }

    /// Statements dropping every table, dependents first.
    pub fn drop_statements(&self, dialect: Dialect) -> Vec<String> {
        self.sorted_tables()
            .into_iter()
            .rev()
            .map(|t| format!("DROP TABLE IF EXISTS {}", quote_ident(dialect, t.name)))
            .collect()
    }

    /// Create every registered table that does not exist yet.
    #[tracing::instrument(level = "debug", skip(self, session))]
    pub fn create_all(&self, session: &mut Session) -> Result<()> {
        let statements = self.create_statements(session.dialect());
        transaction(session, |s| run_all(s, &statements))?;
        tracing::info!(tables = self.tables.len(), "Created tables");
        Ok(())
    }

    /// Drop every registered table.
    #[tracing::instrument(level = "debug", skip(self, session))]
    pub fn drop_all(&self, session: &mut Session) -> Result<()> {
        let statements = self.drop_statements(session.dialect());
        transaction(session, |s| run_all(s, &statements))?;
        tracing::info!(tables = self.tables.len(), "Dropped tables");
        Ok(())
    }

    /// Remove every object from the database, registered here or not.
    ///
    /// - SQLite: every view, then every table.
    /// - PostgreSQL: the `public` schema is dropped and created again with
    ///   its default grants. A failing step is logged and skipped.
    /// - SQL Server: procedures, functions, views, foreign key and check
    ///   constraints, then tables, as listed in `sys.objects`.
    #[tracing::instrument(level = "debug", skip(self, session))]
    pub fn clear_db(&self, session: &mut Session) -> Result<()> {
        let dialect = session.dialect();
        let dropped = transaction(session, |s| match dialect {
            Dialect::Sqlite => clear_sqlite(s),
            Dialect::Postgresql => Ok(clear_postgresql(s)),
            Dialect::Mssql => clear_mssql(s),
        })?;
        tracing::info!(%dialect, objects = dropped, "Cleared database");
        Ok(())
    }

    /// Delete every row of every registered table, keeping the tables.
    ///
    /// Returns the number of rows deleted. Tables that do not exist yet are
    /// skipped.
    #[tracing::instrument(level = "debug", skip(self, session))]
    pub fn clear_db_data(&self, session: &mut Session) -> Result<u64> {
        let dialect = session.dialect();
        let tables: Vec<&'static str> = self
            .sorted_tables()
            .into_iter()
            .rev()
            .map(|t| t.name)
            .collect();
        let deleted = transaction(session, |s| {
            let mut total = 0;
            for name in &tables {
                if table_exists(s, name)? {
                    total += s.execute(&format!("DELETE FROM {}", quote_ident(dialect, name)), &[])?;
                }
            }
            Ok(total)
        })?;
        tracing::info!(rows = deleted, "Cleared table data");
        Ok(deleted)
    }

    /// Prepare a database for a test run according to `config`.
    ///
    /// Does nothing and returns `false` when `pre_test_init` is off. Otherwise
    /// clears the database (rows only when `clear_data_only` is set, whole
    /// tables otherwise), creates the tables and returns `true`.
    pub fn pre_test_init(&self, session: &mut Session, config: &DbConfig) -> Result<bool> {
        if !config.pre_test_init {
            return Ok(false);
        }
        if config.clear_data_only {
            self.clear_db_data(session)?;
        } else {
            self.clear_db(session)?;
        }
        self.create_all(session)?;
        Ok(true)
    }
}

fn run_all(session: &mut Session, statements: &[String]) -> Result<()> {
    for sql in statements {
        session.execute_raw(sql)?;
    }
    Ok(())
}

const PG_RESET_SCHEMA: [&str; 5] = [
    "DROP SCHEMA public CASCADE",
    "CREATE SCHEMA public AUTHORIZATION CURRENT_USER",
    "GRANT ALL ON SCHEMA public TO CURRENT_USER",
    "GRANT ALL ON SCHEMA public TO public",
    "COMMENT ON SCHEMA public IS 'standard public schema'",
];

/// `sys.objects` types in drop order, with the statement dropping each.
const MSSQL_DROP_ORDER: [(&[&str], MssqlDrop); 6] = [
    (&["P"], MssqlDrop::Procedure),
    (&["FN", "IF", "TF"], MssqlDrop::Function),
    (&["V"], MssqlDrop::View),
    (&["F"], MssqlDrop::Constraint),
    (&["C"], MssqlDrop::Constraint),
    (&["U"], MssqlDrop::Table),
];

#[derive(Debug, Clone, Copy)]
enum MssqlDrop {
    Procedure,
    Function,
    View,
    Constraint,
    Table,
}

impl MssqlDrop {
    fn sql(self, name: &str, parent: Option<&str>) -> String {
        let name = quote_ident_mssql(name);
        match self {
            MssqlDrop::Procedure => format!("DROP PROCEDURE {name}"),
            MssqlDrop::Function => format!("DROP FUNCTION {name}"),
            MssqlDrop::View => format!("DROP VIEW {name}"),
            MssqlDrop::Table => format!("DROP TABLE {name}"),
            MssqlDrop::Constraint => format!(
                "ALTER TABLE {} DROP CONSTRAINT {name}",
                quote_ident_mssql(parent.unwrap_or_default())
            ),
        }
    }
}

fn sqlite_objects(session: &Session, kind: &str) -> Result<Vec<String>> {
    session
        .query(
            "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[kind.into()],
        )?
        .iter()
        .map(|row| row.get_as("name"))
        .collect()
}

fn clear_sqlite(session: &mut Session) -> Result<usize> {
    let views = sqlite_objects(session, "view")?;
    for view in &views {
        session.execute_raw(&format!("DROP VIEW IF EXISTS {}", quote_ident(Dialect::Sqlite, view)))?;
    }

    // Foreign keys may refuse a drop until the referencing table is gone, so
    // retry the failures for as long as a round makes progress.
    let mut pending = sqlite_objects(session, "table")?;
    let mut dropped = views.len();
    while !pending.is_empty() {
        let before = pending.len();
        let mut last_err = None;
        let mut remaining = Vec::new();
        for table in pending {
            let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(Dialect::Sqlite, &table));
            match transaction(session, |s| s.execute_raw(&sql)) {
                Ok(()) => dropped += 1,
                Err(err) => {
                    tracing::debug!(table = %table, error = %err, "drop deferred");
                    last_err = Some(err);
                    remaining.push(table);
                }
            }
        }
        if remaining.len() == before {
            if let Some(err) = last_err {
                return Err(err);
            }
        }
        pending = remaining;
    }
    Ok(dropped)
}

fn clear_postgresql(session: &mut Session) -> usize {
    let mut done = 0;
    for sql in PG_RESET_SCHEMA {
        match transaction(session, |s| s.execute_raw(sql)) {
            Ok(()) => done += 1,
            Err(err) => tracing::warn!(sql, error = %err, "schema reset step failed"),
        }
    }
    done
}

fn clear_mssql(session: &mut Session) -> Result<usize> {
    let mut statements = Vec::new();
    for (types, kind) in MSSQL_DROP_ORDER {
        let list = types.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT o.name AS name, OBJECT_NAME(o.parent_object_id) AS parent_name \
             FROM sys.objects o WHERE o.type IN ({list}) AND o.is_ms_shipped = 0 ORDER BY o.name"
        );
        for row in session.query(&sql, &[])? {
            let name: String = row.get_as("name")?;
            let parent: Option<String> = row.get_as("parent_name")?;
            statements.push(kind.sql(&name, parent.as_deref()));
        }
    }
    run_all(session, &statements)?;
    Ok(statements.len())
}

fn table_exists(session: &Session, name: &str) -> Result<bool> {
    let (sql, param) = match session.dialect() {
        Dialect::Sqlite => (
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            name,
        ),
        Dialect::Postgresql => (
            "SELECT table_name FROM information_schema.tables WHERE table_name = $1",
            name,
        ),
        Dialect::Mssql => (
            "SELECT name FROM sys.tables WHERE name = @P1",
            name,
        ),
    };
    Ok(!session.query(sql, &[param.into()])?.is_empty())
}

fn column_sql(field: &FieldInfo, dialect: Dialect) -> String {
    let name = quote_ident(dialect, field.name);
    if field.primary_key && field.auto_increment {
        return match dialect {
            Dialect::Sqlite => format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT"),
            Dialect::Postgresql => format!("{name} BIGSERIAL PRIMARY KEY"),
            Dialect::Mssql => format!("{name} BIGINT IDENTITY(1,1) PRIMARY KEY"),
        };
    }

    let mut sql = format!("{name} {}", field.sql_type.sql_name(dialect));
    if field.primary_key {
        sql.push_str(" PRIMARY KEY");
    }
    if !field.nullable {
        sql.push_str(" NOT NULL");
    }
    if field.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = field.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn foreign_key_sql(field: &FieldInfo, dialect: Dialect) -> Option<String> {
    let target = field.references?;
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_ident(dialect, field.name),
        quote_ident(dialect, target),
        quote_ident(dialect, "id"),
    );
    if let Some(action) = field.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    Some(sql)
}

/// Name of the index backing a multi-column unique constraint.
pub fn unique_index_name(table: &str, constraint: &UniqueConstraint) -> String {
    if constraint.name.is_empty() {
        format!("uk_{}_{}", table, constraint.columns.join("_"))
    } else {
        constraint.name.to_string()
    }
}

/// `CREATE TABLE` plus one `CREATE UNIQUE INDEX` per multi-column unique
/// constraint.
pub fn create_table_sql(table: &TableDef, dialect: Dialect) -> Vec<String> {
    let mut parts: Vec<String> = table.fields.iter().map(|f| column_sql(f, dialect)).collect();
    parts.extend(table.fields.iter().filter_map(|f| foreign_key_sql(f, dialect)));

    let if_not_exists = match dialect {
        Dialect::Sqlite | Dialect::Postgresql => "IF NOT EXISTS ",
        Dialect::Mssql => "",
    };
    let mut statements = vec![format!(
        "CREATE TABLE {if_not_exists}{} (\n  {}\n)",
        quote_ident(dialect, table.name),
        parts.join(",\n  ")
    )];

    for uc in table.unique_constraints {
        let cols: Vec<String> = uc.columns.iter().map(|c| quote_ident(dialect, c)).collect();
        statements.push(format!(
            "CREATE UNIQUE INDEX {if_not_exists}{} ON {} ({})",
            quote_ident(dialect, &unique_index_name(table.name, uc)),
            quote_ident(dialect, table.name),
            cols.join(", ")
        ));
    }
    statements
}
