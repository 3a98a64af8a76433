//! Declarative records, transaction helpers and SQL script tooling.
//!
//! `sqlbase` is the facade crate: it re-exports the workspace crates and adds
//! the [`Declarative`] layer of generic create/read/update/delete operations
//! that every `#[derive(Record)]` type gets.
//!
//! # Quick Start
//!
//! ```ignore
//! use serde_json::json;
//! use sqlbase::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Record)]
//! #[record(table = "persons")]
//! #[record(has_many(name = "cars", target = Car, column = "owner_id"))]
//! struct Person {
//!     #[record(meta)]
//!     meta: RecordMeta,
//!     #[record(unique)]
//!     name: String,
//! }
//!
//! #[derive(Debug, Clone, Default, Record)]
//! #[record(table = "cars")]
//! #[record(belongs_to(name = "owner", target = Person, column = "owner_id"))]
//! struct Car {
//!     #[record(meta)]
//!     meta: RecordMeta,
//!     make: String,
//!     owner_id: Option<i64>,
//! }
//!
//! let factory = SessionFactory::new(DbConfig::from_env()?, sqlbase::sqlite::connect)?;
//! let mut session = factory.open()?;
//! MetaData::new().with::<Person>().with::<Car>().create_all(&mut session)?;
//!
//! let ann = Person::add(&mut session, json!({"name": "ann", "cars": [{"make": "ford"}]}))?;
//! let cars = Car::list_by(&session, &[("owner_id", ann.id().into())], &[])?;
//! ```
//!
//! # Crates
//!
//! - `sqlbase-core`: `Record`, `Connection`, `Value`, `Row`, `Error`
//! - `sqlbase-macros`: `#[derive(Record)]`
//! - `sqlbase-query`: `Select`, `Count`, `Insert`, `Update`, `Delete`, `Expr`
//! - `sqlbase-session`: `Session`, `DbConfig`, transaction wrappers
//! - `sqlbase-schema`: DDL generation, SQL scripts, SQL Server DDL dumps
//! - `sqlbase-sqlite` (feature `sqlite`): the SQLite driver

extern crate self as sqlbase;

pub mod declarative;

pub use declarative::Declarative;

pub use sqlbase_core::{
    Connection, Dialect, Dict, Error, FieldInfo, FromValue, PathKind, QueryError,
    QueryErrorKind, Record, RecordMeta, ReferentialAction, RelatedVisitor, RelationshipInfo,
    RelationshipKind, Result, Row, SqlType, SqlTyped, TIMESTAMP_FORMAT, UniqueConstraint,
    UniqueViolation, Value, is_unique_violation, parse_timestamp,
};
pub use sqlbase_macros::Record;
pub use sqlbase_query::{
    Count, DEBUG_SQL_PREFIX, Delete, Direction, Expr, Insert, OrderBy, Select, Update,
    to_literal_sql,
};
pub use sqlbase_schema::{
    MetaData, MssqlDdlWriter, STATEMENT_BREAK, SqlScripts, TableDef, create_table_sql,
};
pub use sqlbase_session::{
    DATABASE_URL_ENV, DbConfig, Session, SessionFactory, ignore_unique, one_or_none,
    transaction,
};

/// The SQLite driver.
#[cfg(feature = "sqlite")]
pub use sqlbase_sqlite as sqlite;

/// Render a SELECT with its parameters inlined, for test assertions.
///
/// The result starts with [`DEBUG_SQL_PREFIX`] and must never be executed.
pub fn query_to_str<M: Record>(select: &Select<M>, dialect: Dialect) -> String {
    let (sql, params) = select.build_with_dialect(dialect);
    to_literal_sql(dialect, &sql, &params)
}

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        Connection, DbConfig, Declarative, Dialect, Error, Expr, MetaData, OrderBy, Record,
        RecordMeta, Result, Session, SessionFactory, Value, ignore_unique, one_or_none,
        transaction,
    };
}
