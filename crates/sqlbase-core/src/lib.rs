//! Core types and traits for sqlbase.
//!
//! `sqlbase-core` is the **foundation layer** for the workspace. It defines the
//! traits and data types every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Record` and `Connection` are the primary traits,
//!   implemented by user record types (via `#[derive(Record)]`) and by drivers.
//! - **Data model**: `Row`, `Value`, `SqlType` and `FieldInfo` describe query
//!   inputs, outputs and table shape.
//! - **Error taxonomy**: a single `Error` enum, including the dialect-aware
//!   uniqueness-violation classifier used by the transaction wrappers.
//!
//! # Who Uses This Crate
//!
//! - `sqlbase-macros` generates `Record` implementations defined here.
//! - `sqlbase-query` consumes `Record` metadata and `Value` to build SQL.
//! - `sqlbase-session` runs statements on a `Connection` inside transactions.
//! - `sqlbase-schema` reads `FieldInfo` to generate DDL.
//! - `sqlbase-sqlite` implements `Connection`.
//!
//! Most applications should use the `sqlbase` facade.

pub mod connection;
pub mod dialect;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod record;
pub mod relationship;
pub mod row;
pub mod types;
pub mod unique;
pub mod value;

pub use connection::Connection;
pub use dialect::Dialect;
pub use error::{Error, PathKind, QueryError, QueryErrorKind, Result};
pub use field::{FieldInfo, ReferentialAction, UniqueConstraint};
pub use identifiers::{quote_ident, quote_ident_mssql, validate_savepoint_name};
pub use record::{Dict, Record, RecordMeta};
pub use relationship::{RelatedVisitor, RelationshipInfo, RelationshipKind};
pub use row::Row;
pub use types::{SqlType, SqlTyped};
pub use unique::{UniqueViolation, is_unique_violation};
pub use value::{FromValue, TIMESTAMP_FORMAT, Value, parse_timestamp};
