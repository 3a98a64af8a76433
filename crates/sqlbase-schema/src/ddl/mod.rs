//! Dialect-specific DDL tooling.

pub mod mssql;

pub use mssql::{CatalogObject, DUMP_FOLDERS, MssqlDdlWriter, ObjectKind};
