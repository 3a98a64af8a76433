//! Schema management for sqlbase.
//!
//! - [`MetaData`]: registry of record tables with `create_all`, `drop_all`,
//!   `clear_db`, `clear_db_data` and `pre_test_init`.
//! - [`SqlScripts`]: runs `--statement-break` separated SQL files, optionally
//!   filtered by dialect, as one transaction.
//! - [`MssqlDdlWriter`]: dumps a SQL Server schema to per-object scripts.
//!
//! # Example
//!
//! ```ignore
//! let meta = MetaData::new().with::<Person>().with::<Car>();
//! meta.pre_test_init(&mut session, &config)?;
//! SqlScripts::new("sql").run(&mut session, "fixtures", true)?;
//! ```

pub mod ddl;
pub mod metadata;
pub mod scripts;

pub use ddl::MssqlDdlWriter;
pub use metadata::{MetaData, TableDef, create_table_sql, unique_index_name};
pub use scripts::{STATEMENT_BREAK, ScriptFile, SqlScripts, allows_dialect, split_statements};
