//! SQL statement builders for sqlbase.
//!
//! Builders take record metadata from [`sqlbase_core::Record`] and produce
//! `(sql, params)` pairs with placeholders numbered for the target
//! [`Dialect`](sqlbase_core::Dialect). Each builder can also execute itself
//! against a [`Connection`](sqlbase_core::Connection).
//!
//! - [`Select`] and [`Count`] read; `Select::one` distinguishes zero rows from
//!   many rows by error variant.
//! - [`Insert`], [`Update`] and [`Delete`] write.
//! - [`Expr`] and [`OrderBy`] describe WHERE and ORDER BY clauses.
//! - [`to_literal_sql`] inlines parameters for test assertions.

pub mod debug;
pub mod dml;
pub mod expr;
pub mod order;
pub mod select;

#[cfg(test)]
mod test_support;

pub use debug::{DEBUG_SQL_PREFIX, literal, to_literal_sql};
pub use dml::{Delete, Insert, Update};
pub use expr::{BinaryOp, Expr};
pub use order::{Direction, OrderBy};
pub use select::{Count, Select};
