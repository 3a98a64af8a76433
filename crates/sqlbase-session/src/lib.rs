//! Sessions and transaction control for sqlbase.
//!
//! - [`DbConfig`]: database URL and session switches.
//! - [`Session`]: explicit unit-of-work context over one connection.
//! - [`SessionFactory`]: opens sessions and scopes them to a unit of work.
//! - [`transaction`], [`ignore_unique`]: higher-order transaction wrappers.
//! - [`one_or_none`]: turns "no row" into `None` while keeping "many rows" an
//!   error.
//!
//! # Example
//!
//! ```ignore
//! let factory = SessionFactory::new(DbConfig::from_env()?, sqlbase_sqlite::connect)?;
//! factory.scope(|session| {
//!     transaction(session, |s| {
//!         s.execute("UPDATE cars SET year = ?1 WHERE id = ?2", &[1999.into(), 3.into()])
//!     })
//! })?;
//! ```

pub mod config;
pub mod factory;
pub mod session;
pub mod transaction;

#[cfg(test)]
mod testing;

pub use config::{DATABASE_URL_ENV, DbConfig};
pub use factory::{Connector, SessionFactory};
pub use session::Session;
pub use transaction::{ignore_unique, one_or_none, transaction};
