//! Procedural macros for sqlbase.
//!
//! `#[derive(Record)]` turns a plain struct into a persisted record type:
//!
//! ```ignore
//! use sqlbase::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Record)]
//! #[record(table = "cars")]
//! #[record(unique(name = "uidx_car_makemodel", columns("make", "model")))]
//! #[record(belongs_to(name = "owner", target = Person, column = "owner_id"))]
//! struct Car {
//!     #[record(meta)]
//!     meta: RecordMeta,
//!     make: String,
//!     model: String,
//!     year: Option<i64>,
//!     owner_id: Option<i64>,
//! }
//! ```
//!
//! Struct attributes:
//! - `table = "..."`: table name (defaults to the snake-cased struct name)
//! - `unique(name = "...", columns("a", "b"))`: composite unique constraint
//! - `belongs_to(name, target, column[, on_delete])`: this table holds the key
//! - `has_many(name, target, column)`: the target table holds the key
//!
//! Field attributes:
//! - `meta`: the `RecordMeta` field (exactly one is required)
//! - `unique`: single-column unique constraint
//! - `skip`: not persisted
//!
//! Generated code refers to `::sqlbase`, so the facade crate must be a
//! dependency.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record_derive;

/// Derive the `Record` trait.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_derive::parse_record(&input) {
        Ok(def) => record_derive::generate_record_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
