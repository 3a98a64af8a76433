//! Literal-bound SQL rendering for tests and diagnostics.
//!
//! The output inlines parameter values as SQL literals. It is meant for
//! assertions and log inspection only; executing it opens the door to SQL
//! injection, which is why the rendered text carries a marker prefix.

use sqlbase_core::{Dialect, TIMESTAMP_FORMAT, Value};

/// Prefix marking literal-bound SQL.
pub const DEBUG_SQL_PREFIX: &str = "TESTING ONLY BIND: ";

/// Render one value as a SQL literal for `dialect`.
pub fn literal(dialect: Dialect, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => match dialect {
            Dialect::Postgresql => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Dialect::Sqlite | Dialect::Mssql => if *b { "1" } else { "0" }.to_string(),
        },
        Value::BigInt(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            match dialect {
                Dialect::Sqlite => format!("X'{hex}'"),
                Dialect::Postgresql => format!("'\\x{hex}'"),
                Dialect::Mssql => format!("0x{hex}"),
            }
        }
        Value::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
    }
}

/// Substitute bound parameters into `sql` as literals.
pub fn to_literal_sql(dialect: Dialect, sql: &str, params: &[Value]) -> String {
    let mut out = sql.to_string();
    // Highest index first so `?1` does not clobber the prefix of `?10`.
    for (i, value) in params.iter().enumerate().rev() {
        out = out.replace(&dialect.placeholder(i + 1), &literal(dialect, value));
    }
    format!("{DEBUG_SQL_PREFIX}{out}")
}
