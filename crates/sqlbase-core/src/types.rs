//! Column types.

use chrono::NaiveDateTime;

use crate::dialect::Dialect;

/// Logical SQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// 64-bit integer.
    Integer,
    /// Double-precision float.
    Double,
    /// Boolean.
    Boolean,
    /// Unicode text.
    Text,
    /// Binary data.
    Blob,
    /// Date and time without zone.
    Timestamp,
}

impl SqlType {
    /// Column type name used in DDL for `dialect`.
    #[must_use]
    pub const fn sql_name(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (SqlType::Integer, Dialect::Sqlite) => "INTEGER",
            (SqlType::Integer, _) => "BIGINT",
            (SqlType::Double, Dialect::Sqlite) => "REAL",
            (SqlType::Double, Dialect::Postgresql) => "DOUBLE PRECISION",
            (SqlType::Double, Dialect::Mssql) => "FLOAT",
            (SqlType::Boolean, Dialect::Mssql) => "BIT",
            (SqlType::Boolean, _) => "BOOLEAN",
            (SqlType::Text, Dialect::Mssql) => "NVARCHAR(255)",
            (SqlType::Text, _) => "TEXT",
            (SqlType::Blob, Dialect::Sqlite) => "BLOB",
            (SqlType::Blob, Dialect::Postgresql) => "BYTEA",
            (SqlType::Blob, Dialect::Mssql) => "VARBINARY(MAX)",
            (SqlType::Timestamp, Dialect::Mssql) => "DATETIME",
            (SqlType::Timestamp, _) => "TIMESTAMP",
        }
    }
}

/// Rust types with a known column type.
///
/// `Option<T>` maps to the same type as `T` and marks the column nullable.
/// The `Record` derive reads these constants to build field metadata.
pub trait SqlTyped {
    /// Column type for this Rust type.
    const SQL_TYPE: SqlType;
    /// Whether the column accepts NULL.
    const NULLABLE: bool = false;
}

macro_rules! impl_sql_typed {
    ($($ty:ty => $sql:expr),* $(,)?) => {
        $(
            impl SqlTyped for $ty {
                const SQL_TYPE: SqlType = $sql;
            }
        )*
    };
}

impl_sql_typed! {
    i64 => SqlType::Integer,
    i32 => SqlType::Integer,
    i16 => SqlType::Integer,
    f64 => SqlType::Double,
    f32 => SqlType::Double,
    bool => SqlType::Boolean,
    String => SqlType::Text,
    Vec<u8> => SqlType::Blob,
    NaiveDateTime => SqlType::Timestamp,
}

impl<T: SqlTyped> SqlTyped for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;
}
