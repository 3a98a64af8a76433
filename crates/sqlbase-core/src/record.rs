//! The `Record` trait and the bookkeeping columns every record carries.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::field::{FieldInfo, UniqueConstraint};
use crate::relationship::{RelatedVisitor, RelationshipInfo};
use crate::row::Row;
use crate::value::{FromValue, Value};

/// JSON-style mapping of column names to values.
pub type Dict = serde_json::Map<String, JsonValue>;

/// Identifier and timestamps shared by every record type.
///
/// Embedded in each record struct and marked with `#[record(meta)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMeta {
    /// Surrogate key, `None` until the record is inserted.
    pub id: Option<i64>,
    /// Set by storage at insert.
    pub createdts: Option<NaiveDateTime>,
    /// NULL until the first update.
    pub updatedts: Option<NaiveDateTime>,
}

impl RecordMeta {
    /// Names of the bookkeeping columns, in table order.
    pub const COLUMNS: [&'static str; 3] = ["id", "createdts", "updatedts"];

    /// Whether `column` is one of the bookkeeping columns.
    pub fn is_meta_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }

    /// Read a bookkeeping column.
    pub fn get_value(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(self.id.into()),
            "createdts" => Some(self.createdts.into()),
            "updatedts" => Some(self.updatedts.into()),
            _ => None,
        }
    }

    /// Write a bookkeeping column.
    pub fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = FromValue::from_value(value).map_err(|e| e.in_column(column))?,
            "createdts" => {
                self.createdts = FromValue::from_value(value).map_err(|e| e.in_column(column))?;
            }
            "updatedts" => {
                self.updatedts = FromValue::from_value(value).map_err(|e| e.in_column(column))?;
            }
            other => {
                return Err(Error::usage(format!("\"{other}\" is not a bookkeeping column")));
            }
        }
        Ok(())
    }
}

/// A persisted record type.
///
/// Implemented by `#[derive(Record)]`. The trait exposes static table
/// metadata plus dynamic column access; the generic data-access operations
/// are built on top of it.
pub trait Record: Default + Clone + Send + 'static {
    /// Table name.
    const TABLE_NAME: &'static str;

    /// All columns, bookkeeping columns first.
    fn fields() -> &'static [FieldInfo];

    /// Multi-column unique constraints.
    fn unique_constraints() -> &'static [UniqueConstraint] {
        &[]
    }

    /// Relationships to other record types.
    fn relationships() -> &'static [RelationshipInfo] {
        &[]
    }

    /// Bookkeeping columns.
    fn meta(&self) -> &RecordMeta;

    /// Mutable bookkeeping columns.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Current value of a column, or `None` if the column does not exist.
    fn get_value(&self, column: &str) -> Option<Value>;

    /// Set a column from a value, converting to the field's Rust type.
    fn set_value(&mut self, column: &str, value: Value) -> Result<()>;

    /// Call `visitor` with the target type of relationship `name`.
    fn visit_related<V: RelatedVisitor>(name: &str, visitor: V) -> Option<V::Output> {
        let _ = (name, visitor);
        None
    }

    /// Primary key, if assigned.
    fn id(&self) -> Option<i64> {
        self.meta().id
    }

    /// Column names, in table order.
    fn column_names() -> Vec<&'static str> {
        Self::fields().iter().map(|f| f.name).collect()
    }

    /// Column metadata by name.
    fn field(column: &str) -> Option<&'static FieldInfo> {
        Self::fields().iter().find(|f| f.name == column)
    }

    /// Relationship metadata by name.
    fn relationship(name: &str) -> Option<&'static RelationshipInfo> {
        Self::relationships().iter().find(|r| r.name == name)
    }

    /// Every column covered by a unique constraint, single or composite.
    fn unique_columns() -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Self::fields()
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name)
            .collect();
        for uc in Self::unique_constraints() {
            for col in uc.columns {
                if !cols.contains(col) {
                    cols.push(col);
                }
            }
        }
        cols
    }

    /// Build a record from a result row. Columns the type does not know are
    /// ignored.
    fn from_row(row: &Row) -> Result<Self> {
        let mut record = Self::default();
        for (column, value) in row.iter() {
            if let Some(field) = Self::field(column) {
                record.set_value(field.name, value.clone())?;
            }
        }
        Ok(record)
    }

    /// Column values as a JSON mapping, leaving out `exclude`.
    ///
    /// Relationships are never included.
    fn to_dict(&self, exclude: &[&str]) -> Dict {
        Self::fields()
            .iter()
            .filter(|f| !exclude.contains(&f.name))
            .map(|f| {
                let json = self.get_value(f.name).map_or(JsonValue::Null, |v| v.to_json());
                (f.name.to_string(), json)
            })
            .collect()
    }

    /// Assign scalar columns from a JSON mapping.
    ///
    /// Values are converted by the column type. Relationship keys and unknown
    /// keys are usage errors, as is changing an assigned `id`.
    fn assign(&mut self, data: &Dict) -> Result<()> {
        for (key, json) in data {
            if Self::relationship(key).is_some() {
                return Err(Error::usage(format!(
                    "\"{key}\" is a relationship of \"{}\" and cannot be assigned as a column",
                    Self::TABLE_NAME
                )));
            }
            let field =
                Self::field(key).ok_or_else(|| Error::unknown_field(Self::TABLE_NAME, key))?;
            let value = Value::from_json(json, field.sql_type).map_err(|e| e.in_column(key))?;
            if field.name == "id" {
                if let (Some(current), Some(new)) = (self.id(), value.as_i64()) {
                    if current != new {
                        return Err(Error::usage(format!(
                            "id of \"{}\" is {current} and cannot change to {new}",
                            Self::TABLE_NAME
                        )));
                    }
                }
            }
            self.set_value(field.name, value)?;
        }
        Ok(())
    }
}
