//! A hand-written record type for builder tests.

use sqlbase_core::{Error, FieldInfo, FromValue, Record, RecordMeta, Result, SqlType, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gadget {
    pub meta: RecordMeta,
    pub label: String,
    pub size: Option<i64>,
}

impl Gadget {
    pub fn new(label: &str, size: Option<i64>) -> Self {
        Self {
            meta: RecordMeta::default(),
            label: label.to_string(),
            size,
        }
    }
}

static GADGET_FIELDS: [FieldInfo; 5] = [
    FieldInfo::ID,
    FieldInfo::CREATEDTS,
    FieldInfo::UPDATEDTS,
    FieldInfo::new("label", SqlType::Text),
    FieldInfo::new("size", SqlType::Integer).nullable(true),
];

impl Record for Gadget {
    const TABLE_NAME: &'static str = "gadgets";

    fn fields() -> &'static [FieldInfo] {
        &GADGET_FIELDS
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn get_value(&self, column: &str) -> Option<Value> {
        if let Some(v) = self.meta.get_value(column) {
            return Some(v);
        }
        match column {
            "label" => Some(self.label.clone().into()),
            "size" => Some(self.size.into()),
            _ => None,
        }
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        if RecordMeta::is_meta_column(column) {
            return self.meta.set_value(column, value);
        }
        match column {
            "label" => self.label = FromValue::from_value(value)?,
            "size" => self.size = FromValue::from_value(value)?,
            _ => return Err(Error::unknown_field(Self::TABLE_NAME, column)),
        }
        Ok(())
    }
}
