//! Column and constraint metadata.
//!
//! Every record type exposes a static slice of [`FieldInfo`], generated by
//! `#[derive(Record)]`. The slice always starts with the three bookkeeping
//! columns [`FieldInfo::ID`], [`FieldInfo::CREATEDTS`] and
//! [`FieldInfo::UPDATEDTS`].

use crate::types::SqlType;

/// Referential action for foreign key constraints (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    /// Raise an error if any references exist.
    #[default]
    NoAction,
    /// Same as NO ACTION, checked immediately.
    Restrict,
    /// Delete or update referencing rows.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their default values.
    SetDefault,
}

impl ReferentialAction {
    /// SQL keywords for this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse an action name, case-insensitively.
    ///
    /// Accepts both spaced and underscored spellings, so catalog values such as
    /// `SET_NULL` parse as well as DDL text such as `SET NULL`.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NO ACTION" | "NOACTION" | "NO_ACTION" => Some(ReferentialAction::NoAction),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" | "SETNULL" | "SET_NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" | "SETDEFAULT" | "SET_DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

/// Metadata about a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name (same as the Rust field name).
    pub name: &'static str,
    /// Column type.
    pub sql_type: SqlType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the storage assigns the value on insert.
    pub auto_increment: bool,
    /// Whether the column carries a single-column unique constraint.
    pub unique: bool,
    /// Default value expression (SQL).
    pub default: Option<&'static str>,
    /// Table whose `id` this column references.
    pub references: Option<&'static str>,
    /// ON DELETE action for the reference.
    pub on_delete: Option<ReferentialAction>,
}

impl FieldInfo {
    /// Surrogate identifier assigned by storage.
    pub const ID: FieldInfo = FieldInfo::new("id", SqlType::Integer)
        .primary_key(true)
        .auto_increment(true);

    /// Creation timestamp, filled by the storage default at insert.
    pub const CREATEDTS: FieldInfo =
        FieldInfo::new("createdts", SqlType::Timestamp).default_expr("CURRENT_TIMESTAMP");

    /// Update timestamp, NULL until the first modification.
    pub const UPDATEDTS: FieldInfo =
        FieldInfo::new("updatedts", SqlType::Timestamp).nullable(true);

    /// Create a non-null column with no constraints.
    #[must_use]
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: None,
            references: None,
            on_delete: None,
        }
    }

    /// Set nullable flag.
    #[must_use]
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    #[must_use]
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    #[must_use]
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set unique flag.
    #[must_use]
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Set the default value expression.
    #[must_use]
    pub const fn default_expr(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    /// Reference `table.id`.
    #[must_use]
    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }

    /// Set the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Whether this is one of the bookkeeping columns every record carries.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(self.name, "id" | "createdts" | "updatedts")
    }
}

/// A named set of columns that must be jointly unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constraint (index) name.
    pub name: &'static str,
    /// Columns covered, in order.
    pub columns: &'static [&'static str],
}

impl UniqueConstraint {
    /// Create a constraint descriptor.
    #[must_use]
    pub const fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_action_parses_catalog_spelling() {
        assert_eq!(
            ReferentialAction::from_str("SET_NULL"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(
            ReferentialAction::from_str("no action"),
            Some(ReferentialAction::NoAction)
        );
        assert_eq!(ReferentialAction::from_str("explode"), None);
        assert_eq!(ReferentialAction::SetDefault.as_sql(), "SET DEFAULT");
    }

    #[test]
    fn test_meta_columns() {
        assert!(FieldInfo::ID.primary_key);
        assert!(FieldInfo::ID.auto_increment);
        assert_eq!(FieldInfo::CREATEDTS.default, Some("CURRENT_TIMESTAMP"));
        assert!(FieldInfo::UPDATEDTS.nullable);
        assert!(FieldInfo::UPDATEDTS.is_meta());
        assert!(!FieldInfo::new("name", SqlType::Text).is_meta());
    }

    #[test]
    fn test_builder_chain() {
        let f = FieldInfo::new("owner_id", SqlType::Integer)
            .nullable(true)
            .references("persons")
            .on_delete(ReferentialAction::SetNull);
        assert!(f.nullable);
        assert_eq!(f.references, Some("persons"));
        assert_eq!(f.on_delete, Some(ReferentialAction::SetNull));
        assert!(!f.unique);
    }
}
