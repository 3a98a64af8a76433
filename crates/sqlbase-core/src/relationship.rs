//! Relationship metadata.
//!
//! Relationships are declared on the derive and exposed as static metadata
//! on each record type. The declarative layer uses them to route nested
//! object and list values in input data to the related record type.

use crate::record::Record;

/// The direction of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// This record stores the foreign key (`car.owner_id -> person.id`).
    BelongsTo,
    /// The related records store the foreign key (`person -> [car.owner_id]`).
    HasMany,
}

/// Metadata about one relationship of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name under which nested data appears (`"owner"`, `"cars"`).
    pub name: &'static str,
    /// Direction.
    pub kind: RelationshipKind,
    /// Foreign key column. Lives on this table for `BelongsTo`, on the
    /// target table for `HasMany`.
    pub column: &'static str,
    /// Table of the related record type.
    pub target_table: &'static str,
}

impl RelationshipInfo {
    /// Create relationship metadata.
    #[must_use]
    pub const fn new(
        name: &'static str,
        kind: RelationshipKind,
        column: &'static str,
        target_table: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            column,
            target_table,
        }
    }
}

/// Generic callback dispatched to the concrete type behind a relationship.
///
/// `Record::visit_related` calls [`RelatedVisitor::visit`] with the target
/// type of the named relationship, which lets code above this crate operate on
/// related records without knowing their types statically.
pub trait RelatedVisitor {
    /// Value produced by the visit.
    type Output;

    /// Called with the related record type.
    fn visit<R: Record>(self) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_info_new() {
        let info = RelationshipInfo::new("cars", RelationshipKind::HasMany, "owner_id", "cars");
        assert_eq!(info.name, "cars");
        assert_eq!(info.kind, RelationshipKind::HasMany);
        assert_eq!(info.column, "owner_id");
        assert_eq!(info.target_table, "cars");
    }
}
