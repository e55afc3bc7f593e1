//! Schema and field definitions (§3).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::field_type::FieldType;

/// A single typed, nullable column in a schema.
///
/// Names are unique within a `Schema`; comparison for reconciliation is by
/// name only (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
    /// Always `true` in this core — every field is conceptually nullable in
    /// the record encoding (§3) — kept as an explicit field rather than a
    /// constant so a future, less restrictive core has somewhere to put it.
    pub nullable: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// An ordered, append-only list of typed fields for one collection.
///
/// Ordering is stable: existing field positions never shift when new fields
/// are appended (§3). Immutable once constructed so the schema cache can
/// publish `Arc<Schema>` values without readers ever observing a torn field
/// list (§4.B).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_at(&self, index: usize) -> Option<&SchemaField> {
        self.fields.get(index)
    }

    /// Reconcile `incoming` fields into this schema, returning a new schema.
    ///
    /// For each incoming field: a same-named field of the same type is a
    /// no-op; a same-named field of a different type is a hard error
    /// (returned as `(name, existing_type, incoming_type)` for the caller to
    /// turn into an `Error::TypeConflict`, which needs the project/collection
    /// this schema doesn't carry); an absent field is appended, preserving
    /// the position of every existing field (§3 invariant 3).
    pub fn union(
        &self,
        incoming: &[SchemaField],
    ) -> Result<Schema, (String, FieldType, FieldType)> {
        let mut fields = self.fields.clone();
        for incoming_field in incoming {
            match fields.iter().find(|f| f.name == incoming_field.name) {
                Some(existing) if existing.field_type == incoming_field.field_type => {}
                Some(existing) => {
                    return Err((
                        incoming_field.name.clone(),
                        existing.field_type,
                        incoming_field.field_type,
                    ))
                }
                None => fields.push(incoming_field.clone()),
            }
        }
        Ok(Schema { fields })
    }

    /// True if `self` contains every field of `subset` at a matching type —
    /// i.e. `self` is a superset of `subset` (§3 invariant 1: "monotone
    /// superset").
    pub fn is_superset_of(&self, subset: &Schema) -> bool {
        subset.fields.iter().all(|f| {
            self.field(&f.name)
                .is_some_and(|existing| existing.field_type == f.field_type)
        })
    }
}

/// A schema paired with the project/collection it governs, as returned to
/// callers of the deserializer (§6: "Output: a pair (Schema, Record)").
pub type SharedSchema = Arc<Schema>;

/// Turn a union conflict produced by [`Schema::union`] into the crate's
/// `Error` type once the caller knows which project/collection it happened
/// in.
pub fn conflict_into_error(
    project: &crate::ident::Project,
    collection: &crate::ident::Collection,
    conflict: (String, FieldType, FieldType),
) -> Error {
    let (field, existing, contributed) = conflict;
    Error::TypeConflict {
        project: project.clone(),
        collection: collection.clone(),
        field,
        existing: existing.to_string(),
        contributed: contributed.to_string(),
    }
}
