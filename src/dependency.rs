//! Field dependency registry (§3 FieldDependency, §4.D).
//!
//! Built once at startup by letting every registered module contribute
//! constant and conditional fields to a builder; immutable and lock-free
//! once `build()` is called (§5).

use std::collections::HashMap;

use crate::schema::SchemaField;

/// Accumulates constant and dependent fields contributed by modules before
/// the registry is frozen.
#[derive(Default)]
pub struct FieldDependencyRegistryBuilder {
    constant_fields: Vec<SchemaField>,
    dependent_fields: HashMap<String, Vec<SchemaField>>,
}

impl FieldDependencyRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field that must exist in every collection.
    pub fn add_constant_field(mut self, field: SchemaField) -> Self {
        self.constant_fields.push(field);
        self
    }

    /// Register `field` as required whenever a field named `trigger` is
    /// present in a collection's schema.
    pub fn add_dependent_field(mut self, trigger: impl Into<String>, field: SchemaField) -> Self {
        self.dependent_fields
            .entry(trigger.into())
            .or_default()
            .push(field);
        self
    }

    pub fn build(self) -> FieldDependencyRegistry {
        FieldDependencyRegistry {
            constant_fields: self.constant_fields,
            dependent_fields: self.dependent_fields,
        }
    }
}

/// Immutable, read-only registry of module-contributed field dependencies.
#[derive(Debug, Clone, Default)]
pub struct FieldDependencyRegistry {
    constant_fields: Vec<SchemaField>,
    dependent_fields: HashMap<String, Vec<SchemaField>>,
}

impl FieldDependencyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn constant_fields(&self) -> &[SchemaField] {
        &self.constant_fields
    }

    pub fn dependents_of<'a>(&'a self, trigger: &str) -> &'a [SchemaField] {
        self.dependent_fields
            .get(trigger)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Apply the same-name reconciliation rule (§4.D) for a single
    /// candidate field against `fields`, mutating `fields` in place.
    fn apply_one(fields: &mut Vec<SchemaField>, candidate: &SchemaField) {
        if let Some(pos) = fields.iter().position(|f| f.name == candidate.name) {
            if fields[pos].field_type != candidate.field_type {
                fields.remove(pos);
                fields.push(candidate.clone());
            }
            // same name, same type: no-op
        } else {
            fields.push(candidate.clone());
        }
    }

    /// For each constant `c`: no-op if `fields` has a same-named field of
    /// the same type; replace it if the type differs; append it if
    /// absent (§4.D).
    pub fn apply_constants(&self, fields: &mut Vec<SchemaField>) {
        for constant in &self.constant_fields {
            Self::apply_one(fields, constant);
        }
    }

    /// For each `(trigger -> extras)` entry, if `fields` already contains a
    /// field named `trigger`, apply every extra via the same rule (§4.D).
    pub fn apply_dependents(&self, fields: &mut Vec<SchemaField>) {
        // Collect triggers first: `fields` is what we're mutating, and an
        // extra we just appended must never itself retroactively act as a
        // trigger within this same pass.
        let active_triggers: Vec<&str> = self
            .dependent_fields
            .keys()
            .map(String::as_str)
            .filter(|trigger| fields.iter().any(|f| f.name == *trigger))
            .collect();

        for trigger in active_triggers {
            for extra in self.dependents_of(trigger) {
                Self::apply_one(fields, extra);
            }
        }
    }
}
