//! Bootstrap reconciler (§4.E).
//!
//! At construction, walk every (project, collection) the metastore already
//! knows about and ensure module-contributed fields exist, so most ingress
//! events hit the fast path from the very first event.

use tracing::{error, info};

use crate::dependency::FieldDependencyRegistry;
use crate::error::Error;
use crate::ident::{Collection, Project};
use crate::metastore::{Metastore, SystemEventListener};
use crate::schema::SchemaField;

/// One failure encountered while reconciling a single collection (a type
/// conflict between a module-contributed field and an existing one). The
/// reconciler keeps going past these — §7: a bootstrap `TypeConflict` is
/// "fatal at bootstrap" for the offending collection, not for the whole
/// process.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub project: Project,
    pub collection: Collection,
    pub error: Error,
}

/// Reconcile every known (project, collection) against `registry`. Returns
/// the list of collections that could not be reconciled (logged at ERROR
/// as they're found); an empty list means every known collection now
/// contains every module-mandated field.
pub fn reconcile_all(
    metastore: &dyn Metastore,
    registry: &FieldDependencyRegistry,
    on_create: &dyn SystemEventListener,
) -> Vec<ReconcileFailure> {
    let mut failures = Vec::new();

    for project in metastore.get_projects() {
        for (collection, existing_schema) in metastore.get_collections(&project) {
            let mut to_add: Vec<SchemaField> = registry
                .constant_fields()
                .iter()
                .filter(|field| {
                    existing_schema
                        .field(&field.name)
                        .is_none_or(|existing| existing.field_type != field.field_type)
                })
                .cloned()
                .collect();

            for existing_field in existing_schema.fields() {
                for dependent in registry.dependents_of(&existing_field.name) {
                    if existing_schema.field(&dependent.name).is_none()
                        && !to_add.iter().any(|f| f.name == dependent.name)
                    {
                        to_add.push(dependent.clone());
                    }
                }
            }

            if to_add.is_empty() {
                continue;
            }

            match metastore.create_or_get_collection_field(&project, &collection, &to_add, on_create)
            {
                Ok(_) => {
                    info!(%project, %collection, added = to_add.len(), "bootstrap reconciled collection");
                }
                Err(error) => {
                    error!(%project, %collection, %error, "bootstrap reconciliation failed for collection");
                    failures.push(ReconcileFailure {
                        project: project.clone(),
                        collection,
                        error,
                    });
                }
            }
        }
    }

    failures
}
