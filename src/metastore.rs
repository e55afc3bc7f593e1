//! External metastore contract (§4.C, §6).
//!
//! The metastore is an external collaborator: this crate only depends on
//! the trait below. [`crate::memstore::InMemoryMetastore`] is a reference
//! implementation used by this crate's own tests and doctests, not a
//! persistence backend.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::ident::{Collection, Project};
use crate::schema::{Schema, SchemaField};

/// Fired exactly once per newly created collection, on whatever thread
/// triggered creation (§6).
pub trait SystemEventListener: Send + Sync {
    fn on_create_collection(&self, project: &Project, collection: &Collection);
}

/// A listener built from a plain closure, for callers that don't want to
/// define a whole type just to react to collection creation.
pub struct FnListener<F>(pub F)
where
    F: Fn(&Project, &Collection) + Send + Sync;

impl<F> SystemEventListener for FnListener<F>
where
    F: Fn(&Project, &Collection) + Send + Sync,
{
    fn on_create_collection(&self, project: &Project, collection: &Collection) {
        (self.0)(project, collection)
    }
}

/// A listener that does nothing, for tests/demos that don't care about
/// collection-creation notifications.
pub struct NoopListener;

impl SystemEventListener for NoopListener {
    fn on_create_collection(&self, _project: &Project, _collection: &Collection) {}
}

/// External authority for durable schema state and creation notifications
/// (§4.C). Implementations must serialize concurrent
/// `create_or_get_collection_field` calls for the same (project,
/// collection) — the expected semantic is set-union, so two concurrent
/// extensions that introduce disjoint fields must both succeed and the
/// merged schema must contain both (§5).
pub trait Metastore: Send + Sync {
    fn get_projects(&self) -> Vec<Project>;

    fn get_collections(&self, project: &Project) -> HashMap<Collection, Arc<Schema>>;

    fn get_collection(&self, project: &Project, collection: &Collection) -> Option<Arc<Schema>>;

    /// Idempotent union: merges `fields` into the stored schema and returns
    /// the canonical post-merge schema. If this call caused the collection
    /// to come into existence, `on_create` is invoked exactly once. Fails
    /// with `Error::ProjectNotExists` if the project is unknown.
    fn create_or_get_collection_field(
        &self,
        project: &Project,
        collection: &Collection,
        fields: &[SchemaField],
        on_create: &dyn SystemEventListener,
    ) -> Result<Arc<Schema>>;
}
