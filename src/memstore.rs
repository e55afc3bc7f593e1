//! Reference in-memory `Metastore` implementation (component I).
//!
//! This is test/demo tooling, not a persistence backend — see §4.C. It
//! mirrors the teacher's `Store`/`Collection` pairing (an owning map behind
//! a lock, guarding mutation) rather than anything database-specific, since
//! actual durable persistence is explicitly out of scope for this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::error;

use crate::error::{Error, Result};
use crate::ident::{Collection, Project};
use crate::metastore::{Metastore, SystemEventListener};
use crate::schema::{conflict_into_error, Schema, SchemaField};

#[derive(Default)]
struct ProjectState {
    collections: HashMap<Collection, Arc<Schema>>,
}

/// An in-memory `Metastore`. Cheap to clone (wraps an `Arc`); safe to share
/// across worker threads.
#[derive(Clone, Default)]
pub struct InMemoryMetastore {
    projects: Arc<Mutex<HashMap<Project, ProjectState>>>,
}

impl InMemoryMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project so events for it stop failing with
    /// `ProjectNotExists`. Project lifecycle is external administrative
    /// action per §3/§4.C; this is that action's stand-in for tests and
    /// doctests.
    pub fn register_project(&self, project: Project) {
        self.projects.lock().unwrap().entry(project).or_default();
    }
}

impl Metastore for InMemoryMetastore {
    fn get_projects(&self) -> Vec<Project> {
        self.projects.lock().unwrap().keys().cloned().collect()
    }

    fn get_collections(&self, project: &Project) -> HashMap<Collection, Arc<Schema>> {
        self.projects
            .lock()
            .unwrap()
            .get(project)
            .map(|state| state.collections.clone())
            .unwrap_or_default()
    }

    fn get_collection(&self, project: &Project, collection: &Collection) -> Option<Arc<Schema>> {
        self.projects
            .lock()
            .unwrap()
            .get(project)?
            .collections
            .get(collection)
            .cloned()
    }

    fn create_or_get_collection_field(
        &self,
        project: &Project,
        collection: &Collection,
        fields: &[SchemaField],
        on_create: &dyn SystemEventListener,
    ) -> Result<Arc<Schema>> {
        // Holding the project lock for the whole merge is what gives two
        // concurrent callers for the same (project, collection) the
        // required serialization (§5): the union is computed and published
        // atomically with respect to other callers on this project.
        let mut projects = self.projects.lock().unwrap();
        let state = projects
            .get_mut(project)
            .ok_or_else(|| Error::ProjectNotExists(project.clone()))?;

        let existed_before = state.collections.contains_key(collection);
        let base = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_else(|| Arc::new(Schema::empty()));

        let merged = base
            .union(fields)
            .map_err(|conflict| conflict_into_error(project, collection, conflict))?;
        let merged = Arc::new(merged);
        state.collections.insert(collection.clone(), merged.clone());
        drop(projects);

        if !existed_before {
            // §7/§5: a listener failure is logged and swallowed, never
            // allowed to fail the ingestion that triggered it.
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                on_create.on_create_collection(project, collection)
            }));
            if outcome.is_err() {
                error!(
                    %project,
                    %collection,
                    "{}",
                    Error::ListenerFailure(format!("on_create_collection panicked for {project}/{collection}"))
                );
            }
        }

        Ok(merged)
    }
}
