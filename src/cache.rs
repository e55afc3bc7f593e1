//! Process-local schema cache (§4.B).
//!
//! A concurrent map from (project, collection) to the current `Schema`.
//! The metastore is the authoritative copy; this cache is a latency
//! optimization and may lag a sibling process's update — inconsistency is
//! corrected on the next failed field lookup, which re-invokes the
//! metastore (§4.B, §9).

use std::sync::Arc;

use dashmap::DashMap;

use crate::ident::{Collection, Project};
use crate::schema::Schema;

/// Key the cache is indexed by. Wrapping `(Project, Collection)` in a named
/// type keeps call sites from accidentally swapping the two strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey(Project, Collection);

/// Concurrent `(project, collection) -> Schema` cache.
///
/// `Schema` values are published behind `Arc`, so a reader that has already
/// obtained a reference never sees a schema mutate out from under it — any
/// evolution produces a brand new `Arc<Schema>` and swaps the map entry,
/// never mutates in place (§9: "the cache's atomic swap is the
/// linearization point").
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<CacheKey, Arc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, project: &Project, collection: &Collection) -> Option<Arc<Schema>> {
        self.entries
            .get(&CacheKey(project.clone(), collection.clone()))
            .map(|entry| entry.clone())
    }

    /// Replace (or insert) the cached schema for `(project, collection)`.
    /// Writers may call this with any schema at any time; per §4.B this is
    /// a "latency optimization", not a source of truth, so no superset
    /// check is enforced here — the metastore is the arbiter of that.
    pub fn put(&self, project: &Project, collection: &Collection, schema: Arc<Schema>) {
        self.entries
            .insert(CacheKey(project.clone(), collection.clone()), schema);
    }
}
