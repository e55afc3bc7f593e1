//! Error types for the ingestion engine.

use thiserror::Error;

use crate::ident::{Collection, Project};

/// All possible errors raised while reconciling schemas or deserializing
/// events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The event's header was incomplete: `project` or `collection` was
    /// missing, or `properties` was missing with no savepoint to rewind to.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// A property value was an object, an array-of-array, or embedded
    /// binary — the flat type model has no representation for it.
    #[error("nested structure not supported for field '{0}'")]
    NestedNotSupported(String),

    /// The metastore was asked to evolve a schema for a project it has
    /// never heard of.
    #[error("project does not exist: {0}")]
    ProjectNotExists(Project),

    /// A module-contributed field collides by name with an existing field
    /// of a different type.
    #[error(
        "type conflict for field '{field}' in {project}/{collection}: existing {existing}, contributed {contributed}"
    )]
    TypeConflict {
        project: Project,
        collection: Collection,
        field: String,
        existing: String,
        contributed: String,
    },

    /// A system-event listener panicked or returned an error. Surfaced so
    /// callers can log it; ingestion of the triggering event still
    /// completes (§7: logged but does not abort ingestion).
    #[error("system event listener failed: {0}")]
    ListenerFailure(String),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
