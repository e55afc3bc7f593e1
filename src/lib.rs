//! # ingest-schema
//!
//! An event ingestion deserializer with adaptive schema evolution.
//!
//! Events arrive as loosely-typed JSON (`{"project", "collection",
//! "properties"}`). This crate turns each one into a `(Schema, Record)` pair,
//! inferring and extending the collection's schema on the fly as new fields
//! appear, while keeping already-declared columns stable and positional.
//!
//! ## Design Principles
//!
//! - **No IO**: this crate has no knowledge of network transport or
//!   persistence; [`metastore::Metastore`] is an external collaborator this
//!   crate only depends on through a trait.
//! - **Schema evolution is additive**: a collection's schema only ever
//!   grows a monotone superset of itself; existing field positions never
//!   shift (see [`schema::Schema::union`]).
//! - **Order independence**: an event's `properties` block may appear
//!   before or after its `project`/`collection` header; [`parser`] resolves
//!   this with a single-savepoint rewind.
//!
//! ## Core Concepts
//!
//! ### Schema and Record
//!
//! A [`schema::Schema`] is an ordered, append-only list of
//! [`schema::SchemaField`]s. A [`record::Record`] is a positional value
//! bound to one schema version; [`record::Record::rebind`] carries values
//! forward onto a newer, superset schema.
//!
//! ### Field Dependencies
//!
//! A [`dependency::FieldDependencyRegistry`] lets modules declare fields
//! that must always be present (constants) or that must accompany some
//! other field (dependents). [`bootstrap::reconcile_all`] applies this
//! registry to every collection a metastore already knows about at startup.
//!
//! ### Event Deserialization
//!
//! [`deserializer::EventDeserializer`] ties the schema cache, metastore and
//! dependency registry together to turn one event's JSON text into a
//! `(Schema, Record)` pair.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ingest_schema::{
//!     cache::SchemaCache,
//!     dependency::FieldDependencyRegistryBuilder,
//!     deserializer::EventDeserializer,
//!     field_type::FieldType,
//!     ident::Project,
//!     memstore::InMemoryMetastore,
//!     metastore::NoopListener,
//!     schema::SchemaField,
//! };
//!
//! let metastore = InMemoryMetastore::new();
//! metastore.register_project(Project::new("acme").unwrap());
//!
//! let registry = FieldDependencyRegistryBuilder::new()
//!     .add_constant_field(SchemaField::new("ingested_at", FieldType::Long))
//!     .build();
//!
//! let deserializer = EventDeserializer::new(
//!     Arc::new(SchemaCache::new()),
//!     Arc::new(metastore),
//!     Arc::new(registry),
//!     Arc::new(NoopListener),
//! );
//!
//! let (schema, record) = deserializer
//!     .deserialize(r#"{"project":"acme","collection":"clicks","properties":{"x":1}}"#)
//!     .unwrap();
//!
//! assert!(schema.field("x").is_some());
//! assert!(schema.field("ingested_at").is_some());
//! assert_eq!(
//!     record.get_by_name("x"),
//!     Some(&ingest_schema::record::FieldValue::Long(1))
//! );
//! ```

pub mod bootstrap;
pub mod cache;
pub mod decode;
pub mod dependency;
pub mod deserializer;
pub mod error;
pub mod field_type;
pub mod ident;
pub mod memstore;
pub mod metastore;
pub mod parser;
pub mod record;
pub mod schema;

pub use deserializer::EventDeserializer;
pub use error::{Error, Result};
pub use ident::{Collection, Project};
pub use record::{FieldValue, Record};
pub use schema::{Schema, SchemaField, SharedSchema};
