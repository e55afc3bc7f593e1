//! Event deserializer (§4.G) — orchestrates parsing, schema lookup,
//! on-the-fly schema extension and record population.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::SchemaCache;
use crate::decode::{decode_inferred, decode_scalar};
use crate::dependency::FieldDependencyRegistry;
use crate::error::{Error, Result};
use crate::field_type::field_type_from_value;
use crate::ident::{Collection, Project};
use crate::metastore::{Metastore, SystemEventListener};
use crate::parser::parse_envelope;
use crate::record::Record;
use crate::schema::{Schema, SchemaField};

/// Ties together the schema cache, metastore, field dependency registry
/// and system-event listener needed to turn one event's JSON bytes into a
/// `(Schema, Record)` pair (§5: this type is expected to be cloned and
/// driven from many worker threads concurrently).
#[derive(Clone)]
pub struct EventDeserializer {
    cache: Arc<SchemaCache>,
    metastore: Arc<dyn Metastore>,
    registry: Arc<FieldDependencyRegistry>,
    listener: Arc<dyn SystemEventListener>,
}

impl EventDeserializer {
    pub fn new(
        cache: Arc<SchemaCache>,
        metastore: Arc<dyn Metastore>,
        registry: Arc<FieldDependencyRegistry>,
        listener: Arc<dyn SystemEventListener>,
    ) -> Self {
        Self {
            cache,
            metastore,
            registry,
            listener,
        }
    }

    /// Deserialize one event document. See spec §4.G for the full
    /// algorithm and §6 for the input/output shapes.
    pub fn deserialize(&self, input: &str) -> Result<(Arc<Schema>, Record)> {
        let envelope = parse_envelope(input)?;

        let project = envelope
            .project
            .ok_or_else(|| Error::MalformedEvent("missing project".into()))
            .and_then(Project::new)?;
        let collection = envelope
            .collection
            .ok_or_else(|| Error::MalformedEvent("missing collection".into()))
            .and_then(Collection::new)?;
        let properties = envelope
            .properties
            .ok_or_else(|| Error::MalformedEvent("properties missing".into()))?;

        self.parse_properties(&project, &collection, properties)
    }

    fn parse_properties(
        &self,
        project: &Project,
        collection: &Collection,
        properties: Map<String, Value>,
    ) -> Result<(Arc<Schema>, Record)> {
        let cached = self.cache.get(project, collection);
        let from_metastore = match &cached {
            Some(_) => None,
            None => self.metastore.get_collection(project, collection),
        };

        match cached.or(from_metastore) {
            Some(schema) => {
                self.cache.put(project, collection, schema.clone());
                self.fast_path(project, collection, schema, properties)
            }
            None => self.cold_path(project, collection, properties),
        }
    }

    /// Fast path: schema already exists in the cache or metastore.
    fn fast_path(
        &self,
        project: &Project,
        collection: &Collection,
        schema: Arc<Schema>,
        properties: Map<String, Value>,
    ) -> Result<(Arc<Schema>, Record)> {
        let mut current_schema = schema;
        let mut record = Record::new(current_schema.clone());
        let mut new_fields: Vec<SchemaField> = Vec::new();

        for (name, token) in properties {
            if let Some(existing) = current_schema.field(&name) {
                if let Some(value) = decode_scalar(&name, existing.field_type, &token)? {
                    record.put_by_name(&name, value);
                }
                // else: token type disagrees with the declared column —
                // silently dropped, column stays null (§4.G, §8 property 4).
                continue;
            }

            if let Some(inferred_type) = field_type_from_value(&name, &token)? {
                let new_field = SchemaField::new(name.clone(), inferred_type);
                // Synthesize a temporary extended schema so the record
                // under construction can hold the value immediately
                // (§4.G fast path step 3).
                current_schema = Arc::new(
                    current_schema
                        .union(std::slice::from_ref(&new_field))
                        .expect("a name absent from current_schema can't conflict"),
                );
                record = record.rebind(current_schema.clone());
                if let Some(value) = decode_inferred(inferred_type, &token) {
                    record.put_by_name(&name, value);
                }
                new_fields.push(new_field);
            }
            // else: null token or unsupported-but-tolerated value — skip.
        }

        if new_fields.is_empty() {
            return Ok((current_schema, record));
        }

        // §4.D: dependents-then-constants in the evolution path.
        self.registry.apply_dependents(&mut new_fields);
        self.registry.apply_constants(&mut new_fields);

        let canonical = self.metastore.create_or_get_collection_field(
            project,
            collection,
            &new_fields,
            self.listener.as_ref(),
        )?;
        self.cache.put(project, collection, canonical.clone());
        let record = record.rebind(canonical.clone());
        Ok((canonical, record))
    }

    /// Cold path: no schema exists yet for this collection.
    fn cold_path(
        &self,
        project: &Project,
        collection: &Collection,
        properties: Map<String, Value>,
    ) -> Result<(Arc<Schema>, Record)> {
        let mut fields = Vec::new();
        for (name, value) in &properties {
            if let Some(inferred_type) = field_type_from_value(name, value)? {
                fields.push(SchemaField::new(name.clone(), inferred_type));
            }
        }

        // §4.G cold path step 3: constants, then dependents (the opposite
        // order from the fast/evolution path — see §4.D and DESIGN.md).
        self.registry.apply_constants(&mut fields);
        self.registry.apply_dependents(&mut fields);

        let schema = self.metastore.create_or_get_collection_field(
            project,
            collection,
            &fields,
            self.listener.as_ref(),
        )?;
        self.cache.put(project, collection, schema.clone());

        let mut record = Record::new(schema.clone());
        for (name, value) in &properties {
            if let Some(field) = schema.field(name) {
                if let Some(decoded) = decode_inferred(field.field_type, value) {
                    record.put_by_name(name, decoded);
                }
            }
        }

        Ok((schema, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::FieldDependencyRegistryBuilder;
    use crate::field_type::FieldType;
    use crate::memstore::InMemoryMetastore;
    use crate::metastore::NoopListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn deserializer(store: InMemoryMetastore, registry: FieldDependencyRegistry) -> EventDeserializer {
        EventDeserializer::new(
            Arc::new(SchemaCache::new()),
            Arc::new(store),
            Arc::new(registry),
            Arc::new(NoopListener),
        )
    }

    fn fresh_store() -> InMemoryMetastore {
        let store = InMemoryMetastore::new();
        store.register_project(Project::new("p").unwrap());
        store
    }

    // S1 — header before properties.
    #[test]
    fn s1_header_before_properties() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let (schema, record) = d
            .deserialize(r#"{"project":"p","collection":"C1","properties":{"x":1,"y":"hi"}}"#)
            .unwrap();

        assert_eq!(schema.index_of("x"), Some(0));
        assert_eq!(schema.index_of("y"), Some(1));
        assert_eq!(
            record.get_by_name("x"),
            Some(&crate::record::FieldValue::Long(1))
        );
        assert_eq!(
            record.get_by_name("y"),
            Some(&crate::record::FieldValue::String("hi".into()))
        );
    }

    #[test]
    fn s1_fires_on_create_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let listener = crate::metastore::FnListener(move |_: &Project, c: &Collection| {
            assert_eq!(c.as_str(), "c1");
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        let d = EventDeserializer::new(
            Arc::new(SchemaCache::new()),
            Arc::new(fresh_store()),
            Arc::new(FieldDependencyRegistry::empty()),
            Arc::new(listener),
        );
        d.deserialize(r#"{"project":"p","collection":"C1","properties":{"x":1}}"#)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // S2 — properties-first rewind.
    #[test]
    fn s2_properties_before_header_is_equivalent() {
        let d1 = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let (_, r1) = d1
            .deserialize(r#"{"properties":{"a":true},"project":"p","collection":"c1"}"#)
            .unwrap();

        let d2 = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let (_, r2) = d2
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"a":true}}"#)
            .unwrap();

        assert_eq!(
            r1.get_by_name("a"),
            Some(&crate::record::FieldValue::Boolean(true))
        );
        assert_eq!(r1.get_by_name("a"), r2.get_by_name("a"));
    }

    // S3 — schema extension preserves existing positions.
    #[test]
    fn s3_schema_extension() {
        let store = fresh_store();
        let d = deserializer(store, FieldDependencyRegistry::empty());
        d.deserialize(r#"{"project":"p","collection":"c1","properties":{"x":1,"y":"hi"}}"#)
            .unwrap();

        let (schema, record) = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"z":2.5}}"#)
            .unwrap();

        assert_eq!(schema.index_of("x"), Some(0));
        assert_eq!(schema.index_of("y"), Some(1));
        assert_eq!(schema.index_of("z"), Some(2));
        assert!(record.get_by_name("x").is_none());
        assert!(record.get_by_name("y").is_none());
        assert_eq!(
            record.get_by_name("z"),
            Some(&crate::record::FieldValue::Double(2.5))
        );
    }

    // S4 — type drift leaves the column null and the schema unchanged.
    #[test]
    fn s4_type_drift_drops_value_without_mutating_schema() {
        let store = fresh_store();
        let d = deserializer(store, FieldDependencyRegistry::empty());
        d.deserialize(r#"{"project":"p","collection":"c1","properties":{"x":1,"y":"hi"}}"#)
            .unwrap();

        let (schema, record) = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"x":"oops"}}"#)
            .unwrap();

        assert_eq!(schema.len(), 2);
        assert!(record.get_by_name("x").is_none());
        assert!(record.get_by_name("y").is_none());
    }

    // S5 — dependent activation.
    #[test]
    fn s5_dependent_activation() {
        let registry = FieldDependencyRegistryBuilder::new()
            .add_dependent_field("user_id", SchemaField::new("country", FieldType::String))
            .build();
        let d = deserializer(fresh_store(), registry);

        let (schema, _) = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"user_id":"u1"}}"#)
            .unwrap();

        assert!(schema.field("user_id").is_some());
        assert!(schema.field("country").is_some());
    }

    #[test]
    fn constant_field_present_even_without_trigger() {
        let registry = FieldDependencyRegistryBuilder::new()
            .add_constant_field(SchemaField::new("ingested_at", FieldType::Long))
            .build();
        let d = deserializer(fresh_store(), registry);

        let (schema, _) = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"x":1}}"#)
            .unwrap();

        assert!(schema.field("ingested_at").is_some());
    }

    // S6 — malformed event: missing header.
    #[test]
    fn s6_malformed_missing_header() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let err = d.deserialize(r#"{"properties":{"x":1}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
    }

    #[test]
    fn malformed_missing_properties_and_no_savepoint() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let err = d
            .deserialize(r#"{"project":"p","collection":"c1"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
    }

    // Nested rejection.
    #[test]
    fn nested_object_is_rejected() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let err = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"x":{"a":1}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::NestedNotSupported(_)));

        // No cache change: the collection still doesn't exist.
        assert!(d
            .metastore
            .get_collection(&Project::new("p").unwrap(), &Collection::new("c1").unwrap())
            .is_none());
    }

    #[test]
    fn array_of_array_is_rejected() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        let err = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"x":[[1]]}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::NestedNotSupported(_)));
    }

    // Fast path: a nested token against an *already declared* column must
    // also be rejected, not silently accepted as an empty/null value.
    #[test]
    fn fast_path_array_of_array_against_declared_array_column_is_rejected() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        d.deserialize(r#"{"project":"p","collection":"c1","properties":{"tags":["a"]}}"#)
            .unwrap();

        let err = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"tags":[["x"]]}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::NestedNotSupported(_)));
    }

    #[test]
    fn fast_path_object_against_declared_string_column_is_rejected() {
        let d = deserializer(fresh_store(), FieldDependencyRegistry::empty());
        d.deserialize(r#"{"project":"p","collection":"c1","properties":{"name":"hi"}}"#)
            .unwrap();

        let err = d
            .deserialize(r#"{"project":"p","collection":"c1","properties":{"name":{"a":1}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::NestedNotSupported(_)));
    }

    // Idempotence: replaying the same event twice yields equal values
    // bound to the same (or a later superset) schema version.
    #[test]
    fn idempotent_replay() {
        let store = fresh_store();
        let d = deserializer(store, FieldDependencyRegistry::empty());
        let input = r#"{"project":"p","collection":"c1","properties":{"x":1,"y":"hi"}}"#;

        let (schema1, record1) = d.deserialize(input).unwrap();
        let (schema2, record2) = d.deserialize(input).unwrap();

        assert!(schema2.is_superset_of(&schema1));
        assert_eq!(record1.get_by_name("x"), record2.get_by_name("x"));
        assert_eq!(record1.get_by_name("y"), record2.get_by_name("y"));
    }

    // Concurrent evolution of the same collection with disjoint new
    // fields must not lose either field (§5, §9).
    #[test]
    fn concurrent_disjoint_evolution_both_succeed() {
        use std::thread;

        let store = fresh_store();
        let d = Arc::new(deserializer(store, FieldDependencyRegistry::empty()));
        let results = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for input in [
                r#"{"project":"p","collection":"c1","properties":{"a":1}}"#,
                r#"{"project":"p","collection":"c1","properties":{"b":"x"}}"#,
            ] {
                let d = d.clone();
                let results = &results;
                scope.spawn(move || {
                    let outcome = d.deserialize(input).unwrap();
                    results.lock().unwrap().push(outcome);
                });
            }
        });

        let final_schema = d
            .metastore
            .get_collection(&Project::new("p").unwrap(), &Collection::new("c1").unwrap())
            .unwrap();
        assert!(final_schema.field("a").is_some());
        assert!(final_schema.field("b").is_some());
    }

    // Property-based tests using proptest (§8 properties 1 and 2).
    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use serde_json::json;

        fn fresh_deserializer() -> EventDeserializer {
            let store = InMemoryMetastore::new();
            store.register_project(Project::new("p").unwrap());
            deserializer(store, FieldDependencyRegistry::empty())
        }

        proptest! {
            // Property 1: an event's decoded values don't depend on whether
            // `properties` appears before or after the `project`/`collection`
            // header (§4.F, §8 property 1).
            #[test]
            fn prop_header_order_is_independent(
                a in any::<i64>(),
                b in "[a-zA-Z0-9]{0,8}",
                c in any::<bool>(),
            ) {
                let mut properties = serde_json::Map::new();
                properties.insert("a".to_string(), json!(a));
                properties.insert("b".to_string(), json!(b));
                properties.insert("c".to_string(), json!(c));

                let header_first = json!({
                    "project": "p",
                    "collection": "c1",
                    "properties": properties,
                })
                .to_string();
                let properties_first = json!({
                    "properties": properties,
                    "project": "p",
                    "collection": "c1",
                })
                .to_string();

                let (_, r1) = fresh_deserializer().deserialize(&header_first).unwrap();
                let (_, r2) = fresh_deserializer().deserialize(&properties_first).unwrap();

                prop_assert_eq!(r1.get_by_name("a"), r2.get_by_name("a"));
                prop_assert_eq!(r1.get_by_name("b"), r2.get_by_name("b"));
                prop_assert_eq!(r1.get_by_name("c"), r2.get_by_name("c"));
            }

            // Property 2: a schema only ever grows — each event's resulting
            // schema is a superset of the previous one, and a field's
            // position never changes once assigned (§3 invariant 3, §8
            // property 2).
            #[test]
            fn prop_schema_grows_monotonically(indices in proptest::collection::vec(0usize..4, 1..8)) {
                let fields = [
                    ("a", json!(1)),
                    ("b", json!("x")),
                    ("c", json!(true)),
                    ("d", json!(2.5)),
                ];

                let d = fresh_deserializer();
                let mut previous_schema: Option<Arc<Schema>> = None;
                let mut first_seen_index: std::collections::HashMap<&str, usize> =
                    std::collections::HashMap::new();

                for idx in indices {
                    let (name, value) = &fields[idx];
                    let mut properties = serde_json::Map::new();
                    properties.insert(name.to_string(), value.clone());
                    let input = json!({
                        "project": "p",
                        "collection": "c1",
                        "properties": properties,
                    })
                    .to_string();

                    let (schema, _) = d.deserialize(&input).unwrap();

                    if let Some(prev) = &previous_schema {
                        prop_assert!(schema.is_superset_of(prev));
                    }
                    match (first_seen_index.get(name), schema.index_of(name)) {
                        (Some(&seen), Some(now)) => prop_assert_eq!(seen, now),
                        (None, Some(now)) => {
                            first_seen_index.insert(name, now);
                        }
                        _ => prop_assert!(false, "field must be present after being introduced"),
                    }
                    previous_schema = Some(schema);
                }
            }
        }
    }
}
