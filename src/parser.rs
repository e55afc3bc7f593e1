//! Rewindable JSON parsing of one event object (§4.F).
//!
//! The event's header fields (`project`, `collection`) may appear *after*
//! the `properties` block. A single-pass parser can't type-resolve
//! `properties` before it knows the header, so it needs to save its
//! position, skip forward to read the header, then rewind.
//!
//! This crate realizes the byte-offset savepoint described in §4.F/§9 by
//! borrowing a [`serde_json::value::RawValue`] out of the top-level map:
//! capturing a `&RawValue` via `MapAccess::next_value` copies no bytes and
//! parses nothing — it is the zero-copy analogue of recording an offset and
//! later skipping back to it. `load()` is then the point where that raw
//! text is actually tokenized, "resetting parser state to inside an object,
//! expecting first field" by simply re-parsing it as one.

use serde::de::{self, Deserializer as _, IgnoredAny, MapAccess, Visitor};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Single-savepoint rewind buffer. Only one savepoint can exist at a time,
/// matching §4.F ("Only one savepoint is needed").
pub struct RewindableParser<'de> {
    savepoint: Option<&'de RawValue>,
}

impl<'de> RewindableParser<'de> {
    pub fn new() -> Self {
        Self { savepoint: None }
    }

    /// Record `raw` as the position to rewind to later.
    pub fn save(&mut self, raw: &'de RawValue) {
        self.savepoint = Some(raw);
    }

    pub fn is_saved(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Rewind to the savepoint, tokenizing it as a fresh JSON object.
    /// Panics if no savepoint exists — callers must check `is_saved()`
    /// first, matching the spec's "only callable when saved" contract.
    pub fn load(&mut self) -> Result<Map<String, Value>> {
        let raw = self
            .savepoint
            .take()
            .expect("load() called with no savepoint");
        serde_json::from_str(raw.get()).map_err(|e| Error::MalformedEvent(e.to_string()))
    }
}

impl<'de> Default for RewindableParser<'de> {
    fn default() -> Self {
        Self::new()
    }
}

/// The fully-resolved contents of one event's top-level object: `project`
/// and `collection` if present, and `properties` if the document had a
/// `properties` key at all (regardless of where in the object it
/// appeared — order independence is the point of this module).
#[derive(Debug, Default)]
pub struct Envelope {
    pub project: Option<String>,
    pub collection: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Envelope;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("an event object with project, collection and properties fields")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut project = None;
        let mut collection = None;
        let mut properties: Option<Map<String, Value>> = None;
        let mut properties_seen = false;
        let mut parser = RewindableParser::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "project" => project = Some(map.next_value::<String>()?),
                "collection" => collection = Some(map.next_value::<String>()?),
                "properties" => {
                    if properties_seen {
                        return Err(de::Error::custom(
                            "properties specified more than once",
                        ));
                    }
                    properties_seen = true;

                    if project.is_some() && collection.is_some() {
                        // Header already known: parse inline, no rewind
                        // needed (spec.md §4.G: "if project and collection
                        // already known, delegate to parseProperties").
                        properties = Some(map.next_value::<Map<String, Value>>()?);
                    } else {
                        // Header not known yet: save the subtree and keep
                        // scanning for it (spec.md §4.G: "save() the parser
                        // position, skipChildren() ... and continue").
                        let raw: &RawValue = map.next_value()?;
                        parser.save(raw);
                    }
                }
                _ => {
                    // any other field -> ignored
                    let _ = map.next_value::<IgnoredAny>()?;
                }
            }
        }

        if properties.is_none() && parser.is_saved() {
            properties = Some(parser.load().map_err(de::Error::custom)?);
        }

        Ok(Envelope {
            project,
            collection,
            properties,
        })
    }
}

/// Parse one event's top-level JSON object into an [`Envelope`], resolving
/// any header/properties ordering via the rewind mechanism above.
pub fn parse_envelope(input: &str) -> Result<Envelope> {
    let mut de = serde_json::Deserializer::from_str(input);
    de.deserialize_map(EnvelopeVisitor)
        .map_err(|e| Error::MalformedEvent(e.to_string()))
}
