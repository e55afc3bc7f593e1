//! Closed type model for schema fields (§3, §4.A).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// The five field types a schema can declare. There is no nested-object or
/// nested-array variant by design (§9: "the type model is flat by design").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Long,
    Double,
    Boolean,
    /// Always array-of-STRING in this core.
    Array,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Long => write!(f, "Long"),
            FieldType::Double => write!(f, "Double"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Array => write!(f, "Array"),
        }
    }
}

/// Infer a `FieldType` from a parsed JSON value (§4.A, the "value-based
/// variant" used by the cold/bootstrap paths).
///
/// Returns `Ok(None)` for `null` (contributes no type information). Rejects
/// nested objects and array-of-array with `NestedNotSupported`; the name
/// passed in is only used to label that error.
pub fn field_type_from_value(name: &str, value: &Value) -> Result<Option<FieldType>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(_) => Ok(Some(FieldType::Boolean)),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(Some(FieldType::Long))
            } else {
                Ok(Some(FieldType::Double))
            }
        }
        Value::String(_) => Ok(Some(FieldType::String)),
        Value::Array(elems) => {
            if elems.iter().any(Value::is_array) {
                return Err(Error::NestedNotSupported(name.to_string()));
            }
            Ok(Some(FieldType::Array))
        }
        Value::Object(_) => Err(Error::NestedNotSupported(name.to_string())),
    }
}

/// Coerce an array-of-scalars JSON value into the flat `Vec<String>`
/// representation used for `FieldType::Array`. Non-string elements are
/// dropped individually rather than failing the whole field, matching the
/// "silently drop" ethos applied elsewhere to type disagreement (§4.G).
pub fn array_elements_as_strings(elems: &[Value]) -> Vec<String> {
    elems
        .iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect()
}
