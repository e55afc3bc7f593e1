//! Scalar decoding rules (§4.G "Scalar decoding rules (fast path)").

use serde_json::Value;

use crate::error::{Error, Result};
use crate::field_type::{array_elements_as_strings, FieldType};
use crate::record::FieldValue;

/// Decode `token` against an *already declared* column named `name` of
/// type `field_type`. Returns `Ok(None)` when the token doesn't match what
/// the column expects — the fast path drops such values silently rather
/// than failing the event (§4.G: "Tokens whose type does not match the
/// declared column are silently dropped"). An object, or an array
/// containing a nested array, is never representable by the flat type
/// model regardless of the declared column type, and is rejected with
/// `Err(Error::NestedNotSupported)` — the decode table's "anything else |
/// fail with NestedNotSupported" row (§4.G, §8 property 6).
///
/// BOOLEAN is the one quirky row in the table: a declared BOOLEAN column
/// only accepts a JSON *string* token here, not a native `true`/`false`
/// token. This is flagged as a likely bug in spec.md §9 and preserved
/// exactly as specified rather than "fixed" — see DESIGN.md.
pub fn decode_scalar(name: &str, field_type: FieldType, token: &Value) -> Result<Option<FieldValue>> {
    if matches!(token, Value::Object(_)) {
        return Err(Error::NestedNotSupported(name.to_string()));
    }
    if let Value::Array(elems) = token {
        if elems.iter().any(Value::is_array) {
            return Err(Error::NestedNotSupported(name.to_string()));
        }
    }

    Ok(match field_type {
        FieldType::String => token.as_str().map(|s| FieldValue::String(s.to_string())),
        FieldType::Long => token.as_i64().or_else(|| token.as_u64().map(|u| u as i64)).map(FieldValue::Long),
        FieldType::Double => token
            .as_f64()
            .filter(|_| token.as_i64().is_none() && token.as_u64().is_none())
            .map(FieldValue::Double),
        FieldType::Boolean => match token.as_str() {
            Some("true") => Some(FieldValue::Boolean(true)),
            Some("false") => Some(FieldValue::Boolean(false)),
            _ => None,
        },
        FieldType::Array => token
            .as_array()
            .map(|elems| FieldValue::Array(array_elements_as_strings(elems))),
    })
}

/// Decode `value` straight off the same token that was just used to infer
/// `field_type` (§4.A's value-based inference). Because the type and the
/// value come from the same token, there is no disagreement to guard
/// against — unlike [`decode_scalar`], a native JSON boolean is accepted
/// here, since it's the token inference itself classified as BOOLEAN.
pub fn decode_inferred(field_type: FieldType, value: &Value) -> Option<FieldValue> {
    match field_type {
        FieldType::String => value.as_str().map(|s| FieldValue::String(s.to_string())),
        FieldType::Long => value
            .as_i64()
            .or_else(|| value.as_u64().map(|u| u as i64))
            .map(FieldValue::Long),
        FieldType::Double => value.as_f64().map(FieldValue::Double),
        FieldType::Boolean => value.as_bool().map(FieldValue::Boolean),
        FieldType::Array => value
            .as_array()
            .map(|elems| FieldValue::Array(array_elements_as_strings(elems))),
    }
}
