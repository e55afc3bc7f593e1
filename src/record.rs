//! Positional, schema-bound records (§3).

use std::sync::Arc;

use crate::field_type::FieldType;
use crate::schema::Schema;

/// A decoded column value. One variant per [`FieldType`]; `Array` is always
/// array-of-`String`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Array(Vec<String>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Array(_) => FieldType::Array,
        }
    }
}

/// A value bound to one specific `Schema` version, with positional
/// put/get by field index (§3). Missing fields materialize as `None`
/// ("null" in the spec's vocabulary).
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    columns: Vec<Option<FieldValue>>,
}

impl Record {
    /// Allocate an all-null record bound to `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        let columns = vec![None; schema.len()];
        Self { schema, columns }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.columns.get(index).and_then(|v| v.as_ref())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        let index = self.schema.index_of(name)?;
        self.get(index)
    }

    /// Put `value` at `index`. Panics if `index` is out of bounds for the
    /// bound schema — callers always resolve the index via `Schema` first,
    /// so an out-of-bounds index is a programming error, not recoverable
    /// input.
    pub fn put(&mut self, index: usize, value: FieldValue) {
        self.columns[index] = Some(value);
    }

    pub fn put_by_name(&mut self, name: &str, value: FieldValue) -> bool {
        match self.schema.index_of(name) {
            Some(index) => {
                self.put(index, value);
                true
            }
            None => false,
        }
    }

    /// Rebuild this record against `new_schema`, copying every already
    /// populated column over by name (§4.G step 4: "Rebuild the Record
    /// against the canonical schema by copying each already-populated
    /// column by name"). `new_schema` must be a superset of the current
    /// schema.
    pub fn rebind(&self, new_schema: Arc<Schema>) -> Record {
        let mut rebuilt = Record::new(new_schema);
        for field in self.schema.fields() {
            if let Some(value) = self.get_by_name(&field.name).cloned() {
                rebuilt.put_by_name(&field.name, value);
            }
        }
        rebuilt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaField;

    fn schema(names_types: &[(&str, FieldType)]) -> Arc<Schema> {
        let mut s = Schema::empty();
        for (name, ty) in names_types {
            s = s.union(&[SchemaField::new(*name, *ty)]).unwrap();
        }
        Arc::new(s)
    }

    #[test]
    fn new_record_is_all_null() {
        let s = schema(&[("x", FieldType::Long), ("y", FieldType::String)]);
        let r = Record::new(s);
        assert!(r.get(0).is_none());
        assert!(r.get(1).is_none());
    }

    #[test]
    fn put_and_get_by_name() {
        let s = schema(&[("x", FieldType::Long)]);
        let mut r = Record::new(s);
        r.put_by_name("x", FieldValue::Long(42));
        assert_eq!(r.get_by_name("x"), Some(&FieldValue::Long(42)));
    }

    #[test]
    fn rebind_preserves_existing_values_and_nulls_new_columns() {
        let s1 = schema(&[("x", FieldType::Long), ("y", FieldType::String)]);
        let mut r = Record::new(s1);
        r.put_by_name("x", FieldValue::Long(1));
        r.put_by_name("y", FieldValue::String("hi".into()));

        let s2 = {
            let mut s = (*r.schema().clone()).clone();
            s = s
                .union(&[SchemaField::new("z", FieldType::Double)])
                .unwrap();
            Arc::new(s)
        };

        let rebound = r.rebind(s2);
        assert_eq!(rebound.get_by_name("x"), Some(&FieldValue::Long(1)));
        assert_eq!(
            rebound.get_by_name("y"),
            Some(&FieldValue::String("hi".into()))
        );
        assert!(rebound.get_by_name("z").is_none());
    }
}
