//! Validated record instances
//!
//! A [`Record`] only exists once construction succeeded: every required field
//! holds a value satisfying its constraints and every cross-field rule held.
//! Records expose no setters; [`Record::updated`] builds a new instance.

mod dump;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::schema::{
    construct_record, json_type_name, RecordError, RecordResult, RecordShape, ValidationMode,
    Violation, ROOT_PATH,
};

pub use dump::{DumpOptions, Selection};

/// A stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar, null, or an unchecked JSON value
    Value(Value),
    /// Nested record, validated against its own shape
    Record(Record),
    List(Vec<FieldValue>),
    /// String-keyed entries in input order
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Value(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Value(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Value(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Value(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a key in a map value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Value(Value::Null))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Value(v) => json_type_name(v),
            FieldValue::Record(_) => "record",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    /// Plain JSON form, nested records included in full.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Value(v) => v.clone(),
            FieldValue::Record(r) => r.to_value(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// A validated instance of a [`RecordShape`].
#[derive(Debug, Clone)]
pub struct Record {
    shape: Arc<RecordShape>,
    values: Vec<(String, FieldValue)>,
    /// Fields explicitly supplied at construction
    fields_set: BTreeSet<String>,
}

impl Record {
    pub(crate) fn from_parts(
        shape: Arc<RecordShape>,
        values: Vec<(String, FieldValue)>,
        fields_set: BTreeSet<String>,
    ) -> Self {
        Self {
            shape,
            values,
            fields_set,
        }
    }

    /// Constructs a record in fail-fast mode.
    pub fn from_value(shape: &Arc<RecordShape>, input: &Value) -> RecordResult<Self> {
        construct_record(shape, input, ValidationMode::FailFast)
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn shape_name(&self) -> &str {
        &self.shape.name
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(FieldValue::as_record)
    }

    /// Field values in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fields_set(&self) -> &BTreeSet<String> {
        &self.fields_set
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields_set.contains(name)
    }

    /// Evaluates a computed field. Not cached: every call recomputes.
    pub fn computed(&self, name: &str) -> RecordResult<Value> {
        let field = self.shape.computed_field(name).ok_or_else(|| {
            RecordError::UnknownComputedField {
                shape: self.shape.name.clone(),
                field: name.to_string(),
            }
        })?;
        field.evaluate(self).map_err(|reason| RecordError::ComputeFailed {
            field: name.to_string(),
            reason,
        })
    }

    /// Every declared field as JSON, without computed fields.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Builds a new record from this one's set fields overlaid with `patch`.
    ///
    /// The result goes through full validation; `self` is untouched.
    pub fn updated(&self, patch: &Value) -> RecordResult<Self> {
        let patch = patch.as_object().ok_or_else(|| {
            RecordError::invalid(
                self.shape.name.clone(),
                vec![Violation::type_mismatch(ROOT_PATH, "object", json_type_name(patch))],
            )
        })?;

        let mut input: Map<String, Value> = self
            .values
            .iter()
            .filter(|(k, _)| self.fields_set.contains(k))
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        for (k, v) in patch {
            input.insert(k.clone(), v.clone());
        }

        construct_record(&self.shape, &Value::Object(input), ValidationMode::FailFast)
    }
}

/// Records compare by shape name and field values; the unset marker is ignored.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.shape.name == other.shape.name && self.values == other.values
    }
}
