//! Field hooks, cross-field rules and computed fields
//!
//! All three are pure functions registered on a shape at definition time.
//! They are iterated in registration order; nothing is looked up by name
//! during construction.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::record::{FieldValue, Record};

pub type FieldCheckFn = dyn Fn(&FieldValue) -> Result<(), String> + Send + Sync;
pub type RuleFn = dyn Fn(&Record) -> Result<(), String> + Send + Sync;
pub type ComputeFn = dyn Fn(&Record) -> Result<Value, String> + Send + Sync;

/// A named check bound to one field.
#[derive(Clone)]
pub struct FieldHook {
    field: String,
    name: String,
    check: Arc<FieldCheckFn>,
}

impl FieldHook {
    pub fn new(field: &str, name: &str, check: Arc<FieldCheckFn>) -> Self {
        Self {
            field: field.to_string(),
            name: name.to_string(),
            check,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &FieldValue) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for FieldHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHook")
            .field("field", &self.field)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named predicate over a field-validated record.
#[derive(Clone)]
pub struct CrossFieldRule {
    name: String,
    check: Arc<RuleFn>,
}

impl CrossFieldRule {
    pub fn new(name: &str, check: Arc<RuleFn>) -> Self {
        Self {
            name: name.to_string(),
            check,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, record: &Record) -> Result<(), String> {
        (self.check)(record)
    }
}

impl fmt::Debug for CrossFieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A read-only derived value. Never stored, never cached.
#[derive(Clone)]
pub struct ComputedField {
    name: String,
    compute: Arc<ComputeFn>,
}

impl ComputedField {
    pub fn new(name: &str, compute: Arc<ComputeFn>) -> Self {
        Self {
            name: name.to_string(),
            compute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, record: &Record) -> Result<Value, String> {
        (self.compute)(record)
    }
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Wraps a finite float as a JSON number.
pub fn finite_number(value: f64) -> Result<Value, String> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| format!("result {} is not a finite number", value))
}
