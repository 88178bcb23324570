//! Record construction: field checks, cross-field rules, and atomic commit.
//!
//! Construction order:
//! 1. Input must be an object
//! 2. Undeclared keys are rejected when the shape forbids extras
//! 3. Each field in declaration order: type check (lax or strict), declarative
//!    constraints, field hooks, then transform
//! 4. Absent fields take their default or are reported missing
//! 5. Cross-field rules, only once every field passed; first failure wins
//!
//! Either a complete [`Record`] is returned or nothing is.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::debug;

use super::constraints;
use super::errors::{RecordError, RecordResult, Violation, ViolationKind, ROOT_PATH};
use super::loader::ShapeLoader;
use super::types::{ExtraPolicy, FieldDef, FieldType, RecordShape};
use crate::record::{FieldValue, Record};

/// How many violations construction reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Stop at the first field violation
    #[default]
    FailFast,
    /// Report every field violation
    Collect,
}

impl ValidationMode {
    fn fail_fast(self) -> bool {
        self == ValidationMode::FailFast
    }
}

/// Constructs records for shapes registered in a loader.
pub struct RecordValidator<'a> {
    loader: &'a ShapeLoader,
    mode: ValidationMode,
}

impl<'a> RecordValidator<'a> {
    /// Creates a fail-fast validator backed by the given shape loader.
    pub fn new(loader: &'a ShapeLoader) -> Self {
        Self {
            loader,
            mode: ValidationMode::FailFast,
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Constructs a record of the named shape.
    ///
    /// # Errors
    ///
    /// - `UnknownShape` if no shape of that name is registered
    /// - `Invalid` carrying the violations otherwise
    pub fn construct(&self, shape_name: &str, input: &Value) -> RecordResult<Record> {
        let shape = self
            .loader
            .get(shape_name)
            .ok_or_else(|| RecordError::UnknownShape(shape_name.to_string()))?;
        construct_record(shape, input, self.mode)
    }
}

/// Constructs a record of `shape` from `input`.
pub fn construct_record(
    shape: &Arc<RecordShape>,
    input: &Value,
    mode: ValidationMode,
) -> RecordResult<Record> {
    match build(shape, input, mode) {
        Ok(record) => {
            debug!(shape = %shape.name, fields_set = record.fields_set().len(), "record constructed");
            Ok(record)
        }
        Err(violations) => {
            debug!(shape = %shape.name, violations = violations.len(), "record rejected");
            Err(RecordError::invalid(shape.name.clone(), violations))
        }
    }
}

/// Violation paths are relative to the record being built.
fn build(shape: &Arc<RecordShape>, input: &Value, mode: ValidationMode) -> Result<Record, Vec<Violation>> {
    let obj = input
        .as_object()
        .ok_or_else(|| vec![Violation::type_mismatch(ROOT_PATH, "object", json_type_name(input))])?;

    let mut violations = Vec::new();

    if shape.extra == ExtraPolicy::Forbid {
        for key in obj.keys() {
            if shape.field_def(key).is_none() {
                violations.push(Violation::extra_field(key.as_str()));
                if mode.fail_fast() {
                    return Err(violations);
                }
            }
        }
    }

    let mut values = Vec::with_capacity(shape.fields.len());
    let mut fields_set = BTreeSet::new();

    for field in &shape.fields {
        match obj.get(&field.name) {
            Some(raw) => match check_field(shape, field, raw, mode) {
                Ok(value) => {
                    // Supplying the default value leaves the field unset.
                    if field.default.as_ref() != Some(&value.to_json()) {
                        fields_set.insert(field.name.clone());
                    }
                    values.push((field.name.clone(), value));
                }
                Err(mut errs) => {
                    violations.append(&mut errs);
                    if mode.fail_fast() {
                        return Err(violations);
                    }
                }
            },
            None => match &field.default {
                Some(default) => values.push((field.name.clone(), FieldValue::Value(default.clone()))),
                None => {
                    violations.push(Violation::missing_field(field.name.as_str()));
                    if mode.fail_fast() {
                        return Err(violations);
                    }
                }
            },
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    let record = Record::from_parts(Arc::clone(shape), values, fields_set);

    for rule in shape.rules() {
        if let Err(message) = rule.check(&record) {
            return Err(vec![Violation::cross_field(rule.name(), message)]);
        }
    }

    Ok(record)
}

/// Checks one supplied field; returned violations are tagged with the field name.
fn check_field(
    shape: &RecordShape,
    field: &FieldDef,
    raw: &Value,
    mode: ValidationMode,
) -> Result<FieldValue, Vec<Violation>> {
    let tag = |v: Violation| v.nested_under(&field.name);

    if raw.is_null() {
        if field.nullable {
            return Ok(FieldValue::Value(Value::Null));
        }
        return Err(vec![tag(Violation::type_mismatch(
            ROOT_PATH,
            field.field_type.type_name(),
            "null",
        ))]);
    }

    let value = coerce(&field.field_type, raw, field.strict, mode)
        .map_err(|errs| errs.into_iter().map(tag).collect::<Vec<_>>())?;

    let mut violations = Vec::new();
    for constraint in &field.constraints {
        if let Err(v) = constraints::check(constraint, &value) {
            violations.push(tag(v));
            if mode.fail_fast() {
                return Err(violations);
            }
        }
    }
    if !violations.is_empty() {
        return Err(violations);
    }

    for hook in shape.hooks_for(&field.name) {
        if let Err(message) = hook.check(&value) {
            return Err(vec![tag(Violation::new(
                ViolationKind::Custom,
                ROOT_PATH,
                format!("{} (hook '{}')", message, hook.name()),
            ))]);
        }
    }

    Ok(match field.transform {
        Some(transform) => transform.apply(value),
        None => value,
    })
}

/// Interprets `raw` as `ty`; violation paths are relative to `raw`.
fn coerce(
    ty: &FieldType,
    raw: &Value,
    strict: bool,
    mode: ValidationMode,
) -> Result<FieldValue, Vec<Violation>> {
    let mismatch = || vec![Violation::type_mismatch(ROOT_PATH, ty.type_name(), json_type_name(raw))];

    match ty {
        FieldType::Any => Ok(FieldValue::Value(raw.clone())),
        FieldType::String => match raw {
            Value::String(_) => Ok(FieldValue::Value(raw.clone())),
            _ => Err(mismatch()),
        },
        FieldType::Int => coerce_int(raw, strict).map(FieldValue::Value).ok_or_else(mismatch),
        FieldType::Float => coerce_float(raw, strict).map(FieldValue::Value).ok_or_else(mismatch),
        FieldType::Bool => coerce_bool(raw, strict)
            .map(|b| FieldValue::Value(Value::Bool(b)))
            .ok_or_else(mismatch),
        FieldType::List { element_type } => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(items.len());
            let mut violations = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match coerce(element_type, item, strict, mode) {
                    Ok(v) => out.push(v),
                    Err(errs) => {
                        let index = format!("[{}]", i);
                        violations.extend(errs.into_iter().map(|v| v.nested_under(&index)));
                        if mode.fail_fast() {
                            return Err(violations);
                        }
                    }
                }
            }
            if violations.is_empty() {
                Ok(FieldValue::List(out))
            } else {
                Err(violations)
            }
        }
        FieldType::Map { value_type } => {
            let entries = raw.as_object().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(entries.len());
            let mut violations = Vec::new();
            for (key, item) in entries {
                match coerce(value_type, item, strict, mode) {
                    Ok(v) => out.push((key.clone(), v)),
                    Err(errs) => {
                        violations.extend(errs.into_iter().map(|v| v.nested_under(key)));
                        if mode.fail_fast() {
                            return Err(violations);
                        }
                    }
                }
            }
            if violations.is_empty() {
                Ok(FieldValue::Map(out))
            } else {
                Err(violations)
            }
        }
        FieldType::Record { shape } => build(shape, raw, mode).map(FieldValue::Record),
    }
}

fn coerce_int(raw: &Value, strict: bool) -> Option<Value> {
    if raw.is_i64() {
        return Some(raw.clone());
    }
    // Larger than i64::MAX.
    if raw.is_u64() {
        return None;
    }
    if strict {
        return None;
    }
    match raw {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_float(raw: &Value, strict: bool) -> Option<Value> {
    if strict {
        return raw.is_f64().then(|| raw.clone());
    }
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn coerce_bool(raw: &Value, strict: bool) -> Option<bool> {
    if let Value::Bool(b) = raw {
        return Some(*b);
    }
    if strict {
        return None;
    }
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Constraint, Transform};
    use serde_json::json;

    fn person() -> Arc<RecordShape> {
        RecordShape::new("person")
            .field(FieldDef::string("name").length(2, 50))
            .field(FieldDef::int("age").gt(0.0).lt(150.0))
            .field(FieldDef::float("weight").gt(0.0).lt(300.0).strict())
            .field(FieldDef::bool("married").with_default(json!(false)))
            .field(FieldDef::list("allergies", FieldType::String).optional())
            .into_shared()
    }

    fn construct(input: Value) -> RecordResult<Record> {
        construct_record(&person(), &input, ValidationMode::FailFast)
    }

    fn first(err: RecordError) -> Violation {
        err.first_violation().cloned().unwrap()
    }

    #[test]
    fn test_valid_input_keeps_values() {
        let record = construct(json!({"name": "Sohom", "age": 21, "weight": 70.5})).unwrap();
        assert_eq!(record.get_str("name"), Some("Sohom"));
        assert_eq!(record.get_i64("age"), Some(21));
        assert_eq!(record.get_f64("weight"), Some(70.5));
        assert_eq!(record.get_bool("married"), Some(false));
        assert!(record.get("allergies").unwrap().is_null());
    }

    #[test]
    fn test_root_must_be_object() {
        let v = first(construct(json!(["not", "an", "object"])).unwrap_err());
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert_eq!(v.path, ROOT_PATH);
    }

    #[test]
    fn test_each_age_bound_reports_range_violation() {
        for age in [0, -3, 150, 200] {
            let v = first(construct(json!({"name": "Sohom", "age": age, "weight": 70.5})).unwrap_err());
            assert_eq!(v.kind, ViolationKind::RangeViolation, "age {}", age);
            assert_eq!(v.path, "age");
        }
        let v = first(construct(json!({"name": "Sohom", "age": 0, "weight": 70.5})).unwrap_err());
        assert!(v.message.contains("greater than 0"));
        let v = first(construct(json!({"name": "Sohom", "age": 150, "weight": 70.5})).unwrap_err());
        assert!(v.message.contains("less than 150"));
    }

    #[test]
    fn test_strict_float_rejects_string_and_int() {
        for weight in [json!("70.5"), json!(70)] {
            let v = first(construct(json!({"name": "Sohom", "age": 21, "weight": weight})).unwrap_err());
            assert_eq!(v.kind, ViolationKind::TypeMismatch);
            assert_eq!(v.path, "weight");
        }
    }

    #[test]
    fn test_lax_int_coerces_numeric_string_and_integral_float() {
        let record = construct(json!({"name": "Sohom", "age": "21", "weight": 70.5})).unwrap();
        assert_eq!(record.get_i64("age"), Some(21));

        let record = construct(json!({"name": "Sohom", "age": 21.0, "weight": 70.5})).unwrap();
        assert_eq!(record.get_i64("age"), Some(21));

        let v = first(construct(json!({"name": "Sohom", "age": 21.5, "weight": 70.5})).unwrap_err());
        assert_eq!(v.kind, ViolationKind::TypeMismatch);

        let v = first(construct(json!({"name": "Sohom", "age": "twenty", "weight": 70.5})).unwrap_err());
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_int_beyond_i64_rejected() {
        for age in [json!(u64::MAX), json!(i64::MAX as u64 + 1)] {
            let v = first(construct(json!({"name": "Sohom", "age": age, "weight": 70.5})).unwrap_err());
            assert_eq!(v.kind, ViolationKind::TypeMismatch);
            assert_eq!(v.path, "age");
        }

        let shape = RecordShape::new("counter")
            .field(FieldDef::int("count").strict())
            .into_shared();
        let err = construct_record(&shape, &json!({"count": u64::MAX}), ValidationMode::FailFast)
            .unwrap_err();
        assert_eq!(first(err).kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_supplied_default_value_stays_unset() {
        let record = construct(json!({"name": "Sohom", "age": 21, "weight": 70.5, "married": false})).unwrap();
        assert!(!record.is_set("married"));

        let record = construct(json!({"name": "Sohom", "age": 21, "weight": 70.5, "married": "yes"})).unwrap();
        assert!(record.is_set("married"));
        assert!(record.is_set("name"));
    }

    #[test]
    fn test_lax_float_stores_float() {
        let shape = RecordShape::new("h")
            .field(FieldDef::float("height"))
            .into_shared();
        let record = construct_record(&shape, &json!({"height": 175}), ValidationMode::FailFast).unwrap();
        assert_eq!(record.get("height"), Some(&FieldValue::Value(json!(175.0))));
    }

    #[test]
    fn test_lax_bool_coercion() {
        let shape = RecordShape::new("b").field(FieldDef::bool("flag")).into_shared();
        for (input, expected) in [(json!("yes"), true), (json!(0), false), (json!("False"), false)] {
            let record = construct_record(&shape, &json!({ "flag": input }), ValidationMode::FailFast).unwrap();
            assert_eq!(record.get_bool("flag"), Some(expected));
        }
        assert!(construct_record(&shape, &json!({"flag": 2}), ValidationMode::FailFast).is_err());
    }

    #[test]
    fn test_strings_never_coerce() {
        let v = first(construct(json!({"name": 42, "age": 21, "weight": 70.5})).unwrap_err());
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert!(v.message.contains("string"));
    }

    #[test]
    fn test_null_only_for_nullable() {
        let v = first(construct(json!({"name": null, "age": 21, "weight": 70.5})).unwrap_err());
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert!(v.message.contains("null"));

        assert!(construct(json!({"name": "Sohom", "age": 21, "weight": 70.5, "allergies": null})).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let v = first(construct(json!({"name": "Sohom", "weight": 70.5})).unwrap_err());
        assert_eq!(v.kind, ViolationKind::MissingRequiredField);
        assert_eq!(v.path, "age");
    }

    #[test]
    fn test_nullable_without_default_is_required() {
        let shape = RecordShape::new("n")
            .field(FieldDef::string("nickname").nullable())
            .into_shared();
        let err = construct_record(&shape, &json!({}), ValidationMode::FailFast).unwrap_err();
        assert_eq!(first(err).kind, ViolationKind::MissingRequiredField);
        assert!(construct_record(&shape, &json!({"nickname": null}), ValidationMode::FailFast).is_ok());
    }

    #[test]
    fn test_list_element_paths() {
        let v = first(
            construct(json!({"name": "Sohom", "age": 21, "weight": 70.5, "allergies": ["dust", 3]}))
                .unwrap_err(),
        );
        assert_eq!(v.path, "allergies[1]");
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_fail_fast_reports_one_violation() {
        let err = construct(json!({"name": "S", "age": 0})).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].path, "name");
    }

    #[test]
    fn test_collect_reports_every_violation() {
        let err = construct_record(
            &person(),
            &json!({"name": "S", "age": 0, "allergies": [1, 2]}),
            ValidationMode::Collect,
        )
        .unwrap_err();

        let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "age", "weight", "allergies[0]", "allergies[1]"]);
    }

    #[test]
    fn test_extra_fields_ignored_by_default() {
        let record = construct(json!({"name": "Sohom", "age": 21, "weight": 70.5, "team": "x"})).unwrap();
        assert!(record.get("team").is_none());
    }

    #[test]
    fn test_extra_fields_forbidden() {
        let shape = RecordShape::new("closed")
            .field(FieldDef::string("name"))
            .forbid_extra()
            .into_shared();
        let err = construct_record(&shape, &json!({"name": "a", "team": "x"}), ValidationMode::FailFast)
            .unwrap_err();
        let v = first(err);
        assert_eq!(v.kind, ViolationKind::UnknownField);
        assert_eq!(v.path, "team");
    }

    #[test]
    fn test_transform_runs_after_checks() {
        let shape = RecordShape::new("t")
            .field(
                FieldDef::string("code")
                    .constraint(Constraint::Pattern("^[a-z]+$".into()))
                    .transform(Transform::Uppercase),
            )
            .into_shared();
        let record = construct_record(&shape, &json!({"code": "abc"}), ValidationMode::FailFast).unwrap();
        assert_eq!(record.get_str("code"), Some("ABC"));

        // The pattern sees the raw input, so an already upper-case value fails.
        assert!(construct_record(&shape, &json!({"code": "ABC"}), ValidationMode::FailFast).is_err());
    }

    #[test]
    fn test_field_hook_failure_is_custom() {
        let shape = RecordShape::new("h")
            .field(FieldDef::string("username"))
            .field_hook("username", "no_spaces", |v| match v.as_str() {
                Some(s) if s.contains(' ') => Err("must not contain spaces".into()),
                _ => Ok(()),
            })
            .into_shared();

        assert!(construct_record(&shape, &json!({"username": "alice"}), ValidationMode::FailFast).is_ok());
        let v = first(
            construct_record(&shape, &json!({"username": "a b"}), ValidationMode::FailFast).unwrap_err(),
        );
        assert_eq!(v.kind, ViolationKind::Custom);
        assert!(v.message.contains("no_spaces"));
    }

    #[test]
    fn test_rules_run_in_order_and_first_failure_wins() {
        let shape = RecordShape::new("r")
            .field(FieldDef::int("n"))
            .rule("positive", |r| {
                if r.get_i64("n").unwrap_or(0) > 0 { Ok(()) } else { Err("n must be positive".into()) }
            })
            .rule("even", |r| {
                if r.get_i64("n").unwrap_or(0) % 2 == 0 { Ok(()) } else { Err("n must be even".into()) }
            })
            .into_shared();

        let err = construct_record(&shape, &json!({"n": -1}), ValidationMode::Collect).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(err.violations()[0].message.contains("positive"));

        let err = construct_record(&shape, &json!({"n": 3}), ValidationMode::FailFast).unwrap_err();
        assert_eq!(first(err).kind, ViolationKind::CrossFieldViolation);

        assert!(construct_record(&shape, &json!({"n": 4}), ValidationMode::FailFast).is_ok());
    }

    #[test]
    fn test_rules_skipped_when_fields_fail() {
        let shape = RecordShape::new("r")
            .field(FieldDef::int("n"))
            .rule("never", |_| Err("should not run".into()))
            .into_shared();
        let err = construct_record(&shape, &json!({"n": "x"}), ValidationMode::Collect).unwrap_err();
        assert_eq!(first(err).kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_nested_record_errors_carry_path() {
        let address = RecordShape::new("address")
            .field(FieldDef::string("city"))
            .field(FieldDef::string("pin"))
            .into_shared();
        let shape = RecordShape::new("resident")
            .field(FieldDef::record("address", address))
            .into_shared();

        let v = first(
            construct_record(&shape, &json!({"address": {"city": "Durgapur"}}), ValidationMode::FailFast)
                .unwrap_err(),
        );
        assert_eq!(v.path, "address.pin");
        assert_eq!(v.kind, ViolationKind::MissingRequiredField);

        let v = first(
            construct_record(&shape, &json!({"address": "Durgapur"}), ValidationMode::FailFast).unwrap_err(),
        );
        assert_eq!(v.path, "address");
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_validator_resolves_shape_by_name() {
        let mut loader = ShapeLoader::in_memory();
        loader.register_shared(person()).unwrap();
        let validator = RecordValidator::new(&loader);

        assert!(validator
            .construct("person", &json!({"name": "Sohom", "age": 21, "weight": 70.5}))
            .is_ok());
        assert!(matches!(
            validator.construct("ghost", &json!({})),
            Err(RecordError::UnknownShape(_))
        ));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let input = json!({"name": "S", "age": 0, "weight": "x"});
        let first_run = construct_record(&person(), &input, ValidationMode::Collect).unwrap_err();
        for _ in 0..50 {
            let again = construct_record(&person(), &input, ValidationMode::Collect).unwrap_err();
            assert_eq!(again.violations(), first_run.violations());
        }
    }
}
