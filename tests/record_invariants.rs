//! Record Construction Invariant Tests
//!
//! - Valid input is stored unchanged apart from declared transforms
//! - A single violated bound names its field
//! - Cross-field rules run after field checks
//! - Computed values derive from stored fields on every access
//! - Email domains are checked against the allow-list

use recordshape::catalog::{self, bmi, patient_profile, screened_patient};
use recordshape::record::Record;
use recordshape::schema::{
    construct_record, FieldDef, RecordError, RecordShape, RecordValidator, ShapeLoader,
    ValidationMode, ViolationKind,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn registry() -> ShapeLoader {
    let mut loader = ShapeLoader::in_memory();
    catalog::register_builtin(&mut loader).unwrap();
    loader
}

fn profile_input() -> Value {
    json!({
        "name": "Nitish",
        "email": "nitish@example.com",
        "linkedin_url": "https://linkedin.com/in/nitish",
        "age": 30,
        "weight": 75.2,
        "married": true,
        "allergies": ["pollen"],
        "contact_details": {"phone": "2353462"}
    })
}

fn screened_input(age: i64, email: &str, contact: Value) -> Value {
    json!({
        "name": "Sohom",
        "email": email,
        "linkedin_url": "https://linkedin.com/in/sohom",
        "age": age,
        "weight": 70.5,
        "height": 175,
        "allergies": ["pollen", "dust"],
        "contact_details": contact
    })
}

fn screened(input: &Value) -> Result<Record, RecordError> {
    construct_record(&screened_patient().into_shared(), input, ValidationMode::FailFast)
}

// =============================================================================
// Valid Input Tests
// =============================================================================

/// Every supplied value is stored as given.
#[test]
fn test_valid_input_passes_through() {
    let record = registry()
        .get("patient_profile")
        .map(|shape| Record::from_value(shape, &profile_input()))
        .unwrap()
        .unwrap();

    assert_eq!(record.to_value(), profile_input());
}

/// The upper-case transform runs exactly once, after the checks.
#[test]
fn test_transform_applied_once() {
    let record = screened(&screened_input(30, "sohom@hdfc.com", json!({}))).unwrap();
    assert_eq!(record.get_str("name"), Some("SOHOM"));

    let rebuilt = screened(&record.to_value()).unwrap();
    assert_eq!(rebuilt.get_str("name"), Some("SOHOM"));
}

/// Absent fields with defaults take the default.
#[test]
fn test_defaults_fill_absent_fields() {
    let mut input = profile_input();
    input.as_object_mut().unwrap().remove("married");
    input.as_object_mut().unwrap().remove("allergies");

    let shape = patient_profile().into_shared();
    let record = Record::from_value(&shape, &input).unwrap();
    assert_eq!(record.get_bool("married"), Some(false));
    assert!(record.get("allergies").unwrap().is_null());
    assert!(!record.is_set("married"));
}

// =============================================================================
// Range Tests
// =============================================================================

/// Each violated bound is reported as a range violation on that field.
#[test]
fn test_single_bound_violation_names_field() {
    let cases = [
        ("age", json!(0)),
        ("age", json!(150)),
        ("weight", json!(0.0)),
        ("weight", json!(300.5)),
    ];
    let shape = patient_profile().into_shared();

    for (field, bad) in cases {
        let mut input = profile_input();
        input[field] = bad.clone();

        let err = Record::from_value(&shape, &input).unwrap_err();
        let violation = err.first_violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::RangeViolation, "{} = {}", field, bad);
        assert_eq!(violation.path, field);
        assert_eq!(err.violations().len(), 1);
    }
}

/// Strict float fields refuse integers.
#[test]
fn test_strict_weight_rejects_integer() {
    let mut input = profile_input();
    input["weight"] = json!(75);
    let err = Record::from_value(&patient_profile().into_shared(), &input).unwrap_err();
    assert_eq!(err.first_violation().unwrap().kind, ViolationKind::TypeMismatch);
}

// =============================================================================
// Cross-Field Rule Tests
// =============================================================================

/// Patients over 60 without an emergency contact are rejected.
#[test]
fn test_emergency_contact_required_above_sixty() {
    let err = screened(&screened_input(65, "sohom@hdfc.com", json!({"phone": "123"}))).unwrap_err();
    let violation = err.first_violation().unwrap();
    assert_eq!(violation.kind, ViolationKind::CrossFieldViolation);
    assert_eq!(violation.path, "$root");
}

/// An emergency contact satisfies the rule.
#[test]
fn test_emergency_contact_accepted() {
    let record = screened(&screened_input(
        65,
        "sohom@hdfc.com",
        json!({"phone": "123", "emergency": "987"}),
    ))
    .unwrap();
    assert_eq!(record.get_i64("age"), Some(65));
}

/// Rules do not run while field violations exist.
#[test]
fn test_rules_skipped_on_field_failure() {
    let err = screened(&screened_input(65, "sohom@gmail.com", json!({"phone": "123"}))).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.first_violation().unwrap().kind, ViolationKind::DomainNotAllowed);
}

// =============================================================================
// Computed Field Tests
// =============================================================================

/// bmi = 70.5 / 1.75^2 rounded to two decimals.
#[test]
fn test_bmi_computed_from_centimetres() {
    let record = screened(&screened_input(30, "sohom@hdfc.com", json!({}))).unwrap();
    assert_eq!(record.computed("bmi").unwrap(), json!(23.02));
    // Recomputed, same answer.
    assert_eq!(record.computed("bmi").unwrap(), json!(23.02));
}

/// Unknown computed names are an error, not a panic.
#[test]
fn test_unknown_computed_field() {
    let record = screened(&screened_input(30, "sohom@hdfc.com", json!({}))).unwrap();
    let err = record.computed("waist").unwrap_err();
    assert_eq!(err.code(), "RECORD_UNKNOWN_COMPUTED_FIELD");
}

/// A degenerate height surfaces as ComputeFailed on access, not at construction.
#[test]
fn test_bmi_with_zero_height_fails_on_access() {
    let shape = RecordShape::new("unchecked_body")
        .field(FieldDef::float("weight"))
        .field(FieldDef::float("height"))
        .computed("bmi", bmi)
        .into_shared();
    let record = construct_record(
        &shape,
        &json!({"weight": 70.5, "height": 0}),
        ValidationMode::FailFast,
    )
    .unwrap();

    match record.computed("bmi").unwrap_err() {
        RecordError::ComputeFailed { field, reason } => {
            assert_eq!(field, "bmi");
            assert!(reason.contains("height must not be zero"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Email Domain Tests
// =============================================================================

/// Allow-listed domains pass, others fail with DomainNotAllowed.
#[test]
fn test_email_domain_allow_list() {
    assert!(screened(&screened_input(30, "a@hdfc.com", json!({}))).is_ok());
    assert!(screened(&screened_input(30, "a@icici.com", json!({}))).is_ok());

    let err = screened(&screened_input(30, "a@gmail.com", json!({}))).unwrap_err();
    let violation = err.first_violation().unwrap();
    assert_eq!(violation.kind, ViolationKind::DomainNotAllowed);
    assert_eq!(violation.path, "email");
}

// =============================================================================
// Reporting Mode Tests
// =============================================================================

/// Collect mode reports every field violation, fail-fast only the first.
#[test]
fn test_collect_mode_reports_all() {
    let loader = registry();
    let input = json!({"name": "N", "email": "nope", "linkedin_url": "ftp://x", "age": 200, "weight": 75.0, "contact_details": {}});

    let fail_fast = RecordValidator::new(&loader)
        .construct("patient_profile", &input)
        .unwrap_err();
    assert_eq!(fail_fast.violations().len(), 1);

    let collected = RecordValidator::new(&loader)
        .with_mode(ValidationMode::Collect)
        .construct("patient_profile", &input)
        .unwrap_err();
    let paths: Vec<&str> = collected.violations().iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, vec!["name", "email", "linkedin_url", "age"]);
}

/// Nested violations carry the nested path.
#[test]
fn test_nested_violation_path() {
    let err = RecordValidator::new(&registry())
        .construct(
            "resident_patient",
            &json!({"name": "N", "gender": "f", "age": 3, "address": {"city": "Pune", "state": 5, "pin": "411001"}}),
        )
        .unwrap_err();
    assert_eq!(err.first_violation().unwrap().path, "address.state");
}
