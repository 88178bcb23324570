//! Patient record shapes.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::record::Record;
use crate::schema::{finite_number, round_to, Constraint, FieldDef, FieldType, RecordShape, Transform};

/// Email domains accepted by [`screened_patient`].
pub const ALLOWED_EMAIL_DOMAINS: [&str; 2] = ["hdfc.com", "icici.com"];

/// Age above which an emergency contact is mandatory.
pub const EMERGENCY_CONTACT_AGE: i64 = 60;

/// Name and age only.
pub fn patient() -> RecordShape {
    RecordShape::new("patient")
        .with_description("Basic patient with typed name and age")
        .field(FieldDef::string("name"))
        .field(FieldDef::int("age"))
}

/// Patient with per-field constraints, defaults and optional fields.
pub fn patient_profile() -> RecordShape {
    RecordShape::new("patient_profile")
        .with_description("Patient with field-level constraints")
        .field(
            FieldDef::string("name")
                .length(2, 50)
                .title("Name of the patient")
                .description("This is the name of the patient"),
        )
        .field(FieldDef::string("email").constraint(Constraint::Email))
        .field(FieldDef::string("linkedin_url").constraint(Constraint::Url))
        .field(FieldDef::int("age").gt(0.0).lt(150.0))
        .field(FieldDef::float("weight").gt(0.0).lt(300.0).strict())
        .field(FieldDef::bool("married").with_default(json!(false)))
        .field(FieldDef::list("allergies", FieldType::String).optional())
        .field(FieldDef::map("contact_details", FieldType::String))
}

/// Patient with an email domain allow-list, upper-cased name, an
/// emergency-contact rule and a computed BMI.
pub fn screened_patient() -> RecordShape {
    RecordShape::new("screened_patient")
        .with_description("Patient with domain checks, a cross-field rule and computed BMI")
        .field(FieldDef::string("name").transform(Transform::Uppercase))
        .field(
            FieldDef::string("email")
                .constraint(Constraint::Email)
                .constraint(Constraint::AllowedDomains(
                    ALLOWED_EMAIL_DOMAINS.iter().map(|d| d.to_string()).collect(),
                )),
        )
        .field(FieldDef::string("linkedin_url").constraint(Constraint::Url))
        .field(FieldDef::int("age"))
        .field(FieldDef::float("weight"))
        .field(FieldDef::float("height").gt(0.0))
        .field(FieldDef::bool("married").with_default(json!(false)))
        .field(FieldDef::list("allergies", FieldType::String))
        .field(FieldDef::map("contact_details", FieldType::String))
        .rule("emergency_contact", check_emergency_contact)
        .computed("bmi", bmi)
}

/// Patients above [`EMERGENCY_CONTACT_AGE`] need an `emergency` contact.
pub fn check_emergency_contact(record: &Record) -> Result<(), String> {
    let age = record
        .get_i64("age")
        .ok_or_else(|| "age is not an integer".to_string())?;
    let has_emergency = record
        .get("contact_details")
        .is_some_and(|c| c.contains_key("emergency"));
    if age > EMERGENCY_CONTACT_AGE && !has_emergency {
        return Err(format!(
            "Emergency contact is required for patients above {}",
            EMERGENCY_CONTACT_AGE
        ));
    }
    Ok(())
}

/// weight (kg) / height (m)^2, two decimals; height is stored in centimetres.
pub fn bmi(record: &Record) -> Result<Value, String> {
    let weight = record
        .get_f64("weight")
        .ok_or_else(|| "weight is not a number".to_string())?;
    let height_cm = record
        .get_f64("height")
        .ok_or_else(|| "height is not a number".to_string())?;
    if height_cm == 0.0 {
        return Err("height must not be zero".into());
    }
    let height_m = height_cm / 100.0;
    finite_number(round_to(weight / (height_m * height_m), 2))
}

pub fn address() -> RecordShape {
    RecordShape::new("address")
        .field(FieldDef::string("city"))
        .field(FieldDef::string("state"))
        .field(FieldDef::string("pin"))
}

/// Patient with a nested address record.
pub fn resident_patient() -> RecordShape {
    RecordShape::new("resident_patient")
        .with_description("Patient with a nested address")
        .field(FieldDef::string("name"))
        .field(FieldDef::string("gender"))
        .field(FieldDef::int("age"))
        .field(FieldDef::record("address", Arc::new(address())))
}
