//! Built-in record shapes
//!
//! - `patient`: typed name and age
//! - `patient_profile`: length, range, email, URL and strict-float constraints
//! - `screened_patient`: domain allow-list, upper-cased name, emergency rule, BMI
//! - `address` / `resident_patient`: nested record
//! - `user`: optional fields, used for unset-only dumps

mod patient;
mod user;

pub use patient::{
    address, bmi, check_emergency_contact, patient, patient_profile, resident_patient,
    screened_patient, ALLOWED_EMAIL_DOMAINS, EMERGENCY_CONTACT_AGE,
};
pub use user::user;

use crate::schema::{RecordResult, RecordShape, ShapeLoader};

/// Every built-in shape, in registration order.
pub fn builtin_shapes() -> Vec<RecordShape> {
    vec![
        patient(),
        patient_profile(),
        screened_patient(),
        address(),
        resident_patient(),
        user(),
    ]
}

/// Registers every built-in shape.
pub fn register_builtin(loader: &mut ShapeLoader) -> RecordResult<()> {
    for shape in builtin_shapes() {
        loader.register(shape)?;
    }
    Ok(())
}
