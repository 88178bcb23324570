//! Record shape subsystem
//!
//! Shapes are declared once, then enforced at construction time.
//!
//! # Design Principles
//!
//! - Constraints are data, interpreted by one generic checker
//! - Hooks, cross-field rules and computed fields are plain functions
//!   registered on the shape, iterated in order
//! - Coercion is an explicit per-field `strict` flag
//! - Construction is atomic: a valid record or a list of violations
//! - Deterministic validation

mod constraints;
mod errors;
mod formats;
mod loader;
mod rules;
mod types;
mod validator;

pub use constraints::check as check_constraint;
pub use errors::{RecordError, RecordResult, Violation, ViolationKind, ROOT_PATH};
pub use formats::{check_email, check_http_url, email_domain};
pub use loader::ShapeLoader;
pub use rules::{finite_number, round_to, ComputedField, CrossFieldRule, FieldHook};
pub use types::{Constraint, ExtraPolicy, FieldDef, FieldType, RecordShape, Transform};
pub use validator::{construct_record, json_type_name, RecordValidator, ValidationMode};
