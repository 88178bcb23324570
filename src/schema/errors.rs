//! Record error types
//!
//! Error codes:
//! - RECORD_TYPE_MISMATCH
//! - RECORD_RANGE_VIOLATION
//! - RECORD_FORMAT_VIOLATION
//! - RECORD_DOMAIN_NOT_ALLOWED
//! - RECORD_NOT_ONE_OF
//! - RECORD_MISSING_REQUIRED_FIELD
//! - RECORD_UNKNOWN_FIELD
//! - RECORD_CROSS_FIELD_VIOLATION
//! - RECORD_CUSTOM_VIOLATION

use std::fmt;

use thiserror::Error;

/// Path used for violations that concern the whole record.
pub const ROOT_PATH: &str = "$root";

/// The kind of constraint a value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Value cannot be read as the declared type
    TypeMismatch,
    /// Numeric value or length outside configured bounds
    RangeViolation,
    /// Malformed email, URL or pattern mismatch
    FormatViolation,
    /// Email domain not in the allow-list
    DomainNotAllowed,
    /// Value is not one of the enumerated options
    NotOneOf,
    /// Required field absent and no default declared
    MissingRequiredField,
    /// Input key not declared by a shape that forbids extras
    UnknownField,
    /// A whole-record rule failed
    CrossFieldViolation,
    /// A registered field hook rejected the value
    Custom,
}

impl ViolationKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::TypeMismatch => "RECORD_TYPE_MISMATCH",
            ViolationKind::RangeViolation => "RECORD_RANGE_VIOLATION",
            ViolationKind::FormatViolation => "RECORD_FORMAT_VIOLATION",
            ViolationKind::DomainNotAllowed => "RECORD_DOMAIN_NOT_ALLOWED",
            ViolationKind::NotOneOf => "RECORD_NOT_ONE_OF",
            ViolationKind::MissingRequiredField => "RECORD_MISSING_REQUIRED_FIELD",
            ViolationKind::UnknownField => "RECORD_UNKNOWN_FIELD",
            ViolationKind::CrossFieldViolation => "RECORD_CROSS_FIELD_VIOLATION",
            ViolationKind::Custom => "RECORD_CUSTOM_VIOLATION",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single rejected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Field path (e.g., "address.city", "allergies[1]")
    pub path: String,
    /// Human-readable reason
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &str, actual: &str) -> Self {
        Self::new(
            ViolationKind::TypeMismatch,
            path,
            format!("Input should be a valid {}, got {}", expected, actual),
        )
    }

    pub fn missing_field(path: impl Into<String>) -> Self {
        Self::new(ViolationKind::MissingRequiredField, path, "Field required")
    }

    pub fn extra_field(path: impl Into<String>) -> Self {
        Self::new(ViolationKind::UnknownField, path, "Extra inputs are not permitted")
    }

    pub fn cross_field(rule: &str, message: impl Into<String>) -> Self {
        Self::new(
            ViolationKind::CrossFieldViolation,
            ROOT_PATH,
            format!("{} (rule '{}')", message.into(), rule),
        )
    }

    /// Re-tags a violation raised inside a nested value with the parent path.
    pub fn nested_under(mut self, parent: &str) -> Self {
        self.path = if self.path == ROOT_PATH {
            parent.to_string()
        } else if self.path.starts_with('[') {
            format!("{}{}", parent, self.path)
        } else {
            format!("{}.{}", parent, self.path)
        };
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {} [{}]", self.path, self.message, self.kind.code())
    }
}

/// Errors produced by shape registration, record construction and dumping.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// Construction rejected; at least one violation
    #[error("record '{shape}' rejected: {}", join_violations(.violations))]
    Invalid {
        shape: String,
        violations: Vec<Violation>,
    },

    #[error("shape '{0}' not found")]
    UnknownShape(String),

    #[error("shape '{0}' is already registered")]
    ShapeAlreadyRegistered(String),

    #[error("malformed shape '{source_name}': {reason}")]
    MalformedShape { source_name: String, reason: String },

    #[error("shape '{shape}' has no computed field '{field}'")]
    UnknownComputedField { shape: String, field: String },

    #[error("computed field '{field}' failed: {reason}")]
    ComputeFailed { field: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RecordError {
    pub fn invalid(shape: impl Into<String>, violations: Vec<Violation>) -> Self {
        RecordError::Invalid {
            shape: shape.into(),
            violations,
        }
    }

    pub fn malformed_shape(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        RecordError::MalformedShape {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::Invalid { .. } => "RECORD_INVALID",
            RecordError::UnknownShape(_) => "RECORD_UNKNOWN_SHAPE",
            RecordError::ShapeAlreadyRegistered(_) => "RECORD_SHAPE_ALREADY_REGISTERED",
            RecordError::MalformedShape { .. } => "RECORD_MALFORMED_SHAPE",
            RecordError::UnknownComputedField { .. } => "RECORD_UNKNOWN_COMPUTED_FIELD",
            RecordError::ComputeFailed { .. } => "RECORD_COMPUTE_FAILED",
            RecordError::Serialization(_) => "RECORD_SERIALIZATION_FAILED",
        }
    }

    /// Returns the violations of a rejected construction, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            RecordError::Invalid { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Returns the first violation of a rejected construction
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations().first()
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        RecordError::Serialization(e.to_string())
    }
}

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;
