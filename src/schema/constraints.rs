//! Interpreter for declarative field constraints.
//!
//! Every constraint is checked against an already type-checked value, so a
//! string constraint only ever sees strings unless the shape skipped
//! `validate_structure`; in that case the mismatch is reported as a type
//! error rather than silently passing.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;
use serde_json::Value;

use super::errors::{Violation, ViolationKind, ROOT_PATH};
use super::formats::{check_email, check_http_url, email_domain};
use super::types::Constraint;
use crate::record::FieldValue;

/// Compiles a `pattern` constraint once per process.
pub(crate) fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    static PATTERNS: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
    let cache = PATTERNS.get_or_init(Default::default);

    if let Some(re) = cache.read().ok().and_then(|m| m.get(pattern).cloned()) {
        return Ok(re);
    }
    let re = Regex::new(pattern)?;
    if let Ok(mut m) = cache.write() {
        m.insert(pattern.to_string(), re.clone());
    }
    Ok(re)
}

/// Checks one constraint. Violations carry the root path; callers re-tag them.
pub fn check(constraint: &Constraint, value: &FieldValue) -> Result<(), Violation> {
    match constraint {
        Constraint::Gt(bound) => numeric(value, |n| n > *bound, || {
            format!("Input should be greater than {}", bound)
        }),
        Constraint::Ge(bound) => numeric(value, |n| n >= *bound, || {
            format!("Input should be greater than or equal to {}", bound)
        }),
        Constraint::Lt(bound) => numeric(value, |n| n < *bound, || {
            format!("Input should be less than {}", bound)
        }),
        Constraint::Le(bound) => numeric(value, |n| n <= *bound, || {
            format!("Input should be less than or equal to {}", bound)
        }),
        Constraint::MinLength(min) => {
            let len = length(value)?;
            if len < *min {
                return Err(range(format!(
                    "Should have at least {} {}, got {}",
                    min,
                    unit(value, *min),
                    len
                )));
            }
            Ok(())
        }
        Constraint::MaxLength(max) => {
            let len = length(value)?;
            if len > *max {
                return Err(range(format!(
                    "Should have at most {} {}, got {}",
                    max,
                    unit(value, *max),
                    len
                )));
            }
            Ok(())
        }
        Constraint::Pattern(pattern) => {
            let s = string(value, "string")?;
            let re = compiled_pattern(pattern).map_err(|e| {
                Violation::new(
                    ViolationKind::FormatViolation,
                    ROOT_PATH,
                    format!("Invalid pattern '{}': {}", pattern, e),
                )
            })?;
            if !re.is_match(s) {
                return Err(format_violation(format!(
                    "String should match pattern '{}'",
                    pattern
                )));
            }
            Ok(())
        }
        Constraint::Email => {
            let s = string(value, "email")?;
            check_email(s).map_err(|reason| {
                format_violation(format!("value is not a valid email address: {}", reason))
            })
        }
        Constraint::Url => {
            let s = string(value, "URL")?;
            check_http_url(s)
                .map_err(|reason| format_violation(format!("Input should be a valid URL, {}", reason)))
        }
        Constraint::AllowedDomains(domains) => {
            let s = string(value, "email")?;
            let domain = email_domain(s).unwrap_or_default();
            if !domains.iter().any(|d| d == domain) {
                return Err(Violation::new(
                    ViolationKind::DomainNotAllowed,
                    ROOT_PATH,
                    format!("Invalid domain name. Must be one of: {}", domains.join(", ")),
                ));
            }
            Ok(())
        }
        Constraint::OneOf(options) => {
            let actual = value.to_json();
            if !options.iter().any(|o| json_equal(o, &actual)) {
                let listed = options
                    .iter()
                    .map(|o| o.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Violation::new(
                    ViolationKind::NotOneOf,
                    ROOT_PATH,
                    format!("Input should be one of: {}", listed),
                ));
            }
            Ok(())
        }
    }
}

fn numeric(
    value: &FieldValue,
    accept: impl Fn(f64) -> bool,
    message: impl Fn() -> String,
) -> Result<(), Violation> {
    let n = value
        .as_f64()
        .ok_or_else(|| Violation::type_mismatch(ROOT_PATH, "number", value.type_name()))?;
    if accept(n) {
        Ok(())
    } else {
        Err(range(message()))
    }
}

fn length(value: &FieldValue) -> Result<usize, Violation> {
    match value {
        FieldValue::Value(Value::String(s)) => Ok(s.chars().count()),
        FieldValue::List(items) => Ok(items.len()),
        FieldValue::Map(entries) => Ok(entries.len()),
        other => Err(Violation::type_mismatch(
            ROOT_PATH,
            "string, list or map",
            other.type_name(),
        )),
    }
}

fn unit(value: &FieldValue, count: usize) -> &'static str {
    match (value, count == 1) {
        (FieldValue::Value(_), true) => "character",
        (FieldValue::Value(_), false) => "characters",
        (_, true) => "item",
        (_, false) => "items",
    }
}

fn string<'a>(value: &'a FieldValue, expected: &str) -> Result<&'a str, Violation> {
    value
        .as_str()
        .ok_or_else(|| Violation::type_mismatch(ROOT_PATH, expected, value.type_name()))
}

/// Numbers compare by value so `1` matches `1.0`.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn range(message: String) -> Violation {
    Violation::new(ViolationKind::RangeViolation, ROOT_PATH, message)
}

fn format_violation(message: String) -> Violation {
    Violation::new(ViolationKind::FormatViolation, ROOT_PATH, message)
}
