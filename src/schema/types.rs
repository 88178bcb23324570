//! Record shape type definitions
//!
//! Supported field types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - any: unchecked JSON value
//! - list: Homogeneous list with element type
//! - map: String-keyed map with value type
//! - record: Nested record shape, validated recursively

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constraints::compiled_pattern;
use super::rules::{ComputeFn, ComputedField, CrossFieldRule, FieldCheckFn, FieldHook, RuleFn};
use crate::record::{FieldValue, Record};

/// Field types a declaration may carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Any,
    List {
        element_type: Box<FieldType>,
    },
    Map {
        value_type: Box<FieldType>,
    },
    Record {
        shape: Arc<RecordShape>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "boolean",
            FieldType::Any => "any",
            FieldType::List { .. } => "list",
            FieldType::Map { .. } => "map",
            FieldType::Record { .. } => "record",
        }
    }

    pub fn list_of(element_type: FieldType) -> Self {
        FieldType::List {
            element_type: Box::new(element_type),
        }
    }

    pub fn map_of(value_type: FieldType) -> Self {
        FieldType::Map {
            value_type: Box::new(value_type),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    fn has_length(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::List { .. } | FieldType::Map { .. }
        )
    }
}

/// A single declarative check attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// Exclusive lower bound
    Gt(f64),
    /// Inclusive lower bound
    Ge(f64),
    /// Exclusive upper bound
    Lt(f64),
    /// Inclusive upper bound
    Le(f64),
    /// Inclusive minimum length (characters, items or entries)
    MinLength(usize),
    /// Inclusive maximum length
    MaxLength(usize),
    /// Regex the whole string must match
    Pattern(String),
    Email,
    /// Absolute http or https URL
    Url,
    /// Email domain allow-list
    AllowedDomains(Vec<String>),
    /// Enumerated domain membership
    OneOf(Vec<Value>),
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Gt(_) => "gt",
            Constraint::Ge(_) => "ge",
            Constraint::Lt(_) => "lt",
            Constraint::Le(_) => "le",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Pattern(_) => "pattern",
            Constraint::Email => "email",
            Constraint::Url => "url",
            Constraint::AllowedDomains(_) => "allowed_domains",
            Constraint::OneOf(_) => "one_of",
        }
    }
}

/// Normalization applied to a string value once every check has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Uppercase,
    Lowercase,
    Trim,
}

impl Transform {
    /// Non-string values pass through untouched.
    pub fn apply(&self, value: FieldValue) -> FieldValue {
        match value {
            FieldValue::Value(Value::String(s)) => FieldValue::Value(Value::String(match self {
                Transform::Uppercase => s.to_uppercase(),
                Transform::Lowercase => s.to_lowercase(),
                Transform::Trim => s.trim().to_string(),
            })),
            other => other,
        }
    }
}

/// What to do with input keys the shape does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPolicy {
    #[default]
    Ignore,
    Forbid,
}

/// Field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Value used when the field is absent; absence of a default makes the field required
    #[serde(
        default,
        deserialize_with = "present_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    /// Whether `null` is an accepted value
    #[serde(default)]
    pub nullable: bool,
    /// Reject values that would need coercion
    #[serde(default)]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `"default": null` is a null default, not a missing one.
fn present_default<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            nullable: false,
            strict: false,
            constraints: Vec::new(),
            transform: None,
            title: None,
            description: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn list(name: impl Into<String>, element_type: FieldType) -> Self {
        Self::new(name, FieldType::list_of(element_type))
    }

    pub fn map(name: impl Into<String>, value_type: FieldType) -> Self {
        Self::new(name, FieldType::map_of(value_type))
    }

    pub fn record(name: impl Into<String>, shape: Arc<RecordShape>) -> Self {
        Self::new(name, FieldType::Record { shape })
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Accept `null` and default to it, like `Optional[T] = None`.
    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self.default = Some(Value::Null);
        self
    }

    /// Accept `null` while keeping the field required.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn gt(self, bound: f64) -> Self {
        self.constraint(Constraint::Gt(bound))
    }

    pub fn lt(self, bound: f64) -> Self {
        self.constraint(Constraint::Lt(bound))
    }

    pub fn length(self, min: usize, max: usize) -> Self {
        self.constraint(Constraint::MinLength(min))
            .constraint(Constraint::MaxLength(max))
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn validate_structure(&self) -> Result<(), String> {
        let numeric = self.field_type.is_numeric();
        let string = matches!(self.field_type, FieldType::String);
        let mut min_len = None;
        let mut max_len = None;

        for constraint in &self.constraints {
            let fits = match constraint {
                Constraint::Gt(_) | Constraint::Ge(_) | Constraint::Lt(_) | Constraint::Le(_) => {
                    numeric
                }
                Constraint::MinLength(n) => {
                    min_len = Some(*n);
                    self.field_type.has_length()
                }
                Constraint::MaxLength(n) => {
                    max_len = Some(*n);
                    self.field_type.has_length()
                }
                Constraint::Pattern(pattern) => {
                    compiled_pattern(pattern)
                        .map_err(|e| format!("field '{}': invalid pattern: {}", self.name, e))?;
                    string
                }
                Constraint::Email | Constraint::Url | Constraint::AllowedDomains(_) => string,
                Constraint::OneOf(options) => !options.is_empty(),
            };
            if !fits {
                return Err(format!(
                    "field '{}': constraint '{}' does not apply to {}",
                    self.name,
                    constraint.name(),
                    self.field_type.type_name()
                ));
            }
        }

        if let (Some(min), Some(max)) = (min_len, max_len) {
            if min > max {
                return Err(format!(
                    "field '{}': min_length {} exceeds max_length {}",
                    self.name, min, max
                ));
            }
        }

        if let FieldType::Record { shape } = &self.field_type {
            if self.default.as_ref().is_some_and(|d| !d.is_null()) {
                return Err(format!(
                    "field '{}': record fields cannot declare a default",
                    self.name
                ));
            }
            shape.validate_structure()?;
        }

        Ok(())
    }
}

/// Complete record shape: declarative fields plus registered hooks.
///
/// Only the declarative part round-trips through serde; hooks, rules and
/// computed fields are closures registered in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordShape {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub extra: ExtraPolicy,
    #[serde(skip)]
    field_hooks: Vec<FieldHook>,
    #[serde(skip)]
    rules: Vec<CrossFieldRule>,
    #[serde(skip)]
    computed: Vec<ComputedField>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            extra: ExtraPolicy::Ignore,
            field_hooks: Vec::new(),
            rules: Vec::new(),
            computed: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn forbid_extra(mut self) -> Self {
        self.extra = ExtraPolicy::Forbid;
        self
    }

    /// Registers a check run on `field` after its declarative constraints.
    pub fn field_hook<F>(mut self, field: &str, name: &str, check: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<(), String> + Send + Sync + 'static,
    {
        let check: Arc<FieldCheckFn> = Arc::new(check);
        self.field_hooks.push(FieldHook::new(field, name, check));
        self
    }

    /// Registers a whole-record rule, run in registration order.
    pub fn rule<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    {
        let check: Arc<RuleFn> = Arc::new(check);
        self.rules.push(CrossFieldRule::new(name, check));
        self
    }

    /// Registers a derived field evaluated on every access.
    pub fn computed<F>(mut self, name: &str, compute: F) -> Self
    where
        F: Fn(&Record) -> Result<Value, String> + Send + Sync + 'static,
    {
        let compute: Arc<ComputeFn> = Arc::new(compute);
        self.computed.push(ComputedField::new(name, compute));
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn hooks_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldHook> + 'a {
        self.field_hooks.iter().filter(move |h| h.field() == field)
    }

    pub fn rules(&self) -> &[CrossFieldRule] {
        &self.rules
    }

    pub fn computed_fields(&self) -> &[ComputedField] {
        &self.computed
    }

    pub fn computed_field(&self, name: &str) -> Option<&ComputedField> {
        self.computed.iter().find(|c| c.name() == name)
    }

    /// Validates the shape declaration itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Shape name must not be empty".into());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(format!("Duplicate field '{}'", field.name));
            }
            field.validate_structure()?;
        }

        for hook in &self.field_hooks {
            if !seen.contains(hook.field()) {
                return Err(format!(
                    "Hook '{}' targets undeclared field '{}'",
                    hook.name(),
                    hook.field()
                ));
            }
        }

        for computed in &self.computed {
            if seen.contains(computed.name()) {
                return Err(format!(
                    "Computed field '{}' collides with a declared field",
                    computed.name()
                ));
            }
        }

        Ok(())
    }
}
