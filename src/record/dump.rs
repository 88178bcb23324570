//! Record to mapping conversion with field selection.
//!
//! A [`Selection`] mirrors the record's own structure: `All` selects a whole
//! field, `Fields` selects named leaves one level down. The same type drives
//! both `include` and `exclude`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{FieldValue, Record};
use crate::schema::{RecordError, RecordResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Fields(BTreeMap<String, Selection>),
}

impl Selection {
    /// Selects each named field in full.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Fields(
            names
                .into_iter()
                .map(|n| (n.into(), Selection::All))
                .collect(),
        )
    }

    /// Selects `inner` within the field `name`.
    pub fn nested(name: impl Into<String>, inner: Selection) -> Self {
        Selection::Fields(BTreeMap::from([(name.into(), inner)]))
    }

    /// Parses `true`, an array of names, or an object of name to selection.
    ///
    /// Inside an object `false` entries are dropped, so
    /// `{"address": {"state": true, "pin": false}}` selects only `address.state`.
    pub fn from_json(value: &Value) -> RecordResult<Self> {
        match value {
            Value::Bool(true) => Ok(Selection::All),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(|s| (s.to_string(), Selection::All))
                        .ok_or_else(|| selection_error(item))
                })
                .collect::<RecordResult<BTreeMap<_, _>>>()
                .map(Selection::Fields),
            Value::Object(entries) => {
                let mut map = BTreeMap::new();
                for (name, inner) in entries {
                    if inner == &Value::Bool(false) {
                        continue;
                    }
                    map.insert(name.clone(), Selection::from_json(inner)?);
                }
                Ok(Selection::Fields(map))
            }
            other => Err(selection_error(other)),
        }
    }
}

fn selection_error(value: &Value) -> RecordError {
    RecordError::Serialization(format!(
        "selection must be true, a list of field names or an object, got {}",
        value
    ))
}

/// Options for [`Record::dump`].
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    pub include: Option<Selection>,
    pub exclude: Option<Selection>,
    /// Keep only fields supplied at construction
    pub exclude_unset: bool,
    pub exclude_none: bool,
    /// Append computed fields after the declared ones
    pub include_computed: bool,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, selection: Selection) -> Self {
        self.include = Some(selection);
        self
    }

    pub fn exclude(mut self, selection: Selection) -> Self {
        self.exclude = Some(selection);
        self
    }

    pub fn exclude_unset(mut self) -> Self {
        self.exclude_unset = true;
        self
    }

    pub fn exclude_none(mut self) -> Self {
        self.exclude_none = true;
        self
    }

    pub fn with_computed(mut self) -> Self {
        self.include_computed = true;
        self
    }
}

/// What survives selection for a single key.
enum Pick<'a> {
    Skip,
    Keep {
        include: Option<&'a Selection>,
        exclude: Option<&'a Selection>,
    },
}

/// `None` means "no restriction" for include and "nothing excluded" for exclude.
fn pick<'a>(name: &str, include: Option<&'a Selection>, exclude: Option<&'a Selection>) -> Pick<'a> {
    let include = match include {
        None | Some(Selection::All) => None,
        Some(Selection::Fields(map)) => match map.get(name) {
            None => return Pick::Skip,
            Some(Selection::All) => None,
            Some(inner) => Some(inner),
        },
    };
    let exclude = match exclude {
        None => None,
        Some(Selection::All) => return Pick::Skip,
        Some(Selection::Fields(map)) => match map.get(name) {
            Some(Selection::All) => return Pick::Skip,
            other => other,
        },
    };
    Pick::Keep { include, exclude }
}

impl Record {
    /// Converts the record into an ordered mapping.
    pub fn dump(&self, options: &DumpOptions) -> RecordResult<Map<String, Value>> {
        dump_record(
            self,
            options.include.as_ref(),
            options.exclude.as_ref(),
            options,
        )
    }

    /// Renders [`Record::dump`] as a JSON string.
    pub fn to_json_string(&self, options: &DumpOptions) -> RecordResult<String> {
        let map = self.dump(options)?;
        Ok(serde_json::to_string(&Value::Object(map))?)
    }
}

fn dump_record(
    record: &Record,
    include: Option<&Selection>,
    exclude: Option<&Selection>,
    options: &DumpOptions,
) -> RecordResult<Map<String, Value>> {
    let mut out = Map::new();

    for (name, value) in record.fields() {
        if options.exclude_unset && !record.is_set(name) {
            continue;
        }
        if options.exclude_none && value.is_null() {
            continue;
        }
        if let Pick::Keep { include, exclude } = pick(name, include, exclude) {
            out.insert(name.to_string(), dump_value(value, include, exclude, options)?);
        }
    }

    if options.include_computed {
        for computed in record.shape().computed_fields() {
            if let Pick::Keep { .. } = pick(computed.name(), include, exclude) {
                let value = record.computed(computed.name())?;
                if options.exclude_none && value.is_null() {
                    continue;
                }
                out.insert(computed.name().to_string(), value);
            }
        }
    }

    Ok(out)
}

fn dump_value(
    value: &FieldValue,
    include: Option<&Selection>,
    exclude: Option<&Selection>,
    options: &DumpOptions,
) -> RecordResult<Value> {
    Ok(match value {
        FieldValue::Value(v) => v.clone(),
        FieldValue::Record(r) => Value::Object(dump_record(r, include, exclude, options)?),
        // Nested selections apply to every element.
        FieldValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| dump_value(item, include, exclude, options))
                .collect::<RecordResult<Vec<_>>>()?,
        ),
        FieldValue::Map(entries) => {
            let mut out = Map::new();
            for (key, inner) in entries {
                if options.exclude_none && inner.is_null() {
                    continue;
                }
                if let Pick::Keep { include, exclude } = pick(key, include, exclude) {
                    out.insert(key.clone(), dump_value(inner, include, exclude, options)?);
                }
            }
            Value::Object(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_from_array() {
        let sel = Selection::from_json(&json!(["state", "pin"])).unwrap();
        assert_eq!(sel, Selection::fields(["pin", "state"]));
    }

    #[test]
    fn test_selection_forms_are_equivalent() {
        let from_object = Selection::from_json(&json!({"address": {"state": true}})).unwrap();
        let from_list = Selection::from_json(&json!({"address": ["state"]})).unwrap();
        let built = Selection::nested("address", Selection::fields(["state"]));
        assert_eq!(from_object, built);
        assert_eq!(from_list, built);
    }

    #[test]
    fn test_selection_drops_false_entries() {
        let sel = Selection::from_json(&json!({"name": true, "age": false})).unwrap();
        assert_eq!(sel, Selection::fields(["name"]));
    }

    #[test]
    fn test_selection_rejects_scalars() {
        assert!(Selection::from_json(&json!(3)).is_err());
        assert!(Selection::from_json(&json!(["ok", 1])).is_err());
        assert!(Selection::from_json(&json!(false)).is_err());
    }

    #[test]
    fn test_pick_rules() {
        let exclude = Selection::nested("address", Selection::fields(["state"]));
        assert!(matches!(pick("name", None, Some(&exclude)), Pick::Keep { exclude: None, .. }));
        assert!(matches!(
            pick("address", None, Some(&exclude)),
            Pick::Keep { exclude: Some(_), .. }
        ));
        let top = Selection::fields(["name"]);
        assert!(matches!(pick("name", None, Some(&top)), Pick::Skip));
        assert!(matches!(pick("age", Some(&top), None), Pick::Skip));
    }
}
