//! Validation of host-supplied values.
//!
//! Two layers:
//! - [`validate`] checks a JSON value against a [`Schema`]: types, required
//!   attributes and object fields. Unknown values pass, they are checked again
//!   once known.
//! - [`check_required`] runs before every remote call and enforces presence of
//!   the identifying fields an operation needs.
//!
//! ```
//! use discord_provider::schema::{Attribute, Schema};
//! use discord_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("guild_id", Attribute::required_string())
//!     .with_attribute("position", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"guild_id": "1", "position": 2})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"guild_id": "1", "position": "top"}));
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("position"));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::value::{self, Attr};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped
/// - Attribute types must match, recursively through lists and objects
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

/// Like [`validate`], as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value::is_unknown(value) {
        return;
    }

    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Object(fields) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(fields, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        },
    }
}

fn validate_object_type(
    fields: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in fields {
        // Object fields carry no presence flags, only their types are checked.
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_attribute_type(attr_type, value, &format!("{}.{}", path, name), diagnostics);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(value)
        ))
        .with_attribute(path)
}

/// Checks that the identifying fields of an operation are set.
///
/// `fields` pairs a field name with its value. A plain name must be set and
/// non-empty. Names ending in `?` form a group of which at least one must be
/// set. `entity` and `kind` name the target in the detail text, e.g.
/// `discord_channel` and `resource`.
pub fn check_required(
    fields: &[(&str, &Attr<String>)],
    entity: &str,
    kind: &str,
) -> Result<(), Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let mut group = Vec::new();

    for &(field, value) in fields {
        if let Some(field) = field.strip_suffix('?') {
            group.push((field, value));
            continue;
        }

        let problem = match value {
            Attr::Null => "null",
            Attr::Unknown => "unknown",
            Attr::Known(s) if s.is_empty() => "empty",
            Attr::Known(_) => continue,
        };
        diagnostics.push(
            Diagnostic::error(format!("{field} is {problem}"))
                .with_detail(format!("{field} must be set for the {entity} {kind}."))
                .with_attribute(field),
        );
    }

    let unset = |v: &Attr<String>| v.known().is_none_or(String::is_empty);
    if !group.is_empty() && group.iter().all(|(_, v)| unset(v)) {
        let problem = if group.iter().all(|(_, v)| v.is_null()) {
            "null"
        } else if group.iter().all(|(_, v)| v.is_unknown()) {
            "unknown"
        } else {
            "empty"
        };
        let names: Vec<&str> = group.iter().map(|(name, _)| *name).collect();
        diagnostics.push(
            Diagnostic::error(format!("all optional fields are {problem}")).with_detail(format!(
                "At least one field must be set for the {entity} {kind} from {}",
                names.join(", ")
            )),
        );
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}
