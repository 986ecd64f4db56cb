//! Validation of example values against their schemas.

use serde_json::{Map, Value};

use crate::document::{NodeRef, Resolution, SpecVersion};

/// Validates one example value against a schema.
pub trait ExampleValidator {
    /// Returns a human-readable message per problem; empty when the example
    /// conforms or the schema cannot be used for validation.
    fn validate(&self, example: &Value, schema: NodeRef<'_>) -> Vec<String>;
}

/// [`ExampleValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaExampleValidator;

impl ExampleValidator for JsonSchemaExampleValidator {
    fn validate(&self, example: &Value, schema: NodeRef<'_>) -> Vec<String> {
        let document = schema.document();
        let raw = document.materialize(schema.id(), Resolution::Resolved);
        let prepared = to_json_schema(raw, document.version());

        match jsonschema::validator_for(&prepared) {
            Ok(validator) => validator
                .iter_errors(example)
                .map(|error| error.to_string())
                .collect(),
            Err(e) => {
                tracing::debug!("Schema at {} is not usable for example validation: {}", schema.location(), e);
                Vec::new()
            }
        }
    }
}

/// Keywords whose values are data, not sub-schemas.
const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "examples"];

/// OpenAPI-only keywords with no JSON Schema meaning.
const OPENAPI_KEYWORDS: &[&str] = &["discriminator", "xml", "externalDocs", "example", "readOnly", "writeOnly"];

/// Rewrites an OpenAPI schema object into plain JSON Schema: drops OpenAPI
/// vocabulary and vendor extensions, and for OpenAPI 3.0 and Swagger 2.0
/// turns `nullable` into a `null` type and boolean `exclusiveMinimum` /
/// `exclusiveMaximum` into their numeric form.
#[must_use]
pub fn to_json_schema(schema: Value, version: SpecVersion) -> Value {
    match schema {
        Value::Object(map) => Value::Object(convert_object(map, version)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| to_json_schema(v, version)).collect()),
        other => other,
    }
}

fn convert_object(map: Map<String, Value>, version: SpecVersion) -> Map<String, Value> {
    let legacy = version != SpecVersion::OpenApi31;
    let nullable = legacy && map.get("nullable").and_then(Value::as_bool) == Some(true);
    let mut out = Map::new();

    for (key, value) in map {
        if key.starts_with("x-") || OPENAPI_KEYWORDS.contains(&key.as_str()) {
            continue;
        }
        if legacy && key == "nullable" {
            continue;
        }
        if DATA_KEYWORDS.contains(&key.as_str()) {
            out.insert(key, value);
            continue;
        }
        if key == "properties" || key == "patternProperties" {
            let converted = match value {
                Value::Object(props) => Value::Object(
                    props
                        .into_iter()
                        .map(|(name, prop)| (name, to_json_schema(prop, version)))
                        .collect(),
                ),
                other => other,
            };
            out.insert(key, converted);
            continue;
        }
        out.insert(key, to_json_schema(value, version));
    }

    if legacy {
        convert_exclusive_bound(&mut out, "exclusiveMinimum", "minimum");
        convert_exclusive_bound(&mut out, "exclusiveMaximum", "maximum");
    }

    if nullable {
        add_null_type(&mut out);
    }

    out
}

fn convert_exclusive_bound(map: &mut Map<String, Value>, exclusive: &str, inclusive: &str) {
    match map.get(exclusive) {
        Some(Value::Bool(true)) => {
            if let Some(bound) = map.remove(inclusive) {
                map.insert(exclusive.to_owned(), bound);
            } else {
                map.remove(exclusive);
            }
        }
        Some(Value::Bool(false)) => {
            map.remove(exclusive);
        }
        _ => {}
    }
}

fn add_null_type(map: &mut Map<String, Value>) {
    match map.get_mut("type") {
        Some(Value::String(ty)) => {
            let ty = std::mem::take(ty);
            map.insert("type".to_owned(), Value::Array(vec![Value::String(ty), Value::String("null".to_owned())]));
        }
        Some(Value::Array(types)) => {
            if !types.iter().any(|t| t == "null") {
                types.push(Value::String("null".to_owned()));
            }
        }
        Some(_) => {}
        None => {
            if let Some(Value::Array(values)) = map.get_mut("enum")
                && !values.contains(&Value::Null)
            {
                values.push(Value::Null);
            }
        }
    }
}
