//! Schema vocabulary helpers and enumeration of schema positions in an API
//! definition.

use regex::Regex;
use std::collections::BTreeSet;

use crate::document::{Document, NodeRef, SpecVersion};
use crate::path::DocPath;

/// Keywords whose values are maps of sub-schemas.
pub const MAP_KEYWORDS: &[&str] = &["properties", "patternProperties"];

/// Keywords whose values are single sub-schemas (when the value is an object).
pub const SINGLE_KEYWORDS: &[&str] = &["items", "additionalProperties", "not"];

/// Keywords whose values are arrays of sub-schemas.
pub const COMPOSITION_KEYWORDS: &[&str] = &["allOf", "oneOf", "anyOf"];

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// The `type` of a schema as a set; `None` when no type is declared.
#[must_use]
pub fn declared_types(schema: NodeRef<'_>) -> Option<BTreeSet<String>> {
    let ty = schema.get("type")?;
    if let Some(single) = ty.as_str() {
        return Some(BTreeSet::from([single.to_owned()]));
    }
    let set: BTreeSet<String> = ty
        .items()
        .filter_map(NodeRef::as_str)
        .map(str::to_owned)
        .collect();
    if set.is_empty() { None } else { Some(set) }
}

/// Declared types, or the type implied by object/array keywords.
#[must_use]
pub fn effective_types(schema: NodeRef<'_>) -> Option<BTreeSet<String>> {
    declared_types(schema).or_else(|| {
        if is_object_like(schema) {
            Some(BTreeSet::from(["object".to_owned()]))
        } else if schema.contains_key("items") {
            Some(BTreeSet::from(["array".to_owned()]))
        } else {
            None
        }
    })
}

#[must_use]
pub fn is_object_like(schema: NodeRef<'_>) -> bool {
    schema.contains_key("properties")
        || schema.get("additionalProperties").is_some_and(NodeRef::is_object)
        || schema.contains_key("patternProperties")
}

#[must_use]
pub fn is_write_only(schema: NodeRef<'_>) -> bool {
    flag(schema.resolved(), "writeOnly")
}

#[must_use]
pub fn is_deprecated(schema: NodeRef<'_>) -> bool {
    flag(schema.resolved(), "deprecated")
}

fn flag(schema: NodeRef<'_>, keyword: &str) -> bool {
    schema.get(keyword).and_then(NodeRef::as_bool) == Some(true)
}

/// The value schema of a dictionary-style object schema.
#[derive(Debug, Clone)]
pub struct Dictionary<'a> {
    pub value_schema: NodeRef<'a>,
    /// Key pattern when the dictionary comes from a single `patternProperties`
    /// entry.
    pub pattern: Option<&'a str>,
    /// `pattern`, compiled; `None` when it does not compile.
    matcher: Option<Regex>,
}

impl Dictionary<'_> {
    /// Whether a concrete property name may appear as a key of this
    /// dictionary. Patterns that do not compile admit nothing.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        match (self.pattern, &self.matcher) {
            (None, _) => true,
            (Some(_), Some(re)) => re.is_match(name),
            (Some(_), None) => false,
        }
    }
}

/// `additionalProperties` given as a schema, or exactly one
/// `patternProperties` entry.
#[must_use]
pub fn dictionary<'a>(schema: NodeRef<'a>) -> Option<Dictionary<'a>> {
    if let Some(additional) = schema.get("additionalProperties")
        && additional.is_object()
    {
        return Some(Dictionary {
            value_schema: additional,
            pattern: None,
            matcher: None,
        });
    }
    let pattern_properties = schema.get("patternProperties")?;
    if pattern_properties.len() != 1 {
        return None;
    }
    let (pattern, value_schema) = pattern_properties.entries().next()?;
    let matcher = match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!("Dictionary key pattern at {} does not compile: {}", schema.location(), e);
            None
        }
    };
    Some(Dictionary {
        value_schema,
        pattern: Some(pattern),
        matcher,
    })
}

/// A schema position found by [`for_each_schema`].
#[derive(Debug, Clone)]
pub struct SchemaVisit<'a> {
    pub node: NodeRef<'a>,
    pub path: DocPath,
    /// The schema is an element of an `allOf`/`oneOf`/`anyOf` list.
    pub is_composition_element: bool,
}

/// Calls `visit` for every inline schema of the document: reusable schemas,
/// parameter, header, request body and response schemas, and every nested
/// sub-schema of those. Reference objects are not followed; their targets are
/// visited where they are defined.
pub fn for_each_schema<'a, F>(document: &'a Document, visit: &mut F)
where
    F: FnMut(&SchemaVisit<'a>),
{
    let root = document.root();
    let version = document.version();
    let mut roots = Vec::new();

    if let Some(schemas) = document.at_path(&version.schemas_path().segments()) {
        roots.extend(schemas.entries().map(|(_, schema)| schema));
    }

    if version == SpecVersion::Swagger2 {
        for section in ["parameters", "responses"] {
            for (_, item) in root.get(section).into_iter().flat_map(NodeRef::entries) {
                roots.extend(item.get("schema"));
            }
        }
    } else {
        let components = root.get("components");
        for section in ["parameters", "headers"] {
            for (_, item) in components.and_then(|c| c.get(section)).into_iter().flat_map(NodeRef::entries) {
                collect_parameter_schemas(item, &mut roots);
            }
        }
        for section in ["requestBodies", "responses"] {
            for (_, item) in components.and_then(|c| c.get(section)).into_iter().flat_map(NodeRef::entries) {
                collect_body_schemas(item, &mut roots);
            }
        }
    }

    for section in ["paths", "webhooks"] {
        for (_, path_item) in root.get(section).into_iter().flat_map(NodeRef::entries) {
            collect_path_item_schemas(path_item, version, &mut roots);
        }
    }

    for schema in roots {
        visit_schema_tree(schema, false, visit);
    }
}

fn collect_path_item_schemas<'a>(path_item: NodeRef<'a>, version: SpecVersion, roots: &mut Vec<NodeRef<'a>>) {
    if path_item.is_ref() {
        return;
    }
    for param in path_item.get("parameters").into_iter().flat_map(NodeRef::items) {
        collect_parameter_schemas(param, roots);
    }
    for method in HTTP_METHODS {
        let Some(operation) = path_item.get(method) else {
            continue;
        };
        for param in operation.get("parameters").into_iter().flat_map(NodeRef::items) {
            collect_parameter_schemas(param, roots);
        }
        if let Some(body) = operation.get("requestBody") {
            collect_body_schemas(body, roots);
        }
        for (_, response) in operation.get("responses").into_iter().flat_map(NodeRef::entries) {
            if version == SpecVersion::Swagger2 {
                if !response.is_ref() {
                    roots.extend(response.get("schema"));
                }
            } else {
                collect_body_schemas(response, roots);
            }
        }
    }
}

/// Parameters and headers: `schema`, or `content.*.schema`.
fn collect_parameter_schemas<'a>(item: NodeRef<'a>, roots: &mut Vec<NodeRef<'a>>) {
    if item.is_ref() {
        return;
    }
    roots.extend(item.get("schema"));
    collect_content_schemas(item, roots);
}

/// Request bodies and responses: `content.*.schema` and response headers.
fn collect_body_schemas<'a>(item: NodeRef<'a>, roots: &mut Vec<NodeRef<'a>>) {
    if item.is_ref() {
        return;
    }
    collect_content_schemas(item, roots);
    for (_, header) in item.get("headers").into_iter().flat_map(NodeRef::entries) {
        collect_parameter_schemas(header, roots);
    }
}

fn collect_content_schemas<'a>(item: NodeRef<'a>, roots: &mut Vec<NodeRef<'a>>) {
    for (_, media_type) in item.get("content").into_iter().flat_map(NodeRef::entries) {
        roots.extend(media_type.get("schema"));
    }
}

fn visit_schema_tree<'a, F>(schema: NodeRef<'a>, is_composition_element: bool, visit: &mut F)
where
    F: FnMut(&SchemaVisit<'a>),
{
    if !schema.is_object() || schema.is_ref() {
        return;
    }
    visit(&SchemaVisit {
        node: schema,
        path: schema.location().clone(),
        is_composition_element,
    });

    for keyword in MAP_KEYWORDS {
        for (_, child) in schema.get(keyword).into_iter().flat_map(NodeRef::entries) {
            visit_schema_tree(child, false, visit);
        }
    }
    for keyword in SINGLE_KEYWORDS {
        let Some(child) = schema.get(keyword) else {
            continue;
        };
        if child.is_array() {
            // Tuple-form `items`.
            for item in child.items() {
                visit_schema_tree(item, false, visit);
            }
        } else {
            visit_schema_tree(child, false, visit);
        }
    }
    for keyword in COMPOSITION_KEYWORDS {
        for child in schema.get(keyword).into_iter().flat_map(NodeRef::items) {
            visit_schema_tree(child, true, visit);
        }
    }
}

/// An OpenAPI 3 media type object together with its location.
#[derive(Debug, Clone)]
pub struct MediaTypeVisit<'a> {
    pub node: NodeRef<'a>,
    pub path: DocPath,
}

/// Calls `visit` for every media type object (`content.<type>`) of request
/// bodies, responses, parameters and headers, in components and operations.
pub fn for_each_media_type<'a, F>(document: &'a Document, visit: &mut F)
where
    F: FnMut(&MediaTypeVisit<'a>),
{
    if !document.version().is_oas3() {
        return;
    }
    let mut containers = Vec::new();
    let root = document.root();

    if let Some(components) = root.get("components") {
        for section in ["parameters", "headers", "requestBodies", "responses"] {
            containers.extend(components.get(section).into_iter().flat_map(NodeRef::entries).map(|(_, item)| item));
        }
    }
    for section in ["paths", "webhooks"] {
        for (_, path_item) in root.get(section).into_iter().flat_map(NodeRef::entries) {
            containers.extend(path_item.get("parameters").into_iter().flat_map(NodeRef::items));
            for method in HTTP_METHODS {
                let Some(operation) = path_item.get(method) else {
                    continue;
                };
                containers.extend(operation.get("parameters").into_iter().flat_map(NodeRef::items));
                containers.extend(operation.get("requestBody"));
                containers.extend(operation.get("responses").into_iter().flat_map(NodeRef::entries).map(|(_, r)| r));
            }
        }
    }

    let mut headers = Vec::new();
    for container in &containers {
        headers.extend(container.get("headers").into_iter().flat_map(NodeRef::entries).map(|(_, h)| h));
    }
    containers.extend(headers);

    for container in containers {
        if container.is_ref() {
            continue;
        }
        for (_, media_type) in container.get("content").into_iter().flat_map(NodeRef::entries) {
            visit(&MediaTypeVisit {
                node: media_type,
                path: media_type.location().clone(),
            });
        }
    }
}
