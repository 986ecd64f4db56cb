//! Arena representation of an API definition.
//!
//! Every JSON node of the input is interned once and addressed by a stable
//! [`NodeId`]. A `$ref` resolves to the id of its target, so two references to
//! the same target are the same logical node: identity is id equality, never
//! structural comparison. The resolved view of the document is obtained by
//! substituting targets for reference objects while navigating
//! ([`NodeRef::resolved`], [`NodeRef::get_resolved`]); cycles in that view are
//! cycles of ids.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

use crate::path::{DocPath, PathSegment};
use crate::reference::{self, ReferenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether `$ref` objects are navigated as-is or replaced by their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolved,
}

/// API description format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi30,
    OpenApi31,
    Unknown,
}

impl SpecVersion {
    #[must_use]
    pub fn detect(root: &Value) -> Self {
        if let Some(openapi) = root.get("openapi").and_then(Value::as_str) {
            if openapi.starts_with("3.1") {
                return SpecVersion::OpenApi31;
            }
            if openapi.starts_with("3.") {
                return SpecVersion::OpenApi30;
            }
        }
        match root.get("swagger") {
            Some(Value::String(s)) if s.starts_with("2.") => SpecVersion::Swagger2,
            _ => SpecVersion::Unknown,
        }
    }

    #[must_use]
    pub fn is_oas3(self) -> bool {
        matches!(self, SpecVersion::OpenApi30 | SpecVersion::OpenApi31)
    }

    #[must_use]
    pub fn supports_pattern_properties(self) -> bool {
        self == SpecVersion::OpenApi31
    }

    /// Location of the reusable schema map for this format.
    #[must_use]
    pub fn schemas_path(self) -> DocPath {
        match self {
            SpecVersion::Swagger2 => DocPath::from_segments(["definitions"]),
            _ => DocPath::from_segments(["components", "schemas"]),
        }
    }
}

#[derive(Debug, Clone)]
enum NodeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NodeId>),
    Object(Vec<(String, NodeId)>),
}

#[derive(Debug)]
struct Node {
    value: NodeValue,
    location: DocPath,
}

/// An immutable, interned API definition.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    version: SpecVersion,
    ref_targets: HashMap<String, Result<NodeId, ReferenceError>>,
}

impl Document {
    #[must_use]
    pub fn new(value: Value) -> Self {
        let version = SpecVersion::detect(&value);
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            version,
            ref_targets: HashMap::new(),
        };
        let mut refs = Vec::new();
        doc.root = doc.intern(value, &DocPath::root(), &mut refs);

        for reference in refs {
            if doc.ref_targets.contains_key(&reference) {
                continue;
            }
            let target = doc.lookup_pointer(&reference);
            doc.ref_targets.insert(reference, target);
        }

        tracing::debug!(
            "Interned document with {} nodes and {} distinct references",
            doc.nodes.len(),
            doc.ref_targets.len()
        );
        doc
    }

    fn intern(&mut self, value: Value, location: &DocPath, refs: &mut Vec<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value: NodeValue::Null,
            location: location.clone(),
        });

        let node_value = match value {
            Value::Null => NodeValue::Null,
            Value::Bool(b) => NodeValue::Bool(b),
            Value::Number(n) => NodeValue::Number(n),
            Value::String(s) => NodeValue::String(s),
            Value::Array(items) => NodeValue::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.intern(item, &location.child(i), refs))
                    .collect(),
            ),
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    refs.push(reference.clone());
                }
                NodeValue::Object(
                    map.into_iter()
                        .map(|(key, item)| {
                            let child = self.intern(item, &location.child(&key), refs);
                            (key, child)
                        })
                        .collect(),
                )
            }
        };

        self.nodes[id.0].value = node_value;
        id
    }

    fn lookup_pointer(&self, reference: &str) -> Result<NodeId, ReferenceError> {
        let tokens = reference::parse_pointer(reference)?;
        let mut current = self.root();
        for token in &tokens {
            let next = if current.is_array() {
                token.parse::<usize>().ok().and_then(|i| current.index(i))
            } else {
                current.get(token)
            };
            current = next.ok_or_else(|| ReferenceError::NotFound(reference.to_owned()))?;
        }
        Ok(current.id())
    }

    #[must_use]
    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    /// # Panics
    ///
    /// Panics if `id` was not produced by this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.0 < self.nodes.len(), "node {id} does not belong to this document");
        NodeRef { doc: self, id }
    }

    #[must_use]
    pub fn version(&self) -> SpecVersion {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up the target of a reference string.
    ///
    /// # Errors
    /// Returns [`ReferenceError`] when the reference is external or names a
    /// location that does not exist.
    pub fn ref_target(&self, reference: &str) -> Result<NodeId, ReferenceError> {
        match self.ref_targets.get(reference) {
            Some(result) => result.clone(),
            None => self.lookup_pointer(reference),
        }
    }

    /// Navigates raw (unresolved) segments from the root.
    #[must_use]
    pub fn at_path(&self, segments: &[PathSegment]) -> Option<NodeRef<'_>> {
        let mut current = self.root();
        for seg in segments {
            current = match seg {
                PathSegment::Key(k) => current.get(k)?,
                PathSegment::Index(i) => current.index(*i)?,
            };
        }
        Some(current)
    }

    /// Converts a subtree back into a `serde_json::Value`. In the resolved
    /// view a reference that would re-enter a node on the current expansion
    /// stack is emitted as `{}`.
    #[must_use]
    pub fn materialize(&self, id: NodeId, resolution: Resolution) -> Value {
        let mut stack = Vec::new();
        self.materialize_inner(id, resolution, &mut stack)
    }

    fn materialize_inner(&self, id: NodeId, resolution: Resolution, stack: &mut Vec<NodeId>) -> Value {
        let node = self.node(id);
        if resolution == Resolution::Resolved && node.is_ref() {
            return match reference::deref(self, id) {
                Ok(target) if stack.contains(&target) => Value::Object(Map::new()),
                Ok(target) => {
                    stack.push(target);
                    let value = self.materialize_inner(target, resolution, stack);
                    stack.pop();
                    value
                }
                Err(_) => Value::Object(Map::new()),
            };
        }

        match &self.nodes[id.0].value {
            NodeValue::Null => Value::Null,
            NodeValue::Bool(b) => Value::Bool(*b),
            NodeValue::Number(n) => Value::Number(n.clone()),
            NodeValue::String(s) => Value::String(s.clone()),
            NodeValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.materialize_inner(*item, resolution, stack))
                    .collect(),
            ),
            NodeValue::Object(entries) => {
                stack.push(id);
                let map = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.materialize_inner(*v, resolution, stack)))
                    .collect();
                stack.pop();
                Value::Object(map)
            }
        }
    }
}

/// Copyable handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("location", &self.location())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn document(self) -> &'a Document {
        self.doc
    }

    /// Where the node is defined in the unresolved document.
    #[must_use]
    pub fn location(self) -> &'a DocPath {
        &self.doc.nodes[self.id.0].location
    }

    fn value(self) -> &'a NodeValue {
        &self.doc.nodes[self.id.0].value
    }

    #[must_use]
    pub fn is_object(self) -> bool {
        matches!(self.value(), NodeValue::Object(_))
    }

    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self.value(), NodeValue::Array(_))
    }

    #[must_use]
    pub fn is_null(self) -> bool {
        matches!(self.value(), NodeValue::Null)
    }

    #[must_use]
    pub fn as_str(self) -> Option<&'a str> {
        match self.value() {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self.value() {
            NodeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(self) -> Option<&'a Number> {
        match self.value() {
            NodeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Raw child lookup by key (no reference resolution).
    #[must_use]
    pub fn get(self, key: &str) -> Option<NodeRef<'a>> {
        match self.value() {
            NodeValue::Object(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, id)| NodeRef { doc: self.doc, id: *id }),
            _ => None,
        }
    }

    #[must_use]
    pub fn index(self, idx: usize) -> Option<NodeRef<'a>> {
        match self.value() {
            NodeValue::Array(items) => items.get(idx).map(|id| NodeRef { doc: self.doc, id: *id }),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains_key(self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Object entries in document order; empty for non-objects.
    pub fn entries(self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + 'a {
        let doc = self.doc;
        let entries: &'a [(String, NodeId)] = match self.value() {
            NodeValue::Object(entries) => entries,
            _ => &[],
        };
        entries
            .iter()
            .map(move |(k, id)| (k.as_str(), NodeRef { doc, id: *id }))
    }

    /// Array items in order; empty for non-arrays.
    pub fn items(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        let items: &'a [NodeId] = match self.value() {
            NodeValue::Array(items) => items,
            _ => &[],
        };
        items.iter().map(move |id| NodeRef { doc, id: *id })
    }

    /// Number of object entries or array items; zero for scalars.
    #[must_use]
    pub fn len(self) -> usize {
        match self.value() {
            NodeValue::Object(entries) => entries.len(),
            NodeValue::Array(items) => items.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// The `$ref` string if this node is a reference object.
    #[must_use]
    pub fn ref_str(self) -> Option<&'a str> {
        self.get("$ref").and_then(NodeRef::as_str)
    }

    #[must_use]
    pub fn is_ref(self) -> bool {
        self.ref_str().is_some()
    }

    /// Follows `$ref` chains to the target node.
    ///
    /// # Errors
    /// Returns [`ReferenceError`] if a reference in the chain cannot be
    /// resolved or the chain loops on itself.
    pub fn try_resolved(self) -> Result<NodeRef<'a>, ReferenceError> {
        reference::deref(self.doc, self.id).map(|id| NodeRef { doc: self.doc, id })
    }

    /// Like [`NodeRef::try_resolved`] but an unresolvable reference yields the
    /// reference object itself, which has no schema content to descend into.
    #[must_use]
    pub fn resolved(self) -> NodeRef<'a> {
        match self.try_resolved() {
            Ok(node) => node,
            Err(e) => {
                tracing::debug!("Not following reference at {}: {}", self.location(), e);
                self
            }
        }
    }

    /// Child lookup in the resolved view: both this node and the child are
    /// dereferenced.
    #[must_use]
    pub fn get_resolved(self, key: &str) -> Option<NodeRef<'a>> {
        self.resolved().get(key).map(NodeRef::resolved)
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        self.doc.materialize(self.id, Resolution::Unresolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shared_ref_doc() -> Document {
        Document::new(json!({
            "openapi": "3.0.3",
            "components": {
                "schemas": {
                    "Parent": {
                        "type": "object",
                        "properties": {
                            "one": {"$ref": "#/components/schemas/Same"},
                            "two": {"$ref": "#/components/schemas/Same"}
                        }
                    },
                    "Same": {"type": "string"}
                }
            }
        }))
    }

    #[test]
    fn test_detect_versions() {
        assert_eq!(SpecVersion::detect(&json!({"openapi": "3.1.0"})), SpecVersion::OpenApi31);
        assert_eq!(SpecVersion::detect(&json!({"openapi": "3.0.2"})), SpecVersion::OpenApi30);
        assert_eq!(SpecVersion::detect(&json!({"swagger": "2.0"})), SpecVersion::Swagger2);
        assert_eq!(SpecVersion::detect(&json!({"info": {}})), SpecVersion::Unknown);
        assert!(SpecVersion::OpenApi30.is_oas3());
        assert!(!SpecVersion::Swagger2.is_oas3());
        assert!(SpecVersion::OpenApi31.supports_pattern_properties());
        assert!(!SpecVersion::OpenApi30.supports_pattern_properties());
    }

    #[test]
    fn test_locations_are_recorded() {
        let doc = shared_ref_doc();
        let one = doc
            .root()
            .get("components")
            .and_then(|n| n.get("schemas"))
            .and_then(|n| n.get("Parent"))
            .and_then(|n| n.get("properties"))
            .and_then(|n| n.get("one"))
            .unwrap();
        assert_eq!(one.location().to_string(), "components.schemas.Parent.properties.one");
    }

    #[test]
    fn test_shared_reference_identity() {
        let doc = shared_ref_doc();
        let parent = doc
            .at_path(&[
                PathSegment::from("components"),
                PathSegment::from("schemas"),
                PathSegment::from("Parent"),
            ])
            .unwrap();
        let props = parent.get_resolved("properties").unwrap();
        let one = props.get_resolved("one").unwrap();
        let two = props.get_resolved("two").unwrap();

        assert_eq!(one, two);
        assert_eq!(one.id(), two.id());
        assert_eq!(one.location().to_string(), "components.schemas.Same");
        // The raw reference objects are still distinct nodes.
        assert_ne!(props.get("one").unwrap().id(), props.get("two").unwrap().id());
    }

    #[test]
    fn test_unresolvable_reference_stays_put() {
        let doc = Document::new(json!({"a": {"$ref": "#/missing"}}));
        let a = doc.root().get("a").unwrap();
        assert!(a.try_resolved().is_err());
        assert_eq!(a.resolved(), a);
    }

    #[test]
    fn test_materialize_round_trips_unresolved() {
        let value = json!({"b": [1, true, null, "x"], "a": {"c": 1.5}});
        let doc = Document::new(value.clone());
        assert_eq!(doc.root().to_value(), value);
        let keys: Vec<&str> = doc.root().entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_materialize_resolved_truncates_cycles() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        }));
        let node = doc
            .at_path(&[
                PathSegment::from("components"),
                PathSegment::from("schemas"),
                PathSegment::from("Node"),
            ])
            .unwrap();
        let value = doc.materialize(node.id(), Resolution::Resolved);
        assert_eq!(
            value,
            json!({"type": "object", "properties": {"next": {}}})
        );
    }
}
