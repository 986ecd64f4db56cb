//! Reference resolution and cycle detection.

use std::collections::HashSet;
use thiserror::Error;

use crate::document::{Document, NodeId, NodeRef, Resolution};
use crate::path::DocPath;
use crate::walker::{Step, Visitor, WalkOptions, walk_with};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Reference '{0}' does not point to an existing location")]
    NotFound(String),
    #[error("External reference '{0}' is not supported")]
    External(String),
    #[error("Reference chain through '{0}' never reaches a schema")]
    Circular(String),
}

/// Splits a local JSON pointer reference (`#/a/b~1c`) into unescaped tokens.
///
/// # Errors
/// Returns [`ReferenceError::External`] for references that do not start with
/// `#`, and [`ReferenceError::NotFound`] for fragments that are not pointers
/// (e.g. plain-name anchors).
pub fn parse_pointer(reference: &str) -> Result<Vec<String>, ReferenceError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(ReferenceError::External(reference.to_owned()));
    };
    if fragment.is_empty() {
        return Ok(Vec::new());
    }
    let Some(pointer) = fragment.strip_prefix('/') else {
        return Err(ReferenceError::NotFound(reference.to_owned()));
    };
    Ok(pointer
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Locates the node a reference string points at.
///
/// # Errors
/// See [`Document::ref_target`].
pub fn resolve(document: &Document, reference: &str) -> Result<NodeId, ReferenceError> {
    document.ref_target(reference)
}

/// Follows a chain of reference objects starting at `id` until a node that is
/// not a reference is reached.
///
/// # Errors
/// Returns the first resolution failure in the chain, or
/// [`ReferenceError::Circular`] when the chain revisits one of its own links.
pub fn deref(document: &Document, id: NodeId) -> Result<NodeId, ReferenceError> {
    let mut current = id;
    let mut chain = HashSet::new();
    while let Some(reference) = document.node(current).ref_str() {
        if !chain.insert(current) {
            return Err(ReferenceError::Circular(reference.to_owned()));
        }
        current = document.ref_target(reference)?;
    }
    Ok(current)
}

/// Call-scoped bookkeeping for reference traversal.
///
/// One instance is created per top-level rule invocation and threaded through
/// the recursion: `active` holds the nodes on the current descent stack,
/// `reported` the reference sites that were already turned into findings.
#[derive(Debug, Default)]
pub struct VisitedRefs {
    active: HashSet<NodeId>,
    reported: HashSet<NodeId>,
}

impl VisitedRefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `target` as being descended into. Returns `false` if it already
    /// was, i.e. descending again would loop.
    pub fn enter(&mut self, target: NodeId) -> bool {
        self.active.insert(target)
    }

    pub fn leave(&mut self, target: NodeId) {
        self.active.remove(&target);
    }

    #[must_use]
    pub fn is_circular(&self, target: NodeId) -> bool {
        self.active.contains(&target)
    }

    /// Records a reference site as reported. Returns `true` the first time.
    pub fn mark_reported(&mut self, site: NodeId) -> bool {
        self.reported.insert(site)
    }
}

/// A reference site whose target is an ancestor of the site in the resolved
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularReference {
    /// Location of the `$ref` value itself.
    pub path: DocPath,
    pub reference: String,
    pub target: NodeId,
}

/// Finds every reference site that closes a cycle, each reported once.
///
/// Reference sites are followed in place of the walker's own resolution, so
/// the resolution mode of `options` is ignored.
#[must_use]
pub fn find_circular_references(
    document: &Document,
    options: &WalkOptions,
) -> Vec<CircularReference> {
    let options = WalkOptions {
        resolution: Resolution::Unresolved,
        ..options.clone()
    };
    let mut search = CycleSearch {
        document,
        options: &options,
        visited: VisitedRefs::new(),
        finished: HashSet::new(),
        found: Vec::new(),
    };
    walk_with(document.root(), &DocPath::root(), &options, &mut search);
    tracing::debug!("Found {} circular reference sites", search.found.len());
    search.found
}

struct CycleSearch<'a, 'o> {
    document: &'a Document,
    options: &'o WalkOptions,
    visited: VisitedRefs,
    finished: HashSet<NodeId>,
    found: Vec<CircularReference>,
}

impl<'a> CycleSearch<'a, '_> {
    /// Follows one reference site. The site stays active while its target is
    /// searched, so chains made only of references close as well.
    fn follow(&mut self, site: NodeRef<'a>, reference: &str) {
        match self.document.ref_target(reference) {
            Ok(target) if self.visited.is_circular(target) => {
                if self.visited.mark_reported(site.id()) {
                    self.found.push(CircularReference {
                        path: site.location().child("$ref"),
                        reference: reference.to_owned(),
                        target,
                    });
                }
            }
            Ok(target) => {
                self.visited.enter(site.id());
                let target = self.document.node(target);
                let options = self.options;
                walk_with(target, target.location(), options, self);
                self.visited.leave(site.id());
            }
            Err(e) => tracing::debug!("Skipping reference at {}: {}", site.location(), e),
        }
    }
}

impl<'a> Visitor<'a> for CycleSearch<'a, '_> {
    fn enter(&mut self, node: NodeRef<'a>, _path: &DocPath) -> Step {
        if self.finished.contains(&node.id()) {
            return Step::Skip;
        }
        if let Some(reference) = node.ref_str() {
            self.follow(node, reference);
            self.finished.insert(node.id());
            return Step::Skip;
        }
        if self.visited.enter(node.id()) {
            Step::Descend
        } else {
            Step::Skip
        }
    }

    fn leave(&mut self, node: NodeRef<'a>, _path: &DocPath) {
        self.visited.leave(node.id());
        self.finished.insert(node.id());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pointer() {
        assert_eq!(
            parse_pointer("#/components/schemas/Pet").unwrap(),
            vec!["components", "schemas", "Pet"]
        );
        assert_eq!(parse_pointer("#/paths/~1pets~0x").unwrap(), vec!["paths", "/pets~x"]);
        assert!(parse_pointer("#").unwrap().is_empty());
        assert_eq!(
            parse_pointer("other.yaml#/Pet"),
            Err(ReferenceError::External("other.yaml#/Pet".to_owned()))
        );
        assert!(matches!(parse_pointer("#anchor"), Err(ReferenceError::NotFound(_))));
    }

    #[test]
    fn test_resolve_and_not_found() {
        let doc = Document::new(json!({"a": {"b": [10, 20]}}));
        let id = resolve(&doc, "#/a/b/1").unwrap();
        assert_eq!(doc.node(id).as_number().unwrap().as_i64(), Some(20));
        assert_eq!(
            resolve(&doc, "#/a/c"),
            Err(ReferenceError::NotFound("#/a/c".to_owned()))
        );
    }

    #[test]
    fn test_deref_chain_and_loop() {
        let doc = Document::new(json!({
            "A": {"$ref": "#/B"},
            "B": {"$ref": "#/C"},
            "C": {"type": "string"},
            "X": {"$ref": "#/Y"},
            "Y": {"$ref": "#/X"}
        }));
        let a = doc.root().get("A").unwrap();
        let c = doc.root().get("C").unwrap();
        assert_eq!(deref(&doc, a.id()).unwrap(), c.id());

        let x = doc.root().get("X").unwrap();
        assert!(matches!(deref(&doc, x.id()), Err(ReferenceError::Circular(_))));
    }

    #[test]
    fn test_visited_refs() {
        let doc = Document::new(json!({"a": 1}));
        let id = doc.root().id();
        let mut visited = VisitedRefs::new();
        assert!(!visited.is_circular(id));
        assert!(visited.enter(id));
        assert!(!visited.enter(id));
        assert!(visited.is_circular(id));
        visited.leave(id);
        assert!(!visited.is_circular(id));
        assert!(visited.mark_reported(id));
        assert!(!visited.mark_reported(id));
    }

    #[test]
    fn test_self_reference_reported_once() {
        let doc = Document::new(json!({
            "openapi": "3.0.0",
            "paths": {
                "/nodes": {"get": {"responses": {"200": {"content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/Node"}
                }}}}}}
            },
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "next": {"$ref": "#/components/schemas/Node"},
                        "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                    }
                }
            }}
        }));
        let cycles = find_circular_references(&doc, &WalkOptions::default());
        let paths: Vec<String> = cycles.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "components.schemas.Node.properties.next.$ref",
                "components.schemas.Node.properties.children.items.$ref",
            ]
        );
    }

    #[test]
    fn test_chain_cycle_reports_single_closing_edge() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "A": {"properties": {"b": {"$ref": "#/components/schemas/B"}}},
                "B": {"properties": {"c": {"$ref": "#/components/schemas/C"}}},
                "C": {"properties": {"a": {"$ref": "#/components/schemas/A"}}}
            }}
        }));
        let cycles = find_circular_references(&doc, &WalkOptions::default());
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path.to_string(), "components.schemas.C.properties.a.$ref");
        assert_eq!(cycles[0].reference, "#/components/schemas/A");
    }

    #[test]
    fn test_acyclic_shared_references_not_reported() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "Parent": {"properties": {
                    "one": {"$ref": "#/components/schemas/Same"},
                    "two": {"$ref": "#/components/schemas/Same"}
                }},
                "Same": {"type": "string"}
            }}
        }));
        assert!(find_circular_references(&doc, &WalkOptions::default()).is_empty());
    }

    #[test]
    fn test_examples_are_skipped() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "A": {
                    "type": "object",
                    "example": {"self": {"$ref": "#/components/schemas/A"}}
                }
            }}
        }));
        assert!(find_circular_references(&doc, &WalkOptions::default()).is_empty());
    }

    #[test]
    fn test_schema_referencing_itself_directly() {
        let doc = Document::new(json!({
            "components": {"schemas": {"A": {"$ref": "#/components/schemas/A"}}}
        }));
        let cycles = find_circular_references(&doc, &WalkOptions::default());
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path.to_string(), "components.schemas.A.$ref");
        assert_eq!(cycles[0].target, doc.root().get("components").unwrap().get("schemas").unwrap().get("A").unwrap().id());
    }

    #[test]
    fn test_cycle_of_bare_references() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "X": {"$ref": "#/components/schemas/Y"},
                "Y": {"$ref": "#/components/schemas/X"},
                "Z": {"properties": {"x": {"$ref": "#/components/schemas/X"}}}
            }}
        }));
        let cycles = find_circular_references(&doc, &WalkOptions::default());
        let paths: Vec<String> = cycles.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(paths, vec!["components.schemas.Y.$ref"]);
    }

    #[test]
    fn test_resolution_mode_of_options_is_ignored() {
        let doc = Document::new(json!({
            "components": {"schemas": {
                "Node": {"properties": {"next": {"$ref": "#/components/schemas/Node"}}}
            }}
        }));
        let cycles = find_circular_references(&doc, &WalkOptions::resolved());
        assert_eq!(cycles.len(), 1);
    }
}
