//! Generic pre-order traversal with path tracking.

use std::collections::HashSet;

use crate::document::{NodeId, NodeRef, Resolution};
use crate::path::DocPath;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Subtrees rooted at these keys are not descended into.
    pub skip_keys: HashSet<String>,
    /// Skip keys starting with `x-`.
    pub skip_vendor_extensions: bool,
    pub resolution: Resolution,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            skip_keys: ["example", "examples"].iter().map(|k| (*k).to_owned()).collect(),
            skip_vendor_extensions: true,
            resolution: Resolution::Unresolved,
        }
    }
}

impl WalkOptions {
    #[must_use]
    pub fn resolved() -> Self {
        WalkOptions {
            resolution: Resolution::Resolved,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_skip_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_vendor_extensions(mut self) -> Self {
        self.skip_vendor_extensions = false;
        self
    }

    #[must_use]
    pub fn skips(&self, key: &str) -> bool {
        self.skip_keys.contains(key) || (self.skip_vendor_extensions && key.starts_with("x-"))
    }
}

/// Whether [`walk_with`] descends into the children of an entered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Descend,
    Skip,
}

/// Callbacks driven by [`walk_with`].
pub trait Visitor<'a> {
    fn enter(&mut self, node: NodeRef<'a>, path: &DocPath) -> Step;

    /// Called after the children of a node that was entered with
    /// [`Step::Descend`].
    fn leave(&mut self, _node: NodeRef<'a>, _path: &DocPath) {}
}

struct FnVisitor<'f, F>(&'f mut F);

impl<'a, F> Visitor<'a> for FnVisitor<'_, F>
where
    F: FnMut(NodeRef<'a>, &DocPath),
{
    fn enter(&mut self, node: NodeRef<'a>, path: &DocPath) -> Step {
        (self.0)(node, path);
        Step::Descend
    }
}

/// Visits `node` and every descendant pre-order, passing the path of each
/// visited node.
///
/// With [`Resolution::Resolved`] a `$ref` object is replaced by its target
/// while the path keeps following the reference site, which yields the
/// dereferenced view of the document. A node that is already on the current
/// descent stack is neither visited nor descended into again; this is a
/// recursion boundary, not an error. Scalars and `null` are leaves.
pub fn walk<'a, F>(node: NodeRef<'a>, path: &DocPath, options: &WalkOptions, visit: &mut F)
where
    F: FnMut(NodeRef<'a>, &DocPath),
{
    walk_with(node, path, options, &mut FnVisitor(visit));
}

/// Like [`walk`], but the visitor decides per node whether to descend and is
/// told when a node's subtree is done.
pub fn walk_with<'a, V>(node: NodeRef<'a>, path: &DocPath, options: &WalkOptions, visitor: &mut V)
where
    V: Visitor<'a> + ?Sized,
{
    let mut stack = HashSet::new();
    walk_inner(node, path, options, visitor, &mut stack);
}

fn walk_inner<'a, V>(
    node: NodeRef<'a>,
    path: &DocPath,
    options: &WalkOptions,
    visitor: &mut V,
    stack: &mut HashSet<NodeId>,
) where
    V: Visitor<'a> + ?Sized,
{
    let node = match options.resolution {
        Resolution::Resolved => node.resolved(),
        Resolution::Unresolved => node,
    };
    if !stack.insert(node.id()) {
        tracing::debug!("Walk reached {} again at {}, not descending", node.location(), path);
        return;
    }

    if visitor.enter(node, path) == Step::Descend {
        for (key, child) in node.entries() {
            if options.skips(key) {
                continue;
            }
            walk_inner(child, &path.child(key), options, visitor, stack);
        }
        for (idx, item) in node.items().enumerate() {
            walk_inner(item, &path.child(idx), options, visitor, stack);
        }
        visitor.leave(node, path);
    }

    stack.remove(&node.id());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    fn collect(doc: &Document, options: &WalkOptions) -> Vec<String> {
        let mut seen = Vec::new();
        walk(doc.root(), &DocPath::root(), options, &mut |_, path| {
            seen.push(path.to_string());
        });
        seen
    }

    #[test]
    fn test_pre_order_with_indices() {
        let doc = Document::new(json!({"a": {"b": 1}, "c": [true, {"d": null}]}));
        assert_eq!(
            collect(&doc, &WalkOptions::default()),
            vec!["", "a", "a.b", "c", "c.0", "c.1", "c.1.d"]
        );
    }

    #[test]
    fn test_scalar_root_is_a_leaf() {
        let doc = Document::new(json!("just a string"));
        assert_eq!(collect(&doc, &WalkOptions::default()), vec![""]);
    }

    #[test]
    fn test_skips_examples_and_extensions() {
        let doc = Document::new(json!({
            "type": "object",
            "example": {"deep": {"deeper": 1}},
            "examples": [1, 2],
            "x-internal": {"a": 1},
            "properties": {"example": {"type": "string"}}
        }));
        let seen = collect(&doc, &WalkOptions::default());
        assert_eq!(seen, vec!["", "type", "properties"]);

        let with_ext = collect(&doc, &WalkOptions::default().with_vendor_extensions().with_skip_keys(Vec::<String>::new()));
        assert!(with_ext.contains(&"x-internal.a".to_owned()));
        assert!(with_ext.contains(&"example.deep.deeper".to_owned()));
    }

    #[test]
    fn test_resolved_walk_follows_refs_with_site_paths() {
        let doc = Document::new(json!({
            "root": {"one": {"$ref": "#/defs/Same"}, "two": {"$ref": "#/defs/Same"}},
            "defs": {"Same": {"type": "string"}}
        }));
        let root = doc.root().get("root").unwrap();
        let mut seen = Vec::new();
        walk(root, &DocPath::from_segments(["root"]), &WalkOptions::resolved(), &mut |node, path| {
            seen.push((path.to_string(), node.location().to_string()));
        });
        assert_eq!(
            seen,
            vec![
                ("root".to_owned(), "root".to_owned()),
                ("root.one".to_owned(), "defs.Same".to_owned()),
                ("root.one.type".to_owned(), "defs.Same.type".to_owned()),
                ("root.two".to_owned(), "defs.Same".to_owned()),
                ("root.two.type".to_owned(), "defs.Same.type".to_owned()),
            ]
        );
    }

    #[test]
    fn test_resolved_walk_terminates_on_cycles() {
        let doc = Document::new(json!({
            "Node": {"properties": {"next": {"$ref": "#/Node"}, "value": {"type": "integer"}}}
        }));
        let node = doc.root().get("Node").unwrap();
        let mut seen = Vec::new();
        walk(node, &DocPath::from_segments(["Node"]), &WalkOptions::resolved(), &mut |_, path| {
            seen.push(path.to_string());
        });
        assert_eq!(
            seen,
            vec![
                "Node",
                "Node.properties",
                "Node.properties.value",
                "Node.properties.value.type",
            ]
        );
    }

    struct Depths {
        depth: usize,
        entered: Vec<(String, usize)>,
    }

    impl<'a> Visitor<'a> for Depths {
        fn enter(&mut self, node: NodeRef<'a>, path: &DocPath) -> Step {
            self.entered.push((path.to_string(), self.depth));
            if node.get("stop").is_some() {
                return Step::Skip;
            }
            self.depth += 1;
            Step::Descend
        }

        fn leave(&mut self, _node: NodeRef<'a>, _path: &DocPath) {
            self.depth -= 1;
        }
    }

    #[test]
    fn test_walk_with_skip_and_leave() {
        let doc = Document::new(json!({"a": {"stop": true, "hidden": 1}, "b": [{"c": 2}]}));
        let mut visitor = Depths {
            depth: 0,
            entered: Vec::new(),
        };
        walk_with(doc.root(), &DocPath::root(), &WalkOptions::default(), &mut visitor);

        assert_eq!(visitor.depth, 0);
        assert_eq!(
            visitor.entered,
            vec![
                (String::new(), 0),
                ("a".to_owned(), 1),
                ("b".to_owned(), 1),
                ("b.0".to_owned(), 2),
                ("b.0.c".to_owned(), 3),
            ]
        );
    }
}
