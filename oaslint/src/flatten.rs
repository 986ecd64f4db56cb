//! Composition flattening.
//!
//! A schema is expanded into the list of concrete alternative shapes it can
//! take. Each [`FlattenedBranch`] is a conjunction of [`BranchPart`]s: the
//! node's own keywords plus every `allOf` element, with `oneOf`/`anyOf`
//! multiplying the branch list. `not` never contributes a part. Parts keep
//! the path they were reached through and the composition steps that led to
//! them, so callers can report on the exact element.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::document::{NodeId, NodeRef};
use crate::path::DocPath;
use crate::schema::{self, Dictionary};

/// Upper bound on the number of branches produced for one schema.
pub const MAX_BRANCHES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    AllOf,
    OneOf,
    AnyOf,
}

impl Combinator {
    pub const ALL: [Combinator; 3] = [Combinator::AllOf, Combinator::OneOf, Combinator::AnyOf];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::AllOf => "allOf",
            Combinator::OneOf => "oneOf",
            Combinator::AnyOf => "anyOf",
        }
    }

    /// `oneOf` and `anyOf` elements are alternatives; `allOf` elements all
    /// apply at once.
    #[must_use]
    pub fn is_alternative(self) -> bool {
        !matches!(self, Combinator::AllOf)
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositionStep {
    pub combinator: Combinator,
    pub index: usize,
}

/// One schema object contributing to a branch.
#[derive(Debug, Clone)]
pub struct BranchPart<'a> {
    /// The schema object, references already followed.
    pub node: NodeRef<'a>,
    /// Where the part was reached from the flattened root.
    pub path: DocPath,
    pub chain: Vec<CompositionStep>,
    /// Length of `chain` when the first `$ref` was crossed on the way to
    /// this part.
    pub ref_entry: Option<usize>,
}

impl BranchPart<'_> {
    /// The part was reached through at least one `$ref`.
    #[must_use]
    pub fn via_ref(&self) -> bool {
        self.ref_entry.is_some()
    }

    /// Composition steps from the flattened root to the outermost `$ref`
    /// crossed on the way to this part. Parts sharing it come from the same
    /// referenced schema.
    #[must_use]
    pub fn ref_site(&self) -> Option<&[CompositionStep]> {
        self.ref_entry.and_then(|entry| self.chain.get(..entry))
    }

    /// Same node reached through the same path.
    #[must_use]
    pub fn same_as(&self, other: &BranchPart<'_>) -> bool {
        self.node.id() == other.node.id() && self.path == other.path
    }
}

/// A definition of a property inside a branch.
#[derive(Debug, Clone)]
pub struct PropertyDef<'a> {
    pub schema: NodeRef<'a>,
    pub path: DocPath,
    /// Index of the defining part within the branch.
    pub part: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FlattenedBranch<'a> {
    pub parts: Vec<BranchPart<'a>>,
}

impl<'a> FlattenedBranch<'a> {
    /// Every property defined by any part, in first-seen order, with all of
    /// its definitions.
    #[must_use]
    pub fn properties(&self) -> Vec<(&'a str, Vec<PropertyDef<'a>>)> {
        let mut out: Vec<(&'a str, Vec<PropertyDef<'a>>)> = Vec::new();
        for (idx, part) in self.parts.iter().enumerate() {
            let Some(props) = part.node.get("properties") else {
                continue;
            };
            let props_path = part.path.child("properties");
            for (name, schema) in props.entries() {
                let def = PropertyDef {
                    schema,
                    path: props_path.child(name),
                    part: idx,
                };
                match out.iter_mut().find(|(existing, _)| *existing == name) {
                    Some((_, defs)) => defs.push(def),
                    None => out.push((name, vec![def])),
                }
            }
        }
        out
    }

    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.parts.iter().any(|part| {
            part.node
                .get("properties")
                .is_some_and(|props| props.contains_key(name))
        })
    }

    /// Intersection of the types declared or implied by the parts; `None`
    /// when no part constrains the type.
    #[must_use]
    pub fn declared_types(&self) -> Option<BTreeSet<String>> {
        self.parts
            .iter()
            .filter_map(|part| schema::effective_types(part.node))
            .reduce(|acc, types| acc.intersection(&types).cloned().collect())
    }

    /// The first dictionary declaration among the parts.
    #[must_use]
    pub fn dictionary(&self) -> Option<Dictionary<'a>> {
        self.parts.iter().find_map(|part| schema::dictionary(part.node))
    }

    /// Object-form `items` schemas of the parts.
    #[must_use]
    pub fn items(&self) -> Vec<NodeRef<'a>> {
        self.parts
            .iter()
            .filter_map(|part| part.node.get("items"))
            .filter(|items| items.is_object())
            .collect()
    }

    /// Every `required` name of every part.
    #[must_use]
    pub fn required(&self) -> Vec<&'a str> {
        self.parts
            .iter()
            .filter_map(|part| part.node.get("required"))
            .flat_map(NodeRef::items)
            .filter_map(NodeRef::as_str)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, part: &BranchPart<'_>) -> bool {
        self.parts.iter().any(|p| p.same_as(part))
    }

    fn conjoin(&self, other: &FlattenedBranch<'a>) -> FlattenedBranch<'a> {
        let mut parts = self.parts.clone();
        parts.extend(other.parts.iter().cloned());
        FlattenedBranch { parts }
    }
}

/// Expands `node` into its alternative branches. `path` is the location the
/// node was reached through; parts of referenced schemas continue that path.
///
/// Always returns at least one branch. References that do not resolve or
/// that close a cycle contribute nothing to their branch.
#[must_use]
pub fn flatten<'a>(node: NodeRef<'a>, path: &DocPath) -> Vec<FlattenedBranch<'a>> {
    let mut stack = HashSet::new();
    flatten_node(node, path, &[], None, &mut stack)
}

/// Flattens several schemas that apply simultaneously.
#[must_use]
pub fn flatten_all<'a>(nodes: &[(NodeRef<'a>, DocPath)]) -> Vec<FlattenedBranch<'a>> {
    let mut result = vec![FlattenedBranch::default()];
    for (node, path) in nodes {
        let branches = flatten(*node, path);
        result = product(&result, &branches);
    }
    result
}

fn flatten_node<'a>(
    node: NodeRef<'a>,
    path: &DocPath,
    chain: &[CompositionStep],
    ref_entry: Option<usize>,
    stack: &mut HashSet<NodeId>,
) -> Vec<FlattenedBranch<'a>> {
    if node.is_ref() {
        return match node.try_resolved() {
            Ok(target) if stack.contains(&target.id()) => {
                tracing::debug!("Composition cycle at {}, truncating branch", path);
                vec![FlattenedBranch::default()]
            }
            Ok(target) => flatten_node(target, path, chain, ref_entry.or(Some(chain.len())), stack),
            Err(e) => {
                tracing::debug!("Unresolvable reference at {}: {}", path, e);
                vec![FlattenedBranch::default()]
            }
        };
    }
    if !node.is_object() {
        return vec![FlattenedBranch::default()];
    }

    stack.insert(node.id());

    let mut result = vec![FlattenedBranch {
        parts: vec![BranchPart {
            node,
            path: path.clone(),
            chain: chain.to_vec(),
            ref_entry,
        }],
    }];

    for combinator in Combinator::ALL {
        let Some(elements) = node.get(combinator.keyword()) else {
            continue;
        };
        let mut alternatives = Vec::new();
        for (index, element) in elements.items().enumerate() {
            let mut element_chain = chain.to_vec();
            element_chain.push(CompositionStep { combinator, index });
            let element_path = path.child(combinator.keyword()).child(index);
            let branches = flatten_node(element, &element_path, &element_chain, ref_entry, stack);
            if combinator.is_alternative() {
                alternatives.extend(branches);
            } else {
                result = product(&result, &branches);
            }
        }
        if !alternatives.is_empty() {
            result = product(&result, &alternatives);
        }
    }

    stack.remove(&node.id());
    result
}

fn product<'a>(left: &[FlattenedBranch<'a>], right: &[FlattenedBranch<'a>]) -> Vec<FlattenedBranch<'a>> {
    let mut out = Vec::with_capacity(left.len().saturating_mul(right.len()).min(MAX_BRANCHES));
    'outer: for l in left {
        for r in right {
            if out.len() == MAX_BRANCHES {
                tracing::warn!(
                    "Schema expands to more than {} composition branches, ignoring the rest",
                    MAX_BRANCHES
                );
                break 'outer;
            }
            out.push(l.conjoin(r));
        }
    }
    out
}
