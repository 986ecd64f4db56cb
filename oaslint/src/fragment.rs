//! Structural subset checking between a variant schema and its canonical
//! schema.
//!
//! A variant is a graph fragment of the canonical schema when every concrete
//! shape the variant can take corresponds to some shape of the canonical
//! schema: each variant property exists in the canonical schema (directly or
//! through a dictionary declaration) with a compatible type, recursively.
//! Properties marked `writeOnly` are exempt at every level.

use std::collections::{BTreeSet, HashSet};

use crate::document::{NodeId, NodeRef};
use crate::flatten::{FlattenedBranch, PropertyDef, flatten};
use crate::schema;

/// Whether `variant` is a graph fragment of `canonical`.
#[must_use]
pub fn is_graph_fragment(variant: NodeRef<'_>, canonical: NodeRef<'_>) -> bool {
    let mut checker = FragmentChecker::default();
    checker.schema_fits(variant, canonical)
}

#[derive(Default)]
struct FragmentChecker {
    /// Schema pairs currently being compared. Meeting one again means the
    /// comparison went around a reference cycle; the pair is assumed to fit.
    in_progress: HashSet<(NodeId, NodeId)>,
}

impl FragmentChecker {
    fn schema_fits(&mut self, variant: NodeRef<'_>, canonical: NodeRef<'_>) -> bool {
        let variant = variant.resolved();
        let canonical = canonical.resolved();
        if variant == canonical {
            return true;
        }

        let key = (variant.id(), canonical.id());
        if !self.in_progress.insert(key) {
            tracing::debug!(
                "Comparison of {} against {} is already in progress",
                variant.location(),
                canonical.location()
            );
            return true;
        }

        let variant_branches = flatten(variant, variant.location());
        let canonical_branches = flatten(canonical, canonical.location());
        let fits = variant_branches.iter().all(|vb| {
            canonical_branches
                .iter()
                .any(|cb| self.branch_fits(vb, cb))
        });

        self.in_progress.remove(&key);
        fits
    }

    fn branch_fits(&mut self, variant: &FlattenedBranch<'_>, canonical: &FlattenedBranch<'_>) -> bool {
        if !types_compatible(variant.declared_types(), canonical.declared_types()) {
            return false;
        }

        let canonical_props = canonical.properties();
        let canonical_dict = canonical.dictionary();
        let variant_props = variant.properties();

        for (name, defs) in &variant_props {
            if defs.iter().any(|def| schema::is_write_only(def.schema)) {
                continue;
            }
            let canonical_defs = canonical_props
                .iter()
                .find(|(cname, _)| cname == name)
                .map(|(_, cdefs)| cdefs);
            let fits = match canonical_defs {
                Some(cdefs) => self.defs_fit(defs, cdefs),
                None => match canonical_dict.as_ref() {
                    Some(dict) if dict.admits(name) => defs
                        .iter()
                        .all(|def| self.schema_fits(def.schema, dict.value_schema)),
                    _ => false,
                },
            };
            if !fits {
                tracing::debug!("Variant property '{}' has no counterpart in the canonical schema", name);
                return false;
            }
        }

        for name in variant.required() {
            if variant_props.iter().any(|(vname, _)| *vname == name) {
                continue;
            }
            let known = canonical.defines(name) || canonical_dict.as_ref().is_some_and(|dict| dict.admits(name));
            if !known {
                tracing::debug!("Variant requires '{}' which the canonical schema does not define", name);
                return false;
            }
        }

        if let Some(variant_dict) = variant.dictionary() {
            let Some(canonical_dict) = &canonical_dict else {
                return false;
            };
            if !self.schema_fits(variant_dict.value_schema, canonical_dict.value_schema) {
                return false;
            }
        }

        let canonical_items = canonical.items();
        if !canonical_items.is_empty() {
            for items in variant.items() {
                if !canonical_items.iter().any(|citems| self.schema_fits(items, *citems)) {
                    return false;
                }
            }
        }

        true
    }

    /// Every variant definition of a property must fit some canonical
    /// definition of it.
    fn defs_fit(&mut self, variant: &[PropertyDef<'_>], canonical: &[PropertyDef<'_>]) -> bool {
        variant.iter().all(|vdef| {
            canonical
                .iter()
                .any(|cdef| self.schema_fits(vdef.schema, cdef.schema))
        })
    }
}

/// Variant types must be a subset of canonical types; `null` is ignored on
/// both sides, and a side without type constraints accepts anything.
fn types_compatible(variant: Option<BTreeSet<String>>, canonical: Option<BTreeSet<String>>) -> bool {
    let (Some(mut variant), Some(mut canonical)) = (variant, canonical) else {
        return true;
    };
    variant.remove("null");
    canonical.remove("null");
    if variant.contains("integer") && canonical.contains("number") {
        variant.remove("integer");
    }
    variant.is_subset(&canonical)
}
