//! Required-property satisfiability across composition.

use std::collections::HashSet;

use crate::document::NodeRef;
use crate::flatten::{BranchPart, flatten};
use crate::path::DocPath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedRequirement {
    pub property: String,
    /// Location of the entry in the `required` array.
    pub path: DocPath,
}

/// Lists the names required by `node` (or by one of its local composition
/// elements) that are not guaranteed to be defined.
///
/// A `required` list belongs to one part of the flattened schema. The name is
/// guaranteed when every branch containing that part defines it: `allOf`
/// elements all count, while `oneOf`/`anyOf` alternatives must each define
/// it. Lists inside referenced schemas are left to their own definition.
#[must_use]
pub fn unsatisfied_required_properties(node: NodeRef<'_>, path: &DocPath) -> Vec<UnsatisfiedRequirement> {
    let branches = flatten(node, path);
    let mut seen_parts: Vec<&BranchPart<'_>> = Vec::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();

    for part in branches.iter().flat_map(|b| b.parts.iter()) {
        if part.via_ref() || seen_parts.iter().any(|p| p.same_as(part)) {
            continue;
        }
        seen_parts.push(part);

        let Some(required) = part.node.get("required") else {
            continue;
        };
        let containing: Vec<_> = branches.iter().filter(|b| b.contains(part)).collect();
        let required_path = part.path.child("required");

        for (idx, entry) in required.items().enumerate() {
            let Some(name) = entry.as_str() else {
                continue;
            };
            if containing.iter().all(|b| b.defines(name)) {
                continue;
            }
            let entry_path = required_path.child(idx);
            if reported.insert(entry_path.clone()) {
                out.push(UnsatisfiedRequirement {
                    property: name.to_owned(),
                    path: entry_path,
                });
            }
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::{Value, json};

    fn missing(schema: Value) -> Vec<(String, String)> {
        let doc = Document::new(json!({"components": {"schemas": {"S": schema}}}));
        let path = DocPath::from_segments(["components", "schemas", "S"]);
        let node = doc.at_path(&path.segments()).unwrap();
        unsatisfied_required_properties(node, &path)
            .into_iter()
            .map(|u| (u.property, u.path.to_string()))
            .collect()
    }

    #[test]
    fn test_direct_properties_satisfy() {
        assert!(missing(json!({"required": ["a"], "properties": {"a": {}}})).is_empty());
        assert_eq!(
            missing(json!({"required": ["a", "b"], "properties": {"a": {}}})),
            vec![("b".to_owned(), "components.schemas.S.required.1".to_owned())]
        );
    }

    #[test]
    fn test_all_of_any_branch_satisfies() {
        let schema = json!({
            "required": ["foo"],
            "allOf": [{"properties": {"foo": {}}}, {"properties": {"bar": {}}}]
        });
        assert!(missing(schema).is_empty());
    }

    #[test]
    fn test_one_of_requires_every_alternative() {
        let schema = json!({
            "required": ["foo"],
            "oneOf": [{"properties": {"foo": {}}}, {"properties": {"bar": {}}}]
        });
        assert_eq!(
            missing(schema),
            vec![("foo".to_owned(), "components.schemas.S.required.0".to_owned())]
        );

        let both = json!({
            "required": ["foo"],
            "anyOf": [{"properties": {"foo": {}}}, {"properties": {"foo": {}, "bar": {}}}]
        });
        assert!(missing(both).is_empty());
    }

    #[test]
    fn test_required_inside_alternative_uses_its_own_branches() {
        let schema = json!({
            "oneOf": [
                {"required": ["foo"], "properties": {"foo": {}}},
                {"required": ["baz"], "properties": {"bar": {}}}
            ]
        });
        assert_eq!(
            missing(schema),
            vec![("baz".to_owned(), "components.schemas.S.oneOf.1.required.0".to_owned())]
        );
    }

    #[test]
    fn test_not_never_satisfies() {
        let schema = json!({"required": ["foo"], "not": {"properties": {"foo": {}}}});
        assert_eq!(missing(schema).len(), 1);
    }

    #[test]
    fn test_referenced_properties_count() {
        let doc = Document::new(json!({"components": {"schemas": {
            "Base": {"properties": {"id": {}}, "required": ["id", "ghost"]},
            "Pet": {"allOf": [{"$ref": "#/components/schemas/Base"}, {"required": ["id"]}]}
        }}}));
        let path = DocPath::from_segments(["components", "schemas", "Pet"]);
        let node = doc.at_path(&path.segments()).unwrap();
        // Base's own list is reported where Base is defined, not here.
        assert!(unsatisfied_required_properties(node, &path).is_empty());
    }

    #[test]
    fn test_self_referencing_composition_terminates() {
        let schema = json!({
            "required": ["x"],
            "allOf": [{"$ref": "#/components/schemas/S"}]
        });
        assert_eq!(missing(schema).len(), 1);
    }
}
