//! Property names that differ only by naming convention.

use std::collections::HashSet;

use crate::document::NodeRef;
use crate::flatten::{PropertyDef, flatten};
use crate::path::DocPath;
use crate::schema;

/// Case- and separator-insensitive form of a property name.
#[must_use]
pub fn normalize_property_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pairs `(first, other)` of distinct names that normalize to the same form,
/// `first` being the earliest name of its group.
#[must_use]
pub fn find_collisions<'n, I>(names: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = &'n str>,
{
    let mut groups: Vec<(String, Vec<&'n str>)> = Vec::new();
    for name in names {
        let normalized = normalize_property_name(name);
        match groups.iter_mut().find(|(key, _)| *key == normalized) {
            Some((_, members)) => {
                if !members.contains(&name) {
                    members.push(name);
                }
            }
            None => groups.push((normalized, vec![name])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(_, members)| {
            let first = members[0];
            members[1..]
                .iter()
                .map(move |other| (first.to_owned(), (*other).to_owned()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCollision {
    /// The property being reported.
    pub property: String,
    /// The property it collides with.
    pub other: String,
    /// Location of the reported property definition.
    pub path: DocPath,
}

/// Collisions among the properties visible at one schema level.
///
/// Property names are gathered per flattened branch. Deprecated properties
/// are exempt. Properties defined locally (not through a `$ref`) are
/// reported; when every member of a colliding group is local, the earliest
/// one is kept and the rest are reported. A group defined entirely through
/// references is reported here only when its members come from different
/// referenced schemas; otherwise the referenced schema reports it itself.
#[must_use]
pub fn schema_property_collisions(node: NodeRef<'_>, path: &DocPath) -> Vec<PropertyCollision> {
    let mut reported = HashSet::new();
    let mut out = Vec::new();

    for branch in flatten(node, path) {
        let props: Vec<_> = branch
            .properties()
            .into_iter()
            .filter(|(_, defs)| !defs.iter().any(|def| schema::is_deprecated(def.schema)))
            .collect();

        let defs_of = |name: &str| props.iter().find(|(n, _)| *n == name).map(|(_, defs)| defs.as_slice());
        let local_def = |name: &str| defs_of(name).and_then(|defs| defs.iter().find(|def| !branch.parts[def.part].via_ref()));
        let first_def = |name: &str| defs_of(name).and_then(<[_]>::first);

        let mut groups: Vec<Vec<&str>> = Vec::new();
        for (first, other) in find_collisions(props.iter().map(|(n, _)| *n)) {
            let first = props.iter().map(|(n, _)| *n).find(|n| *n == first);
            let other = props.iter().map(|(n, _)| *n).find(|n| *n == other);
            let (Some(first), Some(other)) = (first, other) else {
                continue;
            };
            match groups.iter_mut().find(|g| g[0] == first) {
                Some(group) => group.push(other),
                None => groups.push(vec![first, other]),
            }
        }

        for group in groups {
            let all_local = group.iter().all(|name| local_def(*name).is_some());
            let none_local = group.iter().all(|name| local_def(*name).is_none());

            let targets: Vec<(&str, &PropertyDef<'_>)> = if none_local {
                let sites: Vec<_> = group
                    .iter()
                    .filter_map(|name| first_def(*name))
                    .map(|def| branch.parts[def.part].ref_site())
                    .collect();
                if sites.windows(2).all(|pair| pair[0] == pair[1]) {
                    continue;
                }
                group[1..]
                    .iter()
                    .filter_map(|name| first_def(*name).map(|def| (*name, def)))
                    .collect()
            } else {
                let candidates = if all_local { &group[1..] } else { &group[..] };
                candidates
                    .iter()
                    .filter_map(|name| local_def(*name).map(|def| (*name, def)))
                    .collect()
            };

            for (name, def) in targets {
                if !reported.insert(def.path.clone()) {
                    continue;
                }
                let other = group.iter().find(|n| **n != name).copied().unwrap_or_default();
                out.push(PropertyCollision {
                    property: name.to_owned(),
                    other: other.to_owned(),
                    path: def.path.clone(),
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
    use serde_json::json;

    fn collisions(schemas: serde_json::Value, name: &str) -> Vec<(String, String)> {
        let doc = Document::new(json!({"components": {"schemas": schemas}}));
        let path = DocPath::from_segments(["components", "schemas", name]);
        let node = doc.at_path(&path.segments()).unwrap();
        schema_property_collisions(node, &path)
            .into_iter()
            .map(|c| (c.property, c.path.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_property_name() {
        assert_eq!(normalize_property_name("IMDB_rating"), "imdbrating");
        assert_eq!(normalize_property_name("IMDBRating"), "imdbrating");
        assert_eq!(normalize_property_name("imdb-rating"), "imdbrating");
        assert_eq!(normalize_property_name("imdb.rating "), "imdbrating");
    }

    #[test]
    fn test_find_collisions() {
        let pairs = find_collisions(["userId", "name", "user_id", "USER-ID", "userId"]);
        assert_eq!(
            pairs,
            vec![
                ("userId".to_owned(), "user_id".to_owned()),
                ("userId".to_owned(), "USER-ID".to_owned()),
            ]
        );
        assert!(find_collisions(["a", "b"]).is_empty());
    }

    #[test]
    fn test_case_collision_reported_at_later_property() {
        let found = collisions(
            json!({"Movie": {"properties": {"IMDBRating": {"type": "number"}, "IMDB_rating": {"type": "number"}}}}),
            "Movie",
        );
        assert_eq!(
            found,
            vec![(
                "IMDB_rating".to_owned(),
                "components.schemas.Movie.properties.IMDB_rating".to_owned()
            )]
        );
    }

    #[test]
    fn test_deprecated_partner_is_exempt() {
        let found = collisions(
            json!({"Movie": {"properties": {
                "IMDBRating": {"type": "number", "deprecated": true},
                "IMDB_rating": {"type": "number"}
            }}}),
            "Movie",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_deprecated_through_reference_is_exempt() {
        let found = collisions(
            json!({
                "Legacy": {"type": "string", "deprecated": true},
                "Movie": {"properties": {
                    "title": {"type": "string"},
                    "Title": {"$ref": "#/components/schemas/Legacy"}
                }}
            }),
            "Movie",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_collision_across_composition_reports_local_property() {
        let found = collisions(
            json!({
                "Base": {"properties": {"createdAt": {"type": "string"}}},
                "Pet": {"allOf": [
                    {"$ref": "#/components/schemas/Base"},
                    {"properties": {"created_at": {"type": "string"}}}
                ]}
            }),
            "Pet",
        );
        assert_eq!(
            found,
            vec![(
                "created_at".to_owned(),
                "components.schemas.Pet.allOf.1.properties.created_at".to_owned()
            )]
        );
    }

    #[test]
    fn test_alternatives_do_not_collide_with_each_other() {
        let found = collisions(
            json!({"Pet": {"oneOf": [
                {"properties": {"petName": {}}},
                {"properties": {"pet_name": {}}}
            ]}}),
            "Pet",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_levels_are_separate() {
        let found = collisions(
            json!({"Pet": {"properties": {
                "owner": {"properties": {"Owner": {}}},
                "name": {}
            }}}),
            "Pet",
        );
        assert!(found.is_empty());
    }

    fn audit_schemas() -> serde_json::Value {
        json!({
            "Audit": {"properties": {"createdAt": {"type": "string"}}},
            "Legacy": {"properties": {"created_at": {"type": "string"}}},
            "Pet": {"allOf": [
                {"$ref": "#/components/schemas/Audit"},
                {"$ref": "#/components/schemas/Legacy"}
            ]},
            "Dog": {"allOf": [{"$ref": "#/components/schemas/Pet"}]}
        })
    }

    #[test]
    fn test_collision_between_referenced_parts_reported_at_composing_schema() {
        assert!(collisions(audit_schemas(), "Audit").is_empty());
        assert!(collisions(audit_schemas(), "Legacy").is_empty());
        assert_eq!(
            collisions(audit_schemas(), "Pet"),
            vec![(
                "created_at".to_owned(),
                "components.schemas.Pet.allOf.1.properties.created_at".to_owned()
            )]
        );
    }

    #[test]
    fn test_collision_inside_one_referenced_schema_left_to_it() {
        assert!(collisions(audit_schemas(), "Dog").is_empty());

        let found = collisions(
            json!({
                "Movie": {"properties": {"IMDBRating": {}, "IMDB_rating": {}}},
                "Film": {"allOf": [{"$ref": "#/components/schemas/Movie"}]}
            }),
            "Film",
        );
        assert!(found.is_empty());
    }
}
