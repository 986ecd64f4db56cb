use crate::document::{Document, NodeRef};
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::fragment::is_graph_fragment;
use crate::path::DocPath;

pub const MESSAGE: &str = "Variant schema should be a graph fragment of the canonical schema";

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Checks that `Summary`/`Prototype`/`Patch` style variants of a resource
/// schema only describe data the canonical resource schema also describes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiSymmetryRule;

impl Rule for ApiSymmetryRule {
    fn name(&self) -> &str {
        "api-symmetry"
    }

    fn description(&self) -> &str {
        "Variant schemas must be graph fragments of their canonical schema"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        if !ctx.version().is_oas3() {
            return Vec::new();
        }
        let Some(schemas) = ctx
            .document
            .root()
            .get("components")
            .and_then(|c| c.get("schemas"))
        else {
            return Vec::new();
        };
        let schemas_path = DocPath::from_segments(["components", "schemas"]);

        let mut findings = Vec::new();
        for canonical_name in canonical_schema_names(ctx.document) {
            let Some(canonical) = schemas.get(&canonical_name) else {
                continue;
            };
            for suffix in &ctx.config.variant_suffixes {
                let variant_name = format!("{canonical_name}{suffix}");
                let Some(variant) = schemas.get(&variant_name) else {
                    continue;
                };
                if is_graph_fragment(variant, canonical) {
                    tracing::debug!("{} is a graph fragment of {}", variant_name, canonical_name);
                } else {
                    findings.push(Finding::new(schemas_path.child(variant_name), MESSAGE));
                }
            }
        }
        findings
    }
}

/// Names of the schemas returned by `GET` on single-resource paths (paths
/// ending in a path parameter), taken from JSON `2xx` responses that
/// reference `#/components/schemas/<name>` directly.
#[must_use]
pub fn canonical_schema_names(document: &Document) -> Vec<String> {
    let mut names = Vec::new();
    let Some(paths) = document.root().get("paths") else {
        return names;
    };

    for (path_key, path_item) in paths.entries() {
        if !ends_with_path_parameter(path_key) {
            continue;
        }
        let Some(operation) = path_item.get_resolved("get") else {
            continue;
        };
        for (status, response) in operation.get("responses").into_iter().flat_map(NodeRef::entries) {
            if !status.starts_with('2') {
                continue;
            }
            let response = response.resolved();
            for (media_type, content) in response.get("content").into_iter().flat_map(NodeRef::entries) {
                if !is_json_media_type(media_type) {
                    continue;
                }
                let Some(name) = content
                    .get("schema")
                    .and_then(NodeRef::ref_str)
                    .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
                    .filter(|name| !name.contains('/'))
                else {
                    continue;
                };
                let name = name.replace("~1", "/").replace("~0", "~");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    names
}

fn ends_with_path_parameter(path: &str) -> bool {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment.starts_with('{') && segment.ends_with('}'))
}

fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
