use crate::document::NodeRef;
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::schema::for_each_schema;

/// Validates `patternProperties` declarations: OpenAPI 3.1 only, an object
/// with exactly one valid regular expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternPropertiesRule;

impl Rule for PatternPropertiesRule {
    fn name(&self) -> &str {
        "pattern-properties"
    }

    fn description(&self) -> &str {
        "patternProperties must be a single valid pattern in OpenAPI 3.1 documents"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let supported = ctx.version().supports_pattern_properties();
        let mut findings = Vec::new();

        for_each_schema(ctx.document, &mut |visit| {
            let Some(pattern_properties) = visit.node.get("patternProperties") else {
                return;
            };
            let path = visit.path.child("patternProperties");

            if !supported {
                findings.push(Finding::new(
                    path.clone(),
                    "patternProperties is only supported in OpenAPI 3.1 and later",
                ));
            }
            if !pattern_properties.is_object() {
                findings.push(Finding::new(path, "patternProperties must be an object"));
                return;
            }
            match pattern_properties.len() {
                0 => findings.push(Finding::new(path.clone(), "patternProperties must not be empty")),
                1 => {}
                _ => findings.push(Finding::new(
                    path.clone(),
                    "patternProperties must define exactly one pattern",
                )),
            }
            for (pattern, _) in pattern_properties.entries() {
                if let Err(e) = regex::Regex::new(pattern) {
                    tracing::debug!("Invalid pattern {}: {}", pattern, e);
                    findings.push(Finding::new(
                        path.child(pattern),
                        format!("patternProperties key is not a valid regular expression: {pattern}"),
                    ));
                }
            }
        });
        findings
    }
}
