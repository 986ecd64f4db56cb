use crate::collision::schema_property_collisions;
use crate::document::NodeRef;
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::schema::for_each_schema;

/// Reports property names that only differ from a sibling by case or
/// separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyCaseCollisionRule;

impl Rule for PropertyCaseCollisionRule {
    fn name(&self) -> &str {
        "property-case-collision"
    }

    fn description(&self) -> &str {
        "Property names must not differ from each other only by naming convention"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for_each_schema(ctx.document, &mut |visit| {
            if visit.is_composition_element {
                return;
            }
            for collision in schema_property_collisions(visit.node, &visit.path) {
                tracing::debug!("{} collides with {}", collision.property, collision.other);
                findings.push(Finding::new(
                    collision.path,
                    format!(
                        "Property name is identical to another property except for the naming convention: {}",
                        collision.property
                    ),
                ));
            }
        });
        findings
    }
}
