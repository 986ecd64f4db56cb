use crate::document::NodeRef;
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::required::unsatisfied_required_properties;
use crate::schema::for_each_schema;

/// Reports `required` names that no applicable schema defines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredPropertyRule;

impl Rule for RequiredPropertyRule {
    fn name(&self) -> &str {
        "required-property-missing"
    }

    fn description(&self) -> &str {
        "Required properties must be defined in the schema"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for_each_schema(ctx.document, &mut |visit| {
            // Composition elements are evaluated together with their parent.
            if visit.is_composition_element {
                return;
            }
            for missing in unsatisfied_required_properties(visit.node, &visit.path) {
                findings.push(Finding::new(
                    missing.path,
                    format!("Required property must be defined in the schema: {}", missing.property),
                ));
            }
        });
        findings
    }
}
