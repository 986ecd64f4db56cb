use crate::document::NodeRef;
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::reference::find_circular_references;

pub const MESSAGE: &str = "API definition should not contain circular references";

/// Reports each `$ref` that closes a reference cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularRefsRule;

impl Rule for CircularRefsRule {
    fn name(&self) -> &str {
        "circular-refs"
    }

    fn description(&self) -> &str {
        "Reference cycles between schemas or other components"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        find_circular_references(ctx.document, &ctx.config.walk_options())
            .into_iter()
            .map(|cycle| Finding::new(cycle.path, MESSAGE))
            .collect()
    }
}
