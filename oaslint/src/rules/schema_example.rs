use crate::document::NodeRef;
use crate::engine::{Finding, Rule, RuleContext, Severity};
use crate::example::{ExampleValidator, JsonSchemaExampleValidator};
use crate::path::DocPath;
use crate::schema::{for_each_media_type, for_each_schema};

/// Checks schema and media type examples against their schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaExampleRule<V = JsonSchemaExampleValidator> {
    validator: V,
}

impl<V: ExampleValidator> SchemaExampleRule<V> {
    #[must_use]
    pub fn new(validator: V) -> Self {
        SchemaExampleRule { validator }
    }

    fn check_example(&self, example: NodeRef<'_>, schema: NodeRef<'_>, path: &DocPath, findings: &mut Vec<Finding>) {
        let value = example.to_value();
        for error in self.validator.validate(&value, schema) {
            findings.push(Finding::new(path.clone(), format!("Example does not match the schema: {error}")));
        }
    }
}

impl<V: ExampleValidator> Rule for SchemaExampleRule<V> {
    fn name(&self) -> &str {
        "schema-example-consistency"
    }

    fn description(&self) -> &str {
        "Examples must be valid against their schema"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, _target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for_each_schema(ctx.document, &mut |visit| {
            if let Some(example) = visit.node.get("example") {
                self.check_example(example, visit.node, &visit.path.child("example"), &mut findings);
            }
            if let Some(examples) = visit.node.get("examples") {
                for (idx, example) in examples.items().enumerate() {
                    let path = visit.path.child("examples").child(idx);
                    self.check_example(example, visit.node, &path, &mut findings);
                }
            }
        });

        for_each_media_type(ctx.document, &mut |visit| {
            let Some(schema) = visit.node.get("schema") else {
                return;
            };
            if let Some(example) = visit.node.get("example") {
                self.check_example(example, schema, &visit.path.child("example"), &mut findings);
            }
            for (name, example) in visit.node.get("examples").into_iter().flat_map(NodeRef::entries) {
                let Some(value) = example.resolved().get("value") else {
                    continue;
                };
                let path = visit.path.join(["examples", name, "value"]);
                self.check_example(value, schema, &path, &mut findings);
            }
        });

        findings
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::LintConfig;
    use crate::document::Document;
    use serde_json::{Value, json};

    /// Accepts only strings.
    struct StringsOnly;

    impl ExampleValidator for StringsOnly {
        fn validate(&self, example: &Value, _schema: NodeRef<'_>) -> Vec<String> {
            if example.is_string() {
                Vec::new()
            } else {
                vec!["not a string".to_owned()]
            }
        }
    }

    #[test]
    fn test_example_locations() {
        let doc = Document::new(json!({
            "openapi": "3.1.0",
            "paths": {"/a": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"type": "string"},
                "example": 1,
                "examples": {"ok": {"value": "x"}, "bad": {"value": false}, "ext": {"externalValue": "http://x"}}
            }}}}}}},
            "components": {"schemas": {
                "S": {"type": "string", "example": "fine", "examples": ["ok", 3]}
            }}
        }));
        let config = LintConfig::default();
        let ctx = RuleContext {
            document: &doc,
            path: DocPath::root(),
            config: &config,
        };
        let rule = SchemaExampleRule::new(StringsOnly);
        let paths: Vec<String> = rule
            .check(doc.root(), &ctx)
            .into_iter()
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "components.schemas.S.examples.1",
                "paths./a.get.responses.200.content.application/json.example",
                "paths./a.get.responses.200.content.application/json.examples.bad.value",
            ]
        );
    }
}
