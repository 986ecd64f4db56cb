//! Built-in rules.

mod api_symmetry;
mod circular_refs;
mod pattern_properties;
mod property_collision;
mod required_property;
mod schema_example;

pub use api_symmetry::{ApiSymmetryRule, canonical_schema_names};
pub use circular_refs::CircularRefsRule;
pub use pattern_properties::PatternPropertiesRule;
pub use property_collision::PropertyCaseCollisionRule;
pub use required_property::RequiredPropertyRule;
pub use schema_example::SchemaExampleRule;

use crate::engine::Rule;
use crate::example::JsonSchemaExampleValidator;

/// Every built-in rule, in reporting order.
#[must_use]
pub fn builtin() -> Vec<Box<dyn Rule + Send + Sync>> {
    vec![
        Box::new(CircularRefsRule),
        Box::new(ApiSymmetryRule),
        Box::new(RequiredPropertyRule),
        Box::new(PropertyCaseCollisionRule),
        Box::new(PatternPropertiesRule),
        Box::new(SchemaExampleRule::new(JsonSchemaExampleValidator)),
    ]
}
