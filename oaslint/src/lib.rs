pub mod collision;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod example;
pub mod flatten;
pub mod fragment;
pub mod loader;
pub mod path;
pub mod reference;
pub mod required;
pub mod rules;
pub mod schema;
pub mod walker;


// Re-export commonly used types
pub use config::{LintConfig, RuleSetting};
pub use document::{Document, NodeId, NodeRef, Resolution, SpecVersion};
pub use engine::{FnRule, Finding, LintReport, Rule, RuleContext, Ruleset, Selector, Severity, Violation};
pub use error::LintError;
pub use example::{ExampleValidator, JsonSchemaExampleValidator};
pub use flatten::{FlattenedBranch, flatten};
pub use fragment::is_graph_fragment;
pub use loader::{DocumentLoader, LoadedDocument};
pub use path::{DocPath, PathSegment};
pub use reference::{ReferenceError, VisitedRefs};
pub use walker::{Step, Visitor, WalkOptions, walk, walk_with};
