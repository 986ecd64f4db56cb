//! Rule host: selectors, rule trait, rule sets and reports.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::LintConfig;
use crate::document::{Document, NodeRef, Resolution, SpecVersion};
use crate::error::LintError;
use crate::path::{self, DocPath, PathSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub path: Vec<PathSegment>,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    /// The path joined with dots.
    #[must_use]
    pub fn dotted_path(&self) -> String {
        let parts: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        parts.join(".")
    }
}

/// What a rule reports; the host turns findings into [`Violation`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: DocPath,
    pub message: String,
}

impl Finding {
    #[must_use]
    pub fn new(path: DocPath, message: impl Into<String>) -> Self {
        Finding {
            path,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub errors: Vec<Violation>,
    pub warnings: Vec<Violation>,
    pub infos: Vec<Violation>,
}

impl LintReport {
    pub fn push(&mut self, violation: Violation) {
        match violation.severity {
            Severity::Error => self.errors.push(violation),
            Severity::Warning => self.warnings.push(violation),
            Severity::Info => self.infos.push(violation),
        }
    }

    pub fn merge(&mut self, other: LintReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.infos.extend(other.infos);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.infos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every violation, errors first.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.errors.iter().chain(&self.warnings).chain(&self.infos)
    }
}

/// What a rule sees for one matched node.
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub document: &'a Document,
    /// Where the node was matched.
    pub path: DocPath,
    pub config: &'a LintConfig,
}

impl RuleContext<'_> {
    #[must_use]
    pub fn version(&self) -> SpecVersion {
        self.document.version()
    }
}

pub trait Rule {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn default_severity(&self) -> Severity;

    /// Nodes the rule is invoked on. Defaults to the document root.
    fn given(&self) -> Vec<Selector> {
        vec![Selector::root()]
    }

    /// Whether selectors are matched against the resolved view.
    fn resolved(&self) -> bool {
        false
    }

    fn check(&self, target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SelectorStep {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A JSONPath-like node selector: `$`, `.key`, `.*`, `[n]`, `['key']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    steps: Vec<SelectorStep>,
}

impl Selector {
    #[must_use]
    pub fn root() -> Self {
        Selector {
            raw: "$".to_owned(),
            steps: Vec::new(),
        }
    }

    /// # Errors
    /// Returns [`LintError::InvalidSelector`] if the expression does not start
    /// at the document root (`$`).
    pub fn parse(expr: &str) -> Result<Self, LintError> {
        let Some(rest) = expr.trim().strip_prefix('$') else {
            return Err(LintError::InvalidSelector(expr.to_owned()));
        };
        let steps = path::parse_dotted(rest)
            .into_iter()
            .map(|seg| match seg {
                PathSegment::Key(k) if k == "*" => SelectorStep::Wildcard,
                PathSegment::Key(k) => SelectorStep::Key(k),
                PathSegment::Index(i) => SelectorStep::Index(i),
            })
            .collect();
        Ok(Selector {
            raw: expr.trim().to_owned(),
            steps,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Nodes matched in `document`, each with the path it was reached by.
    #[must_use]
    pub fn select<'a>(&self, document: &'a Document, resolution: Resolution) -> Vec<(NodeRef<'a>, DocPath)> {
        let step_into = |node: NodeRef<'a>| match resolution {
            Resolution::Resolved => node.resolved(),
            Resolution::Unresolved => node,
        };

        let mut current = vec![(step_into(document.root()), DocPath::root())];
        for step in &self.steps {
            let mut next = Vec::new();
            for (node, node_path) in current {
                match step {
                    SelectorStep::Key(key) => {
                        if let Some(child) = node.get(key) {
                            next.push((step_into(child), node_path.child(key)));
                        }
                    }
                    SelectorStep::Index(idx) => {
                        if let Some(child) = node.index(*idx) {
                            next.push((step_into(child), node_path.child(*idx)));
                        } else if let Some(child) = node.get(&idx.to_string()) {
                            next.push((step_into(child), node_path.child(idx.to_string())));
                        }
                    }
                    SelectorStep::Wildcard => {
                        for (key, child) in node.entries() {
                            next.push((step_into(child), node_path.child(key)));
                        }
                        for (idx, child) in node.items().enumerate() {
                            next.push((step_into(child), node_path.child(idx)));
                        }
                    }
                }
            }
            current = next;
        }
        current
    }
}

impl FromStr for Selector {
    type Err = LintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

type CheckFn = dyn Fn(NodeRef<'_>, &RuleContext<'_>) -> Vec<Finding> + Send + Sync;

/// A rule backed by a closure.
pub struct FnRule {
    name: String,
    description: String,
    severity: Severity,
    given: Vec<Selector>,
    resolved: bool,
    check: Box<CheckFn>,
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("severity", &self.severity)
            .field("given", &self.given)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl FnRule {
    #[must_use]
    pub fn new<F>(name: impl Into<String>, severity: Severity, given: Vec<Selector>, check: F) -> Self
    where
        F: Fn(NodeRef<'_>, &RuleContext<'_>) -> Vec<Finding> + Send + Sync + 'static,
    {
        FnRule {
            name: name.into(),
            description: String::new(),
            severity,
            given,
            resolved: false,
            check: Box::new(check),
        }
    }

    #[must_use]
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Rule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn given(&self) -> Vec<Selector> {
        self.given.clone()
    }

    fn resolved(&self) -> bool {
        self.resolved
    }

    fn check(&self, target: NodeRef<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
        (self.check)(target, ctx)
    }
}

/// An ordered collection of rules.
#[derive(Default)]
pub struct Ruleset {
    rules: Vec<Box<dyn Rule + Send + Sync>>,
}

impl fmt::Debug for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("Ruleset").field("rules", &names).finish()
    }
}

impl Ruleset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules.
    #[must_use]
    pub fn recommended() -> Self {
        crate::rules::builtin()
            .into_iter()
            .fold(Self::new(), |set, rule| set.with_boxed(rule))
    }

    #[must_use]
    pub fn with_rule<R: Rule + Send + Sync + 'static>(mut self, rule: R) -> Self {
        self.add(rule);
        self
    }

    #[must_use]
    fn with_boxed(mut self, rule: Box<dyn Rule + Send + Sync>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add<R: Rule + Send + Sync + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    #[must_use]
    pub fn rules(&self) -> &[Box<dyn Rule + Send + Sync>] {
        &self.rules
    }

    /// Runs every enabled rule against `document`.
    ///
    /// Each rule is invoked once per distinct matched path. Identical findings
    /// of one rule are reported once.
    #[must_use]
    pub fn lint(&self, document: &Document, config: &LintConfig) -> LintReport {
        let mut report = LintReport::default();

        for rule in &self.rules {
            let Some(severity) = config.severity_for(rule.name(), rule.default_severity()) else {
                tracing::debug!("Rule {} is turned off", rule.name());
                continue;
            };
            let resolution = if rule.resolved() {
                Resolution::Resolved
            } else {
                Resolution::Unresolved
            };

            let mut visited_paths = HashSet::new();
            let mut seen = HashSet::new();
            let mut count = 0_usize;

            for selector in rule.given() {
                for (node, node_path) in selector.select(document, resolution) {
                    if !visited_paths.insert(node_path.clone()) {
                        continue;
                    }
                    let ctx = RuleContext {
                        document,
                        path: node_path,
                        config,
                    };
                    for finding in rule.check(node, &ctx) {
                        if !seen.insert((finding.path.clone(), finding.message.clone())) {
                            continue;
                        }
                        count += 1;
                        report.push(Violation {
                            rule: rule.name().to_owned(),
                            path: finding.path.segments(),
                            message: finding.message,
                            severity,
                        });
                    }
                }
            }

            tracing::debug!("Rule {} reported {} violations", rule.name(), count);
        }

        tracing::info!(
            "Lint finished: {} errors, {} warnings, {} infos",
            report.errors.len(),
            report.warnings.len(),
            report.infos.len()
        );
        report
    }
}
