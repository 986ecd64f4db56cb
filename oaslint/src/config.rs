use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::Severity;
use crate::error::LintError;
use crate::walker::WalkOptions;

/// Files looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["oaslint.config.json", "oaslint.config.yaml", "oaslint.config.yml"];

/// Per-rule override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetting {
    Off,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LintConfig {
    pub rules: BTreeMap<String, RuleSetting>,
    /// Suffixes appended to a canonical schema name to form variant names.
    pub variant_suffixes: Vec<String>,
    /// Keys whose subtrees are not traversed by document-wide walks.
    pub walker_skip_keys: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        LintConfig {
            rules: BTreeMap::new(),
            variant_suffixes: vec!["Summary".to_owned(), "Prototype".to_owned(), "Patch".to_owned()],
            walker_skip_keys: vec!["example".to_owned(), "examples".to_owned()],
        }
    }
}

impl LintConfig {
    /// Loads configuration from `explicit`, or from the first default config
    /// file found in the working directory, or falls back to defaults.
    ///
    /// # Errors
    /// Returns [`LintError::Io`] or [`LintError::Config`] when an explicitly
    /// given file cannot be read or parsed. Problems with a discovered default
    /// file are logged and the defaults are used instead.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LintError> {
        if let Some(path) = explicit {
            let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string());
            return Self::from_file(&expanded);
        }

        for name in DEFAULT_CONFIG_FILES {
            let candidate = Path::new(name);
            if !candidate.is_file() {
                continue;
            }
            return match Self::from_file(candidate) {
                Ok(config) => {
                    tracing::info!("Using configuration from {}", candidate.display());
                    Ok(config)
                }
                Err(e) => {
                    tracing::warn!("Ignoring configuration: {}", e);
                    Ok(Self::default())
                }
            };
        }

        Ok(Self::default())
    }

    /// # Errors
    /// Returns [`LintError::Io`] if the file cannot be read and
    /// [`LintError::Config`] if it is not valid JSON or YAML configuration.
    pub fn from_file(path: &Path) -> Result<Self, LintError> {
        let content = fs::read_to_string(path).map_err(|source| LintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let parsed = if is_yaml {
            serde_saphyr::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| LintError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Effective severity of a rule; `None` when the rule is turned off.
    #[must_use]
    pub fn severity_for(&self, rule: &str, default: Severity) -> Option<Severity> {
        match self.rules.get(rule) {
            None => Some(default),
            Some(RuleSetting::Off) => None,
            Some(RuleSetting::Error) => Some(Severity::Error),
            Some(RuleSetting::Warning) => Some(Severity::Warning),
            Some(RuleSetting::Info) => Some(Severity::Info),
        }
    }

    /// Walk options for document-wide traversals.
    #[must_use]
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions::default().with_skip_keys(self.walker_skip_keys.iter().cloned())
    }
}
