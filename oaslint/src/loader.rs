use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::LintError;

const EXCLUDE_LIST: &[&str] = &["node_modules", "dist", "build"];
const VALID_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml"];

/// An API definition read from disk.
#[derive(Debug)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub document: Document,
}

/// Discovers and parses API definitions under a set of paths.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    paths: Vec<PathBuf>,
}

impl DocumentLoader {
    #[must_use]
    pub fn new(paths: &[String]) -> Self {
        let paths = paths
            .iter()
            .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
            .collect();
        DocumentLoader { paths }
    }

    /// Candidate files in discovery order, without duplicates.
    #[must_use]
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for path in &self.paths {
            let resolved_path = path.canonicalize().unwrap_or_else(|_| path.clone());

            if resolved_path.is_file() {
                if has_valid_extension(&resolved_path) && seen.insert(resolved_path.clone()) {
                    tracing::debug!("- discovered file: {}", resolved_path.display());
                    collected.push(resolved_path);
                }
                continue;
            }

            let walker = WalkDir::new(&resolved_path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    !(entry.file_type().is_dir()
                        && EXCLUDE_LIST.contains(&entry.file_name().to_string_lossy().as_ref()))
                });
            for entry in walker.flatten() {
                let path = entry.path();
                if !path.is_file() || !has_valid_extension(path) {
                    continue;
                }
                let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                if seen.insert(canonical.clone()) {
                    tracing::debug!("- discovered file: {}", canonical.display());
                    collected.push(canonical);
                }
            }
        }

        collected
    }

    /// Loads every API definition found.
    ///
    /// Files named explicitly must be API definitions; files found while
    /// walking a directory are skipped silently when they are not.
    ///
    /// # Errors
    /// Returns the first read or parse failure, or
    /// [`LintError::NotAnApiDocument`] for an explicitly named file without an
    /// `openapi`/`swagger` marker.
    pub fn load(&self) -> Result<Vec<LoadedDocument>, LintError> {
        if let Some(missing) = self.paths.iter().find(|p| !p.exists()) {
            return Err(LintError::Io {
                path: missing.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            });
        }

        let explicit: HashSet<PathBuf> = self
            .paths
            .iter()
            .filter(|p| p.is_file())
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();

        let mut documents = Vec::new();
        for file in self.discover() {
            let value = load_value(&file)?;
            if !is_api_definition(&value) {
                if explicit.contains(&file) {
                    return Err(LintError::NotAnApiDocument(file));
                }
                tracing::debug!("- skipped {} (no openapi or swagger field)", file.display());
                continue;
            }
            documents.push(LoadedDocument {
                document: Document::new(value),
                path: file,
            });
        }

        tracing::info!("Loaded {} API definitions", documents.len());
        Ok(documents)
    }
}

fn has_valid_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext_str = ext.to_string_lossy().to_lowercase();
        VALID_EXTENSIONS.contains(&format!(".{ext_str}").as_str())
    })
}

/// Parses a JSON or YAML file into a JSON value.
///
/// # Errors
/// Returns [`LintError::Io`] when the file cannot be read and
/// [`LintError::Parse`] when its content is not valid for its extension.
pub fn load_value(file_path: &Path) -> Result<Value, LintError> {
    let content = fs::read_to_string(file_path).map_err(|source| LintError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;

    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let parsed = match extension.as_str() {
        "yaml" | "yml" => serde_saphyr::from_str(&content).map_err(|e| e.to_string()),
        _ => serde_json::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| LintError::Parse {
        path: file_path.to_path_buf(),
        message,
    })
}

fn is_api_definition(value: &Value) -> bool {
    value.get("openapi").is_some() || value.get("swagger").is_some()
}
