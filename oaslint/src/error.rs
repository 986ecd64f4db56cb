use std::path::PathBuf;
use thiserror::Error;

use crate::reference::ReferenceError;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },
    #[error("'{0}' is not an OpenAPI or Swagger document (no 'openapi' or 'swagger' field)")]
    NotAnApiDocument(PathBuf),
    #[error("Invalid configuration in '{path}': {message}")]
    Config { path: PathBuf, message: String },
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}
