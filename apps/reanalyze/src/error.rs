//! Error types for ruleset resolution, analyzer loading, and project reloads.
//!
//! Ruleset and project errors are captured by the workspace and surfaced as
//! project state; analyzer errors are collected per binary and never abort a
//! reload.

use std::path::PathBuf;

/// Errors while resolving a ruleset document tree.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RulesetError {
    /// Malformed document, unknown severity token, or unreadable file.
    #[error("invalid ruleset {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An import chain returned to a document already on the chain.
    #[error("ruleset import cycle: {}", format_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },

    /// Edit operation targeted something the document does not contain.
    #[error("ruleset {path} has no {what}")]
    NotFound { path: PathBuf, what: String },
}

impl RulesetError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Per-binary analyzer failure. The project keeps loading without it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzerLoadError {
    #[error("analyzer not found: {0}")]
    Missing(PathBuf),

    #[error("failed to shadow-copy analyzer {path}: {message}")]
    Copy { path: PathBuf, message: String },

    #[error("invalid analyzer manifest in {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

impl AnalyzerLoadError {
    /// Original path of the analyzer this error belongs to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Missing(p) => p,
            Self::Copy { path, .. } | Self::Manifest { path, .. } => path,
        }
    }
}

/// Errors that fail a project load or reload as a whole.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    /// The project definition could not be read or parsed.
    #[error("invalid project definition {path}: {message}")]
    Definition { path: PathBuf, message: String },

    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    #[error("bad source pattern '{pattern}': {message}")]
    Source { pattern: String, message: String },

    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error("project '{id}' is already loaded from {path}")]
    Duplicate { id: String, path: PathBuf },

    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },
}

impl ProjectError {
    pub fn definition(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Definition {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;
