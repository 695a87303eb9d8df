//! Project model: immutable snapshots behind an atomic swap.
//!
//! Readers clone the current `Arc<ProjectSnapshot>` and keep using it for as
//! long as they like; a reload builds a complete new snapshot off to the side
//! and `publish` swaps the pointer. Only the workspace publishes.

use crate::error::{AnalyzerLoadError, ProjectError, ProjectResult};
use crate::models::project::ProjectDefinition;
use crate::models::ruleset::SeverityConfig;
use crate::shadow::LoadedAnalyzer;
use crate::utils::normalize_path;
use glob::{glob, Pattern};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
/// Project identity within a workspace.
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        ProjectId(s.to_string())
    }
}

/// A fully consistent view of one project.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    /// Incremented on every publish.
    pub version: u64,
    pub definition: PathBuf,
    pub dir: PathBuf,
    pub source_patterns: Vec<Pattern>,
    pub sources: BTreeSet<PathBuf>,
    /// Root ruleset document, when the project references one.
    pub ruleset: Option<PathBuf>,
    pub severity: Arc<SeverityConfig>,
    /// Root plus transitive imports of `ruleset` as of the last resolution.
    pub ruleset_documents: Vec<PathBuf>,
    /// Declared analyzer paths, loaded or not.
    pub analyzer_paths: Vec<PathBuf>,
    pub analyzers: Arc<[LoadedAnalyzer]>,
    pub analyzer_failures: Vec<AnalyzerLoadError>,
}

impl ProjectSnapshot {
    pub fn tracks_ruleset_document(&self, path: &Path) -> bool {
        self.ruleset.as_deref() == Some(path) || self.ruleset_documents.iter().any(|d| d == path)
    }

    pub fn declares_analyzer(&self, path: &Path) -> bool {
        self.analyzer_paths.iter().any(|a| a == path)
    }

    pub fn matches_source(&self, path: &Path) -> bool {
        path.starts_with(&self.dir) && self.source_patterns.iter().any(|p| p.matches_path(path))
    }
}

/// Owner of a project's current snapshot.
#[derive(Debug)]
pub struct ProjectModel {
    current: RwLock<Arc<ProjectSnapshot>>,
}

impl ProjectModel {
    pub fn new(initial: ProjectSnapshot) -> Self {
        ProjectModel {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Latest published snapshot. Never waits on a reload in progress.
    pub fn current_snapshot(&self) -> Arc<ProjectSnapshot> {
        self.current.read().clone()
    }

    /// Replace the snapshot; stamps `version` as previous + 1.
    pub(crate) fn publish(&self, mut next: ProjectSnapshot) -> Arc<ProjectSnapshot> {
        let mut guard = self.current.write();
        next.version = guard.version + 1;
        let next = Arc::new(next);
        *guard = next.clone();
        next
    }
}

/// Read and parse a project definition file.
pub fn read_definition(path: &Path) -> ProjectResult<ProjectDefinition> {
    let s = fs::read_to_string(path).map_err(|e| ProjectError::definition(path, e.to_string()))?;
    toml::from_str(&s).map_err(|e| ProjectError::definition(path, e.message().to_string()))
}

/// Project identity: declared name, else the definition file stem.
pub fn project_id(definition: &Path, def: &ProjectDefinition) -> ProjectId {
    let name = def.name.clone().unwrap_or_else(|| {
        definition
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    });
    ProjectId(name)
}

/// Compile source globs relative to the project directory.
pub fn source_patterns(dir: &Path, patterns: &[String]) -> ProjectResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pat| {
            let abs = dir.join(pat).to_string_lossy().to_string();
            Pattern::new(&abs).map_err(|e| ProjectError::Source {
                pattern: pat.clone(),
                message: e.msg.to_string(),
            })
        })
        .collect()
}

/// Expand source globs into the current set of files on disk.
pub fn collect_sources(patterns: &[Pattern]) -> ProjectResult<BTreeSet<PathBuf>> {
    let mut out = BTreeSet::new();
    for pat in patterns {
        let entries = glob(pat.as_str()).map_err(|e| ProjectError::Source {
            pattern: pat.as_str().to_string(),
            message: e.msg.to_string(),
        })?;
        for entry in entries.flatten() {
            if entry.is_file() {
                out.insert(normalize_path(&entry));
            }
        }
    }
    Ok(out)
}
