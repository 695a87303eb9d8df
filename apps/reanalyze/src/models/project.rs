//! Project definition schema: sources, ruleset reference, analyzer references.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
/// Project file loaded on open and on every full reload.
pub struct ProjectDefinition {
    /// Project identity; defaults to the definition file stem.
    #[serde(default)]
    pub name: Option<String>,
    /// Glob patterns relative to the project directory.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Root ruleset document, relative to the project directory.
    #[serde(default)]
    pub ruleset: Option<String>,
    /// Analyzer binaries, relative to the project directory.
    #[serde(default)]
    pub analyzers: Vec<String>,
}
