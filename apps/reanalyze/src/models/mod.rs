//! Shared data models: documents on disk and diagnostic output structs.

pub mod analyzer;
pub mod project;
pub mod ruleset;

use ruleset::Severity;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single diagnostic with severity and location.
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
/// Aggregated counts used by printers.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hidden: usize,
    pub files: usize,
}

#[derive(Debug, Serialize)]
/// Check results container.
pub struct CheckResult {
    pub project: String,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl CheckResult {
    pub fn new(project: String, diagnostics: Vec<Diagnostic>, files: usize) -> Self {
        let mut summary = Summary {
            files,
            ..Summary::default()
        };
        for d in &diagnostics {
            match d.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warn => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
                Severity::Hidden => summary.hidden += 1,
            }
        }
        CheckResult {
            project,
            diagnostics,
            summary,
        }
    }
}
