//! Shadow-copy loading of analyzer binaries.
//!
//! Each binary is read once, fingerprinted, and copied into
//! `<staging>/<project>/<fingerprint>/<file-name>`. The analyzer is then
//! loaded from that copy, so the original can be deleted or replaced as soon
//! as `load` returns. Existing copies with a matching fingerprint are reused.
//! The staging tree is derived state and is never cleaned up here.

use crate::engine::CompiledRule;
use crate::error::AnalyzerLoadError;
use crate::models::analyzer::AnalyzerManifest;
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// An analyzer binary and its private copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerBinary {
    pub source: PathBuf,
    pub shadow: PathBuf,
    pub fingerprint: String,
}

/// An analyzer whose rules were loaded from its shadow copy.
#[derive(Debug, Clone)]
pub struct LoadedAnalyzer {
    pub binary: AnalyzerBinary,
    pub name: String,
    pub rules: Vec<CompiledRule>,
}

/// Outcome of loading a project's analyzers. Failures are per binary.
#[derive(Debug, Default)]
pub struct AnalyzerLoadReport {
    pub loaded: Vec<LoadedAnalyzer>,
    pub failures: Vec<AnalyzerLoadError>,
}

#[derive(Debug, Clone)]
pub struct ShadowLoader {
    staging: PathBuf,
}

impl ShadowLoader {
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        ShadowLoader {
            staging: staging.into(),
        }
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Staging subdirectory owned by one project.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        let safe: String = project
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.staging.join(safe)
    }

    /// Shadow-copy and load every analyzer in `paths`. Copies run in
    /// parallel; result order follows `paths`.
    pub fn load(&self, project: &str, paths: &[PathBuf]) -> AnalyzerLoadReport {
        let dir = self.project_dir(project);
        let results: Vec<Result<LoadedAnalyzer, AnalyzerLoadError>> =
            paths.par_iter().map(|p| load_one(&dir, p)).collect();

        let mut report = AnalyzerLoadReport::default();
        for r in results {
            match r {
                Ok(a) => report.loaded.push(a),
                Err(e) => {
                    tracing::warn!(
                        project,
                        analyzer = %e.path().display(),
                        error = %e,
                        "analyzer skipped"
                    );
                    report.failures.push(e);
                }
            }
        }
        report
    }
}

fn load_one(dir: &Path, source: &Path) -> Result<LoadedAnalyzer, AnalyzerLoadError> {
    // `fs::read` drops its handle before returning.
    let bytes = fs::read(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AnalyzerLoadError::Missing(source.to_path_buf()),
        _ => copy_error(source, &e),
    })?;
    let fp = fingerprint(&bytes);
    let file_name = source
        .file_name()
        .ok_or_else(|| AnalyzerLoadError::Missing(source.to_path_buf()))?;
    let shadow = dir.join(&fp).join(file_name);

    if is_current(&shadow, bytes.len()) {
        tracing::debug!(source = %source.display(), shadow = %shadow.display(), "reusing shadow copy");
    } else {
        write_shadow(&shadow, &bytes).map_err(|e| copy_error(source, &e))?;
        tracing::debug!(source = %source.display(), shadow = %shadow.display(), "shadow-copied analyzer");
    }

    let (name, rules) = load_manifest(source, &shadow)?;
    Ok(LoadedAnalyzer {
        binary: AnalyzerBinary {
            source: source.to_path_buf(),
            shadow,
            fingerprint: fp,
        },
        name,
        rules,
    })
}

fn copy_error(source: &Path, e: &io::Error) -> AnalyzerLoadError {
    AnalyzerLoadError::Copy {
        path: source.to_path_buf(),
        message: e.to_string(),
    }
}

/// Content fingerprint: first 16 hex digits of the blake3 hash.
pub fn fingerprint(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..16].to_string()
}

fn is_current(shadow: &Path, len: usize) -> bool {
    fs::metadata(shadow)
        .map(|m| m.is_file() && m.len() == len as u64)
        .unwrap_or(false)
}

/// Write through a uniquely named sibling temp file and rename, so a reader
/// never sees a partial copy and concurrent writers of the same target do
/// not share a temp path.
fn write_shadow(shadow: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = shadow.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::Builder::new()
        .suffix(".partial")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(shadow).map_err(|e| e.error)?;
    Ok(())
}

fn load_manifest(
    source: &Path,
    shadow: &Path,
) -> Result<(String, Vec<CompiledRule>), AnalyzerLoadError> {
    let manifest_err = |message: String| AnalyzerLoadError::Manifest {
        path: source.to_path_buf(),
        message,
    };
    let text = fs::read_to_string(shadow).map_err(|e| copy_error(source, &e))?;
    let manifest: AnalyzerManifest =
        toml::from_str(&text).map_err(|e| manifest_err(e.message().to_string()))?;
    let rules = manifest
        .rules
        .iter()
        .map(CompiledRule::compile)
        .collect::<Result<Vec<_>, _>>()
        .map_err(manifest_err)?;
    Ok((manifest.name, rules))
}
