//! Configuration discovery and effective settings resolution.
//!
//! Reanalyze reads `reanalyze.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `staging`: `.reanalyze/shadow` under the repository root
//! - `output`: `human`
//! - `show_hidden`: false
//! - `analyzers.enabled`: true
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::coordinator::WorkspaceOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_NAMES: [&str; 3] = ["reanalyze.toml", "reanalyze.yaml", "reanalyze.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Analyzer loading section under `[analyzers]`.
pub struct AnalyzersCfg {
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `reanalyze.toml|yaml`.
pub struct ReanalyzeConfig {
    /// Shadow-copy staging directory, relative to the repository root.
    pub staging: Option<String>,
    pub output: Option<String>,
    pub show_hidden: Option<bool>,
    #[serde(default)]
    pub analyzers: Option<AnalyzersCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub staging: PathBuf,
    pub output: String,
    pub show_hidden: bool,
    pub analyzers_enabled: bool,
}

impl Effective {
    pub fn workspace_options(&self) -> WorkspaceOptions {
        WorkspaceOptions {
            staging: self.staging.clone(),
            analyzers_enabled: self.analyzers_enabled,
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `reanalyze.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `ReanalyzeConfig` from the first config file present under `root`.
/// A file that fails to parse is reported and treated as absent.
pub fn load_config(root: &Path) -> Option<ReanalyzeConfig> {
    for name in CONFIG_NAMES {
        let p = root.join(name);
        if !p.exists() {
            continue;
        }
        let s = fs::read_to_string(&p).ok()?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<ReanalyzeConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<ReanalyzeConfig>(&s).map_err(|e| e.to_string())
        };
        return match parsed {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!(config = %p.display(), error = %e, "ignoring invalid config");
                None
            }
        };
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_show_hidden: Option<bool>,
    cli_no_analyzers: Option<bool>,
) -> Effective {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_default();

    let staging = repo_root.join(
        cfg.staging
            .clone()
            .unwrap_or_else(|| ".reanalyze/shadow".to_string()),
    );

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let show_hidden = cli_show_hidden.or(cfg.show_hidden).unwrap_or(false);

    let analyzers_enabled = cli_no_analyzers
        .map(|off| !off)
        .or_else(|| cfg.analyzers.as_ref().and_then(|a| a.enabled))
        .unwrap_or(true);

    Effective {
        repo_root,
        staging,
        output,
        show_hidden,
        analyzers_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("reanalyze.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
staging = "build/shadow"
output = "json"
[analyzers]
enabled = false
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None, None, None);
        assert_eq!(eff.staging, root.join("build/shadow"));
        assert_eq!(eff.output, "json");
        assert!(!eff.analyzers_enabled);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("reanalyze.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: human
show_hidden: true
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None);
        assert_eq!(eff.output, "human");
        assert!(eff.show_hidden);
        assert!(eff.analyzers_enabled);
        assert_eq!(eff.staging, root.join(".reanalyze/shadow"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("reanalyze.toml"),
            "output = \"json\"\nshow_hidden = true\n[analyzers]\nenabled = true\n",
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), Some("human"), Some(false), Some(true));
        assert_eq!(eff.output, "human");
        assert!(!eff.show_hidden);
        assert!(!eff.analyzers_enabled);
        assert!(!eff.workspace_options().analyzers_enabled);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("reanalyze.toml"), "output = [").unwrap();
        assert!(load_config(root).is_none());
        let eff = resolve_effective(root.to_str(), None, None, None);
        assert_eq!(eff.output, "human");
    }

    #[test]
    fn test_detect_walks_up_to_git_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        assert_eq!(detect_repo_root(&root.join("a/b")), root.to_path_buf());
    }
}
