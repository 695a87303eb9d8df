//! Supporting helpers: path normalization, display paths, and CLI prefixes.

use owo_colors::OwoColorize;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and fold `.`/`..` components without touching the
/// filesystem, so deleted files still compare equal to their old paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for comp in abs.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path relative to the working directory when possible, for display.
pub fn rel_to_wd(p: &Path) -> String {
    let shown = std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(p, cwd))
        .filter(|rel| !rel.as_os_str().is_empty() && !rel.starts_with(".."))
        .unwrap_or_else(|| p.to_path_buf());
    shown.to_string_lossy().to_string()
}

fn colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors() {
        "note:".bright_black().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Install the stderr tracing subscriber; `RUST_LOG` overrides `default`.
pub fn init_tracing(default: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dot_components() {
        let p = normalize_path(Path::new("/a/b/./c/../d.toml"));
        assert_eq!(p, PathBuf::from("/a/b/d.toml"));
    }

    #[test]
    fn normalize_makes_relative_paths_absolute() {
        assert!(normalize_path(Path::new("x/y.toml")).is_absolute());
    }
}
