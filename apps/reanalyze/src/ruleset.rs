//! Ruleset resolution: document tree -> `SeverityConfig`.
//!
//! Imports are merged first, in declaration order, and the importing
//! document's own rules are applied on top. This holds at every nesting
//! level, so a document always overrides everything it pulls in.
//! Nothing is cached between calls; every resolution re-reads the tree.

use crate::error::RulesetError;
use crate::models::ruleset::{RulesetDocument, Severity, SeverityConfig};
use crate::utils::normalize_path;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{value, DocumentMut, Item, Value};

/// Result of resolving a root document.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRuleset {
    pub config: SeverityConfig,
    /// Root plus every transitively imported document, each listed once.
    pub documents: Vec<PathBuf>,
}

/// Resolve the ruleset rooted at `root`.
pub fn resolve(root: &Path) -> Result<ResolvedRuleset, RulesetError> {
    resolve_tracked(root).0
}

/// Like `resolve`, but also returns every document the resolution reached,
/// including ones that failed to load, so callers can watch them for a fix.
pub fn resolve_tracked(root: &Path) -> (Result<ResolvedRuleset, RulesetError>, Vec<PathBuf>) {
    let mut resolver = Resolver::default();
    match resolver.resolve_document(&normalize_path(root)) {
        Ok(config) => {
            let documents = resolver.documents.clone();
            (Ok(ResolvedRuleset { config, documents }), resolver.documents)
        }
        Err(e) => (Err(e), resolver.documents),
    }
}

#[derive(Default)]
struct Resolver {
    /// Documents on the current import chain.
    chain: Vec<PathBuf>,
    /// Documents already resolved during this call (diamond imports).
    done: HashMap<PathBuf, SeverityConfig>,
    documents: Vec<PathBuf>,
    reads: usize,
}

impl Resolver {
    fn resolve_document(&mut self, path: &PathBuf) -> Result<SeverityConfig, RulesetError> {
        if let Some(cfg) = self.done.get(path) {
            return Ok(cfg.clone());
        }
        if let Some(pos) = self.chain.iter().position(|p| p == path) {
            let mut chain = self.chain[pos..].to_vec();
            chain.push(path.clone());
            return Err(RulesetError::Cycle { chain });
        }

        self.documents.push(path.clone());
        let doc = read_document(path)?;
        self.reads += 1;
        self.chain.push(path.clone());

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config = SeverityConfig::new();
        for import in &doc.imports {
            let target = normalize_path(&base.join(import));
            config.extend(self.resolve_document(&target)?);
        }
        self.chain.pop();

        for rule in &doc.rules {
            let severity: Severity = rule.action.parse().map_err(|m| {
                RulesetError::parse(path, format!("rule '{}': {}", rule.code, m))
            })?;
            config.insert(rule.code.clone(), severity);
        }
        tracing::debug!(
            document = %path.display(),
            rules = doc.rules.len(),
            imports = doc.imports.len(),
            "resolved ruleset document"
        );
        self.done.insert(path.clone(), config.clone());
        Ok(config)
    }
}

fn read_document(path: &Path) -> Result<RulesetDocument, RulesetError> {
    let s = fs::read_to_string(path).map_err(|e| RulesetError::parse(path, e.to_string()))?;
    toml::from_str(&s).map_err(|e| RulesetError::parse(path, e.message().to_string()))
}

fn read_editable(path: &Path) -> Result<DocumentMut, RulesetError> {
    let s = fs::read_to_string(path).map_err(|e| RulesetError::parse(path, e.to_string()))?;
    s.parse::<DocumentMut>()
        .map_err(|e| RulesetError::parse(path, e.message().to_string()))
}

fn write_editable(path: &Path, doc: &DocumentMut) -> Result<(), RulesetError> {
    fs::write(path, doc.to_string()).map_err(|e| RulesetError::parse(path, e.to_string()))
}

/// Replace a string value in place, keeping the whitespace and comments
/// around it.
fn replace_keeping_decor(slot: &mut Value, text: &str) {
    let decor = slot.decor().clone();
    *slot = Value::from(text);
    *slot.decor_mut() = decor;
}

fn set_action(slot: Option<&mut Item>, severity: Severity) -> Option<()> {
    replace_keeping_decor(slot?.as_value_mut()?, severity.as_str());
    Some(())
}

/// Rewrite the action of every rule for `code` in one document.
///
/// Everything else in the file, comments and layout included, is left as is.
pub fn set_rule_action(doc: &Path, code: &str, severity: Severity) -> Result<(), RulesetError> {
    let mut editable = read_editable(doc)?;
    let mut found = false;
    match editable.get_mut("rules") {
        Some(Item::ArrayOfTables(rules)) => {
            for t in rules.iter_mut() {
                if t.get("code").and_then(|v| v.as_str()) != Some(code) {
                    continue;
                }
                if set_action(t.get_mut("action"), severity).is_none() {
                    t.insert("action", value(severity.as_str()));
                }
                found = true;
            }
        }
        Some(Item::Value(Value::Array(rules))) => {
            for t in rules.iter_mut().filter_map(|v| v.as_inline_table_mut()) {
                if t.get("code").and_then(|v| v.as_str()) != Some(code) {
                    continue;
                }
                match t.get_mut("action") {
                    Some(v) => replace_keeping_decor(v, severity.as_str()),
                    None => {
                        t.insert("action", Value::from(severity.as_str()));
                    }
                }
                found = true;
            }
        }
        _ => {}
    }
    if !found {
        return Err(RulesetError::NotFound {
            path: doc.to_path_buf(),
            what: format!("rule '{}'", code),
        });
    }
    write_editable(doc, &editable)
}

/// Point the import at `index` to `new_path`, leaving other imports intact.
pub fn set_import(doc: &Path, index: usize, new_path: &str) -> Result<(), RulesetError> {
    let mut editable = read_editable(doc)?;
    let slot = editable
        .get_mut("imports")
        .and_then(|i| i.as_array_mut())
        .and_then(|a| a.get_mut(index));
    match slot {
        Some(v) => replace_keeping_decor(v, new_path),
        None => {
            return Err(RulesetError::NotFound {
                path: doc.to_path_buf(),
                what: format!("import #{}", index),
            })
        }
    }
    write_editable(doc, &editable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn root_rules_override_imports() {
        let tmp = tempdir().unwrap();
        let root = write(
            tmp.path(),
            "default.toml",
            r#"
imports = ["shared/base.toml"]

[[rules]]
code = "CA1021"
action = "warn"
"#,
        );
        write(
            tmp.path(),
            "shared/base.toml",
            r#"
[[rules]]
code = "CA1021"
action = "error"

[[rules]]
code = "IDE0060"
action = "info"
"#,
        );
        let resolved = resolve(&root).unwrap();
        assert_eq!(resolved.config.get("CA1021"), Some(&Severity::Warn));
        assert_eq!(resolved.config.get("IDE0060"), Some(&Severity::Info));
        assert_eq!(resolved.documents.len(), 2);
        assert!(resolved.documents[1].ends_with("shared/base.toml"));
    }

    #[test]
    fn later_imports_and_later_rules_win() {
        let tmp = tempdir().unwrap();
        let root = write(
            tmp.path(),
            "root.toml",
            r#"
imports = ["a.toml", "b.toml"]

[[rules]]
code = "X2"
action = "info"

[[rules]]
code = "X2"
action = "hidden"
"#,
        );
        write(tmp.path(), "a.toml", "[[rules]]\ncode = \"X1\"\naction = \"info\"\n");
        write(tmp.path(), "b.toml", "[[rules]]\ncode = \"X1\"\naction = \"error\"\n");
        let cfg = resolve(&root).unwrap().config;
        assert_eq!(cfg.get("X1"), Some(&Severity::Error));
        assert_eq!(cfg.get("X2"), Some(&Severity::Hidden));
    }

    #[test]
    fn nested_imports_keep_nearest_document_precedence() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "root.toml", "imports = [\"mid.toml\"]\n");
        write(
            tmp.path(),
            "mid.toml",
            "imports = [\"leaf.toml\"]\n[[rules]]\ncode = \"X1\"\naction = \"warn\"\n",
        );
        write(tmp.path(), "leaf.toml", "[[rules]]\ncode = \"X1\"\naction = \"error\"\n");
        let cfg = resolve(&root).unwrap().config;
        assert_eq!(cfg.get("X1"), Some(&Severity::Warn));
    }

    #[test]
    fn cycle_fails_within_one_visit_per_document() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.toml", "imports = [\"b.toml\"]\n");
        write(tmp.path(), "b.toml", "imports = [\"c.toml\"]\n");
        write(tmp.path(), "c.toml", "imports = [\"a.toml\"]\n");

        let mut resolver = Resolver::default();
        let err = resolver.resolve_document(&normalize_path(&a)).unwrap_err();
        match err {
            RulesetError::Cycle { chain } => {
                assert_eq!(chain.len(), 4);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected cycle, got {other}"),
        }
        assert!(resolver.reads <= 3);
    }

    #[test]
    fn self_import_is_a_cycle() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.toml", "imports = [\"./a.toml\"]\n");
        assert!(matches!(resolve(&a), Err(RulesetError::Cycle { .. })));
    }

    #[test]
    fn diamond_imports_are_not_cycles() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "root.toml", "imports = [\"l.toml\", \"r.toml\"]\n");
        write(tmp.path(), "l.toml", "imports = [\"base.toml\"]\n");
        write(tmp.path(), "r.toml", "imports = [\"base.toml\"]\n");
        write(tmp.path(), "base.toml", "[[rules]]\ncode = \"X1\"\naction = \"info\"\n");

        let mut resolver = Resolver::default();
        let cfg = resolver.resolve_document(&normalize_path(&root)).unwrap();
        assert_eq!(cfg.get("X1"), Some(&Severity::Info));
        assert_eq!(resolver.reads, 4);
        assert_eq!(resolver.documents.len(), 4);
    }

    #[test]
    fn failed_resolution_still_reports_reached_documents() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "r.toml", "imports = [\"next.toml\"]\n");
        let (result, documents) = resolve_tracked(&root);
        assert!(result.is_err());
        assert_eq!(documents.len(), 2);
        assert!(documents[1].ends_with("next.toml"));
    }

    #[test]
    fn unknown_severity_is_a_parse_error() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "r.toml", "[[rules]]\ncode = \"X1\"\naction = \"fatal\"\n");
        match resolve(&root) {
            Err(RulesetError::Parse { message, .. }) => assert!(message.contains("X1")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_import_is_a_parse_error() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "r.toml", "imports = [\"gone.toml\"]\n");
        match resolve(&root) {
            Err(RulesetError::Parse { path, .. }) => assert!(path.ends_with("gone.toml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn set_rule_action_touches_only_that_rule() {
        let tmp = tempdir().unwrap();
        let root = write(
            tmp.path(),
            "r.toml",
            r#"
name = "Default"
imports = ["base.toml"]

[[rules]]
code = "CA1021"
action = "warn"

[[rules]]
code = "IDE0060"
action = "info"
"#,
        );
        write(tmp.path(), "base.toml", "[[rules]]\ncode = \"CA2000\"\naction = \"hidden\"\n");
        let before = resolve(&root).unwrap().config;

        set_rule_action(&root, "CA1021", Severity::Error).unwrap();

        let after = resolve(&root).unwrap().config;
        assert_eq!(after.get("CA1021"), Some(&Severity::Error));
        for (code, sev) in &before {
            if code != "CA1021" {
                assert_eq!(after.get(code), Some(sev), "{code} shifted");
            }
        }
        let text = fs::read_to_string(&root).unwrap();
        assert!(text.find("name").unwrap() < text.find("imports").unwrap());
    }

    #[test]
    fn edits_keep_comments_and_layout() {
        let tmp = tempdir().unwrap();
        let body = r#"# team defaults
imports = [
    "base.toml", # shared
    "extra.toml",
]

[[rules]]
code = "CA1021"
action = "warn" # tightened later

[[rules]]
code   = "IDE0060"
action = "info"
"#;
        let root = write(tmp.path(), "r.toml", body);

        set_rule_action(&root, "CA1021", Severity::Error).unwrap();
        set_import(&root, 1, "strict.toml").unwrap();

        let expected = body
            .replace(r#"action = "warn" # tightened later"#, r#"action = "error" # tightened later"#)
            .replace(r#""extra.toml","#, r#""strict.toml","#);
        assert_eq!(fs::read_to_string(&root).unwrap(), expected);
    }

    #[test]
    fn set_rule_action_handles_inline_rule_arrays() {
        let tmp = tempdir().unwrap();
        let root = write(
            tmp.path(),
            "r.toml",
            "rules = [{ code = \"X1\", action = \"info\" }, { code = \"X2\", action = \"warn\" }]\n",
        );
        set_rule_action(&root, "X2", Severity::Hidden).unwrap();
        let config = resolve(&root).unwrap().config;
        assert_eq!(config.get("X1"), Some(&Severity::Info));
        assert_eq!(config.get("X2"), Some(&Severity::Hidden));
    }

    #[test]
    fn set_rule_action_reports_unknown_code() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "r.toml", "[[rules]]\ncode = \"X1\"\naction = \"info\"\n");
        assert!(matches!(
            set_rule_action(&root, "X9", Severity::Error),
            Err(RulesetError::NotFound { .. })
        ));
    }

    #[test]
    fn set_import_repoints_one_reference() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "r.toml", "imports = [\"warn.toml\", \"extra.toml\"]\n");
        write(tmp.path(), "warn.toml", "[[rules]]\ncode = \"CA1021\"\naction = \"warn\"\n");
        write(tmp.path(), "error.toml", "[[rules]]\ncode = \"CA1021\"\naction = \"error\"\n");
        write(tmp.path(), "extra.toml", "[[rules]]\ncode = \"X1\"\naction = \"info\"\n");

        set_import(&root, 0, "error.toml").unwrap();

        let resolved = resolve(&root).unwrap();
        assert_eq!(resolved.config.get("CA1021"), Some(&Severity::Error));
        assert_eq!(resolved.config.get("X1"), Some(&Severity::Info));
        assert!(set_import(&root, 5, "x.toml").is_err());
    }
}
