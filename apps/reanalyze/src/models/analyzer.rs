//! Analyzer pack schema, parsed from the shadow copy of an analyzer binary.

use super::ruleset::Severity;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
/// Rules provided by one analyzer binary.
pub struct AnalyzerManifest {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<AnalyzerRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerRule {
    pub code: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Message template; `{name}` is replaced by the offending identifier.
    pub message: String,
    /// Severity used when the ruleset does not mention `code`.
    #[serde(default = "default_severity")]
    pub default: Severity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
/// Detection strategy of a rule.
pub enum RuleKind {
    /// Report every match of a regular expression.
    #[serde(rename = "pattern")]
    Pattern { pattern: String },
    /// Report named parameters never used in the function body.
    #[serde(rename = "unused-parameter")]
    UnusedParameter,
}

fn default_severity() -> Severity {
    Severity::Warn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_rule_kinds() {
        let src = r#"
name = "Demo.Analyzers"

[[rules]]
code = "IDE0060"
kind = "unused-parameter"
message = "Remove unused parameter '{name}'"

[[rules]]
code = "CA1021"
kind = "pattern"
pattern = "\\bout\\s+\\w+"
message = "Avoid out parameters"
default = "info"
"#;
        let m: AnalyzerManifest = toml::from_str(src).unwrap();
        assert_eq!(m.rules.len(), 2);
        assert!(matches!(m.rules[0].kind, RuleKind::UnusedParameter));
        assert_eq!(m.rules[0].default, Severity::Warn);
        match &m.rules[1].kind {
            RuleKind::Pattern { pattern } => assert_eq!(pattern, "\\bout\\s+\\w+"),
            _ => panic!("expected pattern rule"),
        }
        assert_eq!(m.rules[1].default, Severity::Info);
    }

    #[test]
    fn rejects_unknown_default_severity() {
        let src = r#"
name = "x"
[[rules]]
code = "X1"
kind = "unused-parameter"
message = "m"
default = "fatal"
"#;
        assert!(toml::from_str::<AnalyzerManifest>(src).is_err());
    }
}
