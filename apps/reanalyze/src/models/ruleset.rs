//! Ruleset schema: severity tokens, rule entries, and import references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Level at which a diagnostic code is reported.
pub enum Severity {
    Hidden,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hidden => "hidden",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    /// Accepts `hidden|info|warn|warning|error`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hidden" => Ok(Severity::Hidden),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Diagnostic code -> severity. Absent codes use the analyzer default.
pub type SeverityConfig = BTreeMap<String, Severity>;

#[derive(Debug, Deserialize)]
/// A ruleset document as written on disk.
/// Other top-level keys (e.g. a display `name`) are ignored.
pub struct RulesetDocument {
    /// Paths of imported documents, relative to this document.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
/// One `[[rules]]` entry.
pub struct RuleEntry {
    pub code: String,
    /// Severity token; validated when the document is resolved.
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tokens_case_insensitively() {
        assert_eq!("Warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!(" hidden ".parse::<Severity>(), Ok(Severity::Hidden));
        assert!("none".parse::<Severity>().is_err());
    }

    #[test]
    fn documents_ignore_descriptive_keys() {
        let doc: RulesetDocument = toml::from_str(
            "name = \"Default\"\n[[rules]]\ncode = \"CA1021\"\naction = \"warn\"\nanalyzer = \"Demo\"\n",
        )
        .unwrap();
        assert!(doc.imports.is_empty());
        assert_eq!(doc.rules[0].code, "CA1021");
        assert_eq!(doc.rules[0].action, "warn");
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Hidden < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
    }
}
