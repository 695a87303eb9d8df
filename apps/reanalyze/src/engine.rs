//! Analysis engine seam and the default rule engine.
//!
//! `AnalysisEngine` is the capability the workspace hands a snapshot's
//! severity map and analyzer set to. `RuleEngine` runs the declarative rules
//! loaded from analyzer packs: regex `pattern` rules and the
//! `unused-parameter` check.

use crate::models::analyzer::{AnalyzerRule, RuleKind};
use crate::models::ruleset::{Severity, SeverityConfig};
use crate::models::Diagnostic;
use crate::shadow::LoadedAnalyzer;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// One analyzer rule ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub code: String,
    pub matcher: Matcher,
    pub message: String,
    pub default: Severity,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Pattern(Regex),
    UnusedParameter,
}

impl CompiledRule {
    pub fn compile(rule: &AnalyzerRule) -> Result<Self, String> {
        let matcher = match &rule.kind {
            RuleKind::Pattern { pattern } => Matcher::Pattern(
                Regex::new(pattern).map_err(|e| format!("rule '{}': {}", rule.code, e))?,
            ),
            RuleKind::UnusedParameter => Matcher::UnusedParameter,
        };
        Ok(CompiledRule {
            code: rule.code.clone(),
            matcher,
            message: rule.message.clone(),
            default: rule.default,
        })
    }
}

/// Inputs for one file, all taken from a single project snapshot.
pub struct AnalysisRequest<'a> {
    pub file: &'a Path,
    pub text: &'a str,
    pub severity: &'a SeverityConfig,
    pub analyzers: &'a [LoadedAnalyzer],
}

/// Computes diagnostics for one file. Implementations are owned by the
/// caller and passed to `Workspace::request_diagnostics`.
pub trait AnalysisEngine: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Vec<Diagnostic>;
}

/// Default engine over analyzer-pack rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl AnalysisEngine for RuleEngine {
    fn analyze(&self, req: &AnalysisRequest<'_>) -> Vec<Diagnostic> {
        let file = req.file.to_string_lossy().to_string();
        let mut out = Vec::new();
        for analyzer in req.analyzers {
            for rule in &analyzer.rules {
                let severity = req.severity.get(&rule.code).copied().unwrap_or(rule.default);
                let hits: Vec<(usize, String)> = match &rule.matcher {
                    Matcher::Pattern(re) => re
                        .find_iter(req.text)
                        .map(|m| (m.start(), m.as_str().to_string()))
                        .collect(),
                    Matcher::UnusedParameter => unused_parameters(req.text),
                };
                for (offset, name) in hits {
                    let (line, column) = line_col(req.text, offset);
                    out.push(Diagnostic {
                        code: rule.code.clone(),
                        severity,
                        file: file.clone(),
                        line,
                        column,
                        message: rule.message.replace("{name}", &name),
                    });
                }
            }
        }
        out.sort_by(|a, b| {
            (a.line, a.column, &a.code).cmp(&(b.line, b.column, &b.code))
        });
        out
    }
}

fn fn_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_]\w*)\s*\(([^()]*)\)\s*(?:->\s*[^{;]+?)?\{")
            .expect("valid function head regex")
    })
}

const KEYWORDS: &[&str] = &[
    "if", "while", "for", "foreach", "switch", "catch", "using", "lock", "match", "return",
    "fixed", "when",
];

/// Offsets and names of parameters that never occur in their function body.
fn unused_parameters(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    for caps in fn_head().captures_iter(text) {
        let (Some(name), Some(params), Some(whole)) = (caps.get(1), caps.get(2), caps.get(0))
        else {
            continue;
        };
        if KEYWORDS.contains(&name.as_str()) {
            continue;
        }
        let Some(close) = matching_brace(text, whole.end()) else {
            continue;
        };
        let body = &text[whole.end()..close];
        let mut seg_start = params.start();
        for seg in split_top_level(params.as_str()) {
            let seg_offset = seg_start;
            seg_start += seg.len() + 1;
            let Some((rel, ident)) = param_name(seg) else {
                continue;
            };
            if ident == "self" || ident == "this" || ident.starts_with('_') {
                continue;
            }
            if !contains_word(body, ident) {
                out.push((seg_offset + rel, ident.to_string()));
            }
        }
    }
    out
}

/// Byte offset of the `}` closing a block whose body starts at `start`.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in text.as_bytes()[start..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a parameter list at commas outside `<>`/`[]`.
fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;
    for (i, c) in params.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&params[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[last..]);
    parts
}

/// Declared name within one parameter, with its offset in `seg`.
/// Handles `name: Type` and `Type name = default` forms.
fn param_name(seg: &str) -> Option<(usize, &str)> {
    let decl = match find_single_colon(seg) {
        Some(i) => &seg[..i],
        None => seg.split('=').next().unwrap_or(seg),
    };
    let ident_re = ident();
    let m = if find_single_colon(seg).is_some() {
        ident_re
            .find_iter(decl)
            .filter(|m| m.as_str() != "mut" && m.as_str() != "ref")
            .last()
    } else {
        ident_re.find_iter(decl).last()
    }?;
    Some((m.start(), &seg[m.start()..m.end()]))
}

fn ident() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_]\w*").expect("valid identifier regex"))
}

fn find_single_colon(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    (0..b.len()).find(|&i| {
        b[i] == b':' && b.get(i + 1) != Some(&b':') && (i == 0 || b[i - 1] != b':')
    })
}

fn contains_word(hay: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    hay.match_indices(word).any(|(i, _)| {
        let before = hay[..i].chars().next_back();
        let after = hay[i + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::AnalyzerBinary;
    use std::path::PathBuf;

    fn analyzer(rules: Vec<CompiledRule>) -> LoadedAnalyzer {
        LoadedAnalyzer {
            binary: AnalyzerBinary {
                source: PathBuf::from("demo.analyzer"),
                shadow: PathBuf::from("shadow/demo.analyzer"),
                fingerprint: "0".into(),
            },
            name: "Demo".into(),
            rules,
        }
    }

    fn rule(code: &str, matcher: Matcher, default: Severity) -> CompiledRule {
        CompiledRule {
            code: code.into(),
            matcher,
            message: "issue with '{name}'".into(),
            default,
        }
    }

    const PROGRAM: &str = r#"
namespace Demo
{
    class Program
    {
        static void Main(string[] args)
        {
            if (true) { System.Console.WriteLine("hi"); }
        }

        static int Add(int a, int b) { return a + b; }

        static void TryGet(out int value) { value = 1; }
    }
}
"#;

    #[test]
    fn reports_unused_csharp_parameter() {
        let hits = unused_parameters(PROGRAM);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, "args");
        assert_eq!(&PROGRAM[hits[0].0..hits[0].0 + 4], "args");
    }

    #[test]
    fn handles_rust_style_parameters() {
        let src = "fn run(&self, mut count: usize, map: HashMap<String, u32>, _skip: u8) -> usize {\n    count + 1\n}\n";
        let names: Vec<String> = unused_parameters(src).into_iter().map(|h| h.1).collect();
        assert_eq!(names, vec!["map".to_string()]);
    }

    #[test]
    fn word_match_respects_boundaries() {
        assert!(contains_word("x + args;", "args"));
        assert!(!contains_word("argsList.len()", "args"));
    }

    #[test]
    fn severity_comes_from_config_then_default() {
        let engine = RuleEngine;
        let analyzers = vec![analyzer(vec![
            rule("IDE0060", Matcher::UnusedParameter, Severity::Hidden),
            rule(
                "CA1021",
                Matcher::Pattern(Regex::new(r"\bout\s+\w+\s+\w+").unwrap()),
                Severity::Warn,
            ),
        ])];
        let mut severity = SeverityConfig::new();
        severity.insert("IDE0060".into(), Severity::Error);

        let diags = engine.analyze(&AnalysisRequest {
            file: Path::new("Program.cs"),
            text: PROGRAM,
            severity: &severity,
            analyzers: &analyzers,
        });

        let unused = diags.iter().find(|d| d.code == "IDE0060").unwrap();
        assert_eq!(unused.severity, Severity::Error);
        assert_eq!(unused.line, 6);
        assert_eq!(unused.message, "issue with 'args'");
        let out = diags.iter().find(|d| d.code == "CA1021").unwrap();
        assert_eq!(out.severity, Severity::Warn);
        assert_eq!(out.message, "issue with 'out int value'");
    }

    #[test]
    fn no_analyzers_means_no_diagnostics() {
        let diags = RuleEngine.analyze(&AnalysisRequest {
            file: Path::new("Program.cs"),
            text: PROGRAM,
            severity: &SeverityConfig::new(),
            analyzers: &[],
        });
        assert!(diags.is_empty());
    }

    #[test]
    fn line_col_is_one_based() {
        assert_eq!(line_col("ab\ncd", 0), (1, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
    }
}
