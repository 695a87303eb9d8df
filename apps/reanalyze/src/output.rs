//! Output rendering for the ruleset and check commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-item fields and a top-level summary.

use crate::models::ruleset::Severity;
use crate::models::CheckResult;
use crate::ruleset::ResolvedRuleset;
use crate::utils::rel_to_wd;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn severity_tag(sev: Severity, color: bool) -> String {
    let tag = format!("⟦{}⟧", sev);
    if !color {
        return tag;
    }
    match sev {
        Severity::Error => tag.red().bold().to_string(),
        Severity::Warn => tag.yellow().bold().to_string(),
        Severity::Info => tag.blue().bold().to_string(),
        Severity::Hidden => tag.bright_black().to_string(),
    }
}

/// Print check results in the requested format. Hidden diagnostics are
/// listed only with `show_hidden`; they are always counted.
pub fn print_check(res: &CheckResult, output: &str, show_hidden: bool) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_check_json(res, show_hidden))
                .unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            for d in &res.diagnostics {
                if d.severity == Severity::Hidden && !show_hidden {
                    continue;
                }
                let icon = match d.severity {
                    Severity::Error => "✖".red().to_string(),
                    Severity::Warn => "▲".yellow().to_string(),
                    Severity::Info => "◆".blue().to_string(),
                    Severity::Hidden => "·".bright_black().to_string(),
                };
                let loc = format!(
                    "{}:{}:{}",
                    rel_to_wd(std::path::Path::new(&d.file)),
                    d.line,
                    d.column
                );
                let loc = if color { loc.bold().to_string() } else { loc };
                println!(
                    "{} {} {} ❲{}❳ — {}",
                    icon,
                    severity_tag(d.severity, color),
                    loc,
                    d.code,
                    d.message
                );
            }
            let summary = format!(
                "— Summary — project={} errors={} warnings={} infos={} hidden={} files={}",
                res.project,
                res.summary.errors,
                res.summary.warnings,
                res.summary.infos,
                res.summary.hidden,
                res.summary.files
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Compose JSON for check results.
pub fn compose_check_json(res: &CheckResult, show_hidden: bool) -> JsonVal {
    let items: Vec<JsonVal> = res
        .diagnostics
        .iter()
        .filter(|d| show_hidden || d.severity != Severity::Hidden)
        .map(|d| {
            json!({
                "code": d.code,
                "severity": d.severity,
                "file": d.file,
                "line": d.line,
                "column": d.column,
                "message": d.message,
            })
        })
        .collect();
    json!({
        "project": res.project,
        "diagnostics": items,
        "summary": res.summary,
    })
}

/// Print a resolved ruleset: one line per code, then the documents read.
pub fn print_ruleset(resolved: &ResolvedRuleset, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_ruleset_json(resolved)).unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            for (code, sev) in &resolved.config {
                println!("{} {}", severity_tag(*sev, color), code);
            }
            for doc in &resolved.documents {
                let line = format!("document: {}", rel_to_wd(doc));
                if color {
                    println!("{}", line.bright_black());
                } else {
                    println!("{}", line);
                }
            }
        }
    }
}

/// Compose JSON for a resolved ruleset.
pub fn compose_ruleset_json(resolved: &ResolvedRuleset) -> JsonVal {
    let documents: Vec<String> = resolved
        .documents
        .iter()
        .map(|d| d.to_string_lossy().to_string())
        .collect();
    json!({
        "severities": resolved.config,
        "documents": documents,
    })
}
