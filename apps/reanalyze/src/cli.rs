//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reanalyze",
    version,
    about = "Incremental project analysis with ruleset-driven severities",
    long_about = "Reanalyze loads a project definition, resolves its ruleset into per-code severities, shadow-copies its analyzers, and reports diagnostics.\n\nConfiguration precedence: CLI > reanalyze.toml > defaults.",
    after_help = "Examples:\n  reanalyze ruleset rules/default.toml\n  reanalyze check --project app/App.project.toml\n  reanalyze check --project app/App.project.toml --file app/src/Program.cs --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current reanalyze version.")]
    Version,
    /// Resolve a ruleset document and print the resulting severities
    #[command(
        about = "Resolve a ruleset",
        long_about = "Resolve a ruleset document and its imports into a code -> severity map. Import cycles and malformed documents exit with status 2.",
        after_help = "Examples:\n  reanalyze ruleset rules/default.toml\n  reanalyze ruleset rules/default.toml --output json"
    )]
    Ruleset {
        #[arg(help = "Path to the root ruleset document")]
        path: String,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Load a project and report diagnostics
    #[command(
        about = "Run analyzers over a project",
        long_about = "Open the project, shadow-copy its analyzers, and report diagnostics for the given files (default: every source). Error diagnostics exit with status 1.",
        after_help = "Examples:\n  reanalyze check --project app/App.project.toml\n  reanalyze check --project app/App.project.toml --show-hidden"
    )]
    Check {
        #[arg(long, help = "Path to the project definition file")]
        project: String,
        #[arg(long = "file", help = "Source file to analyze (repeatable)")]
        files: Vec<String>,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Include hidden diagnostics")]
        show_hidden: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Do not load analyzers")]
        no_analyzers: bool,
    },
}
