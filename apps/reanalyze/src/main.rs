//! Reanalyze CLI binary entry point.
//! Delegates to the library for ruleset resolution and project checks.

use clap::Parser;
use reanalyze::cli::{Cli, Commands};
use reanalyze::utils::{error_prefix, note_prefix};
use reanalyze::{config, output, ruleset, NullEmitter, RuleEngine, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() {
    reanalyze::utils::init_tracing("warn");
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Ruleset {
            path,
            repo_root,
            output,
        } => {
            let eff = config::resolve_effective(repo_root.as_deref(), output.as_deref(), None, None);
            match ruleset::resolve(Path::new(&path)) {
                Ok(resolved) => output::print_ruleset(&resolved, &eff.output),
                Err(e) => {
                    eprintln!("{} {}", error_prefix(), e);
                    std::process::exit(2);
                }
            }
        }
        Commands::Check {
            project,
            files,
            repo_root,
            output,
            show_hidden,
            no_analyzers,
        } => {
            let eff = config::resolve_effective(
                repo_root.as_deref(),
                output.as_deref(),
                if show_hidden { Some(true) } else { None },
                if no_analyzers { Some(true) } else { None },
            );
            if config::load_config(&eff.repo_root).is_none() && eff.output != "json" {
                eprintln!("{} No reanalyze.toml found; using defaults.", note_prefix());
            }
            let ws = Workspace::new(eff.workspace_options(), Arc::new(NullEmitter));
            let id = match ws.open_project(Path::new(&project)) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{} {}", error_prefix(), e);
                    std::process::exit(2);
                }
            };
            if let Ok(snap) = ws.snapshot(&id) {
                for failure in &snap.analyzer_failures {
                    eprintln!("{} {}", note_prefix(), failure);
                }
            }
            let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
            match ws.check(&RuleEngine, &id, &files) {
                Ok(result) => {
                    output::print_check(&result, &eff.output, eff.show_hidden);
                    if result.summary.errors > 0 {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("{} {}", error_prefix(), e);
                    std::process::exit(2);
                }
            }
        }
    }
}
