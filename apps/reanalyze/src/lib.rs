//! Reanalyze core library.
//!
//! This crate exposes programmatic APIs for loading projects, resolving
//! ruleset documents into diagnostic severities, shadow-copying analyzer
//! binaries, and re-running only the parts of a load that a file change
//! invalidates.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `coordinator`: The `Workspace`: change classification, coalesced reloads.
//! - `engine`: The analysis engine seam and the default rule engine.
//! - `error`: Error taxonomy shared across modules.
//! - `events`: Per-project update notifications.
//! - `models`: Data models for documents on disk and diagnostic output.
//! - `output`: Human/JSON printers.
//! - `project`: Immutable project snapshots and their owner.
//! - `ruleset`: Ruleset resolution and in-place edits.
//! - `shadow`: Shadow-copy analyzer loading.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod output;
pub mod project;
pub mod ruleset;
pub mod shadow;
pub mod utils;

pub use coordinator::{ChangeEvent, ChangeKind, ProjectState, Workspace, WorkspaceOptions};
pub use engine::{AnalysisEngine, RuleEngine};
pub use events::{EventEmitter, NullEmitter, ProjectUpdate, UpdateBroadcaster, UpdateOutcome};
pub use models::ruleset::Severity;
pub use project::{ProjectId, ProjectSnapshot};
