//! Reanalysis coordinator: the `Workspace`.
//!
//! Change notifications are classified per project into a `ReloadScope`,
//! merged into that project's `ChangeQueue`, and drained by whichever caller
//! found the queue idle. Other callers return immediately; their work is
//! coalesced into the single pending slot and runs once the in-flight reload
//! finishes. Each completed reload publishes a snapshot (or marks the project
//! degraded) and emits exactly one `ProjectUpdate`.

use crate::engine::{AnalysisEngine, AnalysisRequest};
use crate::error::{ProjectError, ProjectResult};
use crate::events::{EventEmitter, ProjectUpdate, UpdateOutcome};
use crate::models::{CheckResult, Diagnostic};
use crate::project::{
    collect_sources, project_id, read_definition, source_patterns, ProjectId, ProjectModel,
    ProjectSnapshot,
};
use crate::ruleset::{resolve_tracked, ResolvedRuleset};
use crate::shadow::{AnalyzerLoadReport, ShadowLoader};
use crate::utils::normalize_path;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One file-system change, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        ChangeEvent {
            path: path.into(),
            kind,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }
}

/// What a reload has to recompute. `definition` implies everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadScope {
    pub ruleset: bool,
    pub analyzers: bool,
    pub sources: bool,
    pub definition: bool,
}

impl ReloadScope {
    pub const NONE: ReloadScope = ReloadScope {
        ruleset: false,
        analyzers: false,
        sources: false,
        definition: false,
    };
    pub const RULESET: ReloadScope = ReloadScope {
        ruleset: true,
        ..Self::NONE
    };
    pub const ANALYZERS: ReloadScope = ReloadScope {
        analyzers: true,
        ..Self::NONE
    };
    pub const SOURCES: ReloadScope = ReloadScope {
        sources: true,
        ..Self::NONE
    };
    pub const FULL: ReloadScope = ReloadScope {
        ruleset: true,
        analyzers: true,
        sources: true,
        definition: true,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    pub fn merge(self, other: ReloadScope) -> ReloadScope {
        if self.definition || other.definition {
            return Self::FULL;
        }
        ReloadScope {
            ruleset: self.ruleset || other.ruleset,
            analyzers: self.analyzers || other.analyzers,
            sources: self.sources || other.sources,
            definition: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProjectState {
    Idle,
    Reloading,
    /// Last reload failed; the last good snapshot is still served.
    Degraded(ProjectError),
}

impl ProjectState {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ProjectState::Degraded(_))
    }
}

/// Pending work for one project: one coalesced slot plus a running flag.
#[derive(Debug, Default)]
pub(crate) struct ChangeQueue {
    pending: Option<ReloadScope>,
    running: bool,
}

impl ChangeQueue {
    /// Merge `scope` into the pending slot. Returns true when the caller
    /// must drain the queue.
    pub(crate) fn enqueue(&mut self, scope: ReloadScope) -> bool {
        self.pending = Some(match self.pending {
            Some(p) => p.merge(scope),
            None => scope,
        });
        if self.running {
            false
        } else {
            self.running = true;
            true
        }
    }

    /// Take the pending work; clears the running flag once empty.
    pub(crate) fn next(&mut self) -> Option<ReloadScope> {
        let next = self.pending.take();
        if next.is_none() {
            self.running = false;
        }
        next
    }
}

#[derive(Debug)]
struct ProjectHandle {
    model: ProjectModel,
    queue: Mutex<ChangeQueue>,
    state: Mutex<ProjectState>,
    /// Ruleset documents reached by the last failed resolution.
    attempted: Mutex<Vec<PathBuf>>,
    /// Scope of the last failed reload, retried with every later one.
    failed: Mutex<ReloadScope>,
    sequence: AtomicU64,
}

impl ProjectHandle {
    fn classify(&self, event: &ChangeEvent) -> ReloadScope {
        let snap = self.model.current_snapshot();
        let path = normalize_path(&event.path);
        if path == snap.definition {
            return ReloadScope::FULL;
        }
        if snap.tracks_ruleset_document(&path) || self.attempted.lock().contains(&path) {
            return ReloadScope::RULESET;
        }
        // A directory event above an analyzer (e.g. a restored package
        // folder) counts as a change to that analyzer.
        if snap.declares_analyzer(&path) || snap.analyzer_paths.iter().any(|a| a.starts_with(&path)) {
            return ReloadScope::ANALYZERS;
        }
        if event.kind != ChangeKind::Modified && snap.matches_source(&path) {
            return ReloadScope::SOURCES;
        }
        ReloadScope::NONE
    }
}

/// Settings a workspace is created with.
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// Root of the shadow-copy staging tree.
    pub staging: PathBuf,
    /// When false no analyzer is loaded and snapshots carry none.
    pub analyzers_enabled: bool,
}

/// Holds every open project and serializes reloads per project.
pub struct Workspace {
    projects: RwLock<BTreeMap<ProjectId, Arc<ProjectHandle>>>,
    loader: ShadowLoader,
    analyzers_enabled: bool,
    emitter: Arc<dyn EventEmitter>,
}

impl Workspace {
    pub fn new(options: WorkspaceOptions, emitter: Arc<dyn EventEmitter>) -> Self {
        Workspace {
            projects: RwLock::new(BTreeMap::new()),
            loader: ShadowLoader::new(options.staging),
            analyzers_enabled: options.analyzers_enabled,
            emitter,
        }
    }

    /// Load a project from its definition file and start tracking it.
    pub fn open_project(&self, definition: &Path) -> ProjectResult<ProjectId> {
        let definition = normalize_path(definition);
        let mut snapshot = self.build_full(None, &definition)?;
        let id = snapshot.id.clone();
        {
            let mut projects = self.projects.write();
            if let Some(existing) = projects.get(&id) {
                return Err(ProjectError::Duplicate {
                    id: id.to_string(),
                    path: existing.model.current_snapshot().definition.clone(),
                });
            }
            snapshot.version = 1;
            let handle = ProjectHandle {
                model: ProjectModel::new(snapshot),
                queue: Mutex::new(ChangeQueue::default()),
                state: Mutex::new(ProjectState::Idle),
                attempted: Mutex::new(Vec::new()),
                failed: Mutex::new(ReloadScope::NONE),
                sequence: AtomicU64::new(1),
            };
            projects.insert(id.clone(), Arc::new(handle));
        }
        tracing::info!(project = %id, definition = %definition.display(), "project opened");
        self.emitter.project_updated(&ProjectUpdate {
            project: id.clone(),
            sequence: 1,
            outcome: UpdateOutcome::Published { version: 1 },
        });
        Ok(id)
    }

    pub fn projects(&self) -> Vec<ProjectId> {
        self.projects.read().keys().cloned().collect()
    }

    fn handle(&self, id: &ProjectId) -> ProjectResult<Arc<ProjectHandle>> {
        self.projects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))
    }

    /// Current snapshot of a project.
    pub fn snapshot(&self, id: &ProjectId) -> ProjectResult<Arc<ProjectSnapshot>> {
        Ok(self.handle(id)?.model.current_snapshot())
    }

    pub fn state(&self, id: &ProjectId) -> ProjectResult<ProjectState> {
        Ok(self.handle(id)?.state.lock().clone())
    }

    /// Feed file-system changes. Paths no project tracks are ignored.
    /// Affected projects are reloaded in parallel; this call returns after
    /// every reload it started has drained.
    pub fn notify_changed(&self, events: &[ChangeEvent]) {
        let handles: Vec<Arc<ProjectHandle>> = self.projects.read().values().cloned().collect();
        let work: Vec<(Arc<ProjectHandle>, ReloadScope)> = handles
            .into_iter()
            .filter_map(|h| {
                let scope = events
                    .iter()
                    .fold(ReloadScope::NONE, |acc, ev| acc.merge(h.classify(ev)));
                (!scope.is_empty()).then_some((h, scope))
            })
            .collect();
        for (h, scope) in &work {
            tracing::debug!(project = %h.model.current_snapshot().id, ?scope, "change queued");
        }
        match work.as_slice() {
            [] => {}
            [(h, scope)] => self.schedule(h, *scope),
            _ => work.par_iter().for_each(|(h, scope)| self.schedule(h, *scope)),
        }
    }

    /// Package restore finished for `id`; binaries may have changed on disk.
    pub fn notify_dependencies_restored(&self, id: &ProjectId) -> ProjectResult<()> {
        let handle = self.handle(id)?;
        self.schedule(&handle, ReloadScope::FULL);
        Ok(())
    }

    fn schedule(&self, handle: &ProjectHandle, scope: ReloadScope) {
        if handle.queue.lock().enqueue(scope) {
            self.drain(handle);
        }
    }

    fn drain(&self, handle: &ProjectHandle) {
        loop {
            // Release the queue lock before reloading so new work can merge in.
            let next = handle.queue.lock().next();
            let Some(scope) = next else {
                break;
            };
            self.reload(handle, scope);
        }
    }

    fn reload(&self, handle: &ProjectHandle, scope: ReloadScope) {
        // Work that failed before is redone until a reload succeeds.
        let scope = scope.merge(*handle.failed.lock());
        *handle.state.lock() = ProjectState::Reloading;
        let current = handle.model.current_snapshot();
        let result = if scope.definition {
            self.build_full(Some((handle, &current)), &current.definition)
        } else {
            self.build_partial(handle, &current, scope)
        };

        let outcome = match result {
            Ok(next) => {
                *handle.failed.lock() = ReloadScope::NONE;
                if scope.ruleset {
                    handle.attempted.lock().clear();
                }
                let published = handle.model.publish(next);
                *handle.state.lock() = ProjectState::Idle;
                tracing::info!(
                    project = %published.id,
                    version = published.version,
                    analyzers = published.analyzers.len(),
                    rules = published.severity.len(),
                    "snapshot published"
                );
                UpdateOutcome::Published {
                    version: published.version,
                }
            }
            Err(e) => {
                tracing::warn!(project = %current.id, error = %e, "reload failed; keeping last good snapshot");
                let error = e.to_string();
                *handle.failed.lock() = scope;
                *handle.state.lock() = ProjectState::Degraded(e);
                UpdateOutcome::Degraded {
                    version: current.version,
                    error,
                }
            }
        };
        let sequence = handle.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.emitter.project_updated(&ProjectUpdate {
            project: current.id.clone(),
            sequence,
            outcome,
        });
    }

    /// Resolve `root`, remembering the documents a failed attempt reached
    /// so fixing any of them triggers another try.
    fn resolve_ruleset(
        &self,
        handle: Option<&ProjectHandle>,
        root: Option<&PathBuf>,
    ) -> ProjectResult<ResolvedRuleset> {
        let Some(root) = root else {
            return Ok(ResolvedRuleset::default());
        };
        match resolve_tracked(root) {
            (Ok(resolved), _) => Ok(resolved),
            (Err(e), documents) => {
                if let Some(h) = handle {
                    *h.attempted.lock() = documents;
                }
                Err(e.into())
            }
        }
    }

    fn load_analyzers(&self, id: &ProjectId, paths: &[PathBuf]) -> AnalyzerLoadReport {
        if !self.analyzers_enabled {
            return AnalyzerLoadReport::default();
        }
        self.loader.load(id.as_str(), paths)
    }

    /// Re-derive everything from the definition file. Identity is kept
    /// from the current snapshot when reloading.
    fn build_full(
        &self,
        reloading: Option<(&ProjectHandle, &ProjectSnapshot)>,
        definition: &Path,
    ) -> ProjectResult<ProjectSnapshot> {
        let handle = reloading.map(|(h, _)| h);
        let previous = reloading.map(|(_, p)| p);
        let def = read_definition(definition)?;
        let dir = definition.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        let id = previous
            .map(|p| p.id.clone())
            .unwrap_or_else(|| project_id(definition, &def));

        let patterns = source_patterns(&dir, &def.sources)?;
        let sources = collect_sources(&patterns)?;
        let ruleset = def.ruleset.as_ref().map(|r| normalize_path(&dir.join(r)));
        let resolved = self.resolve_ruleset(handle, ruleset.as_ref())?;
        let analyzer_paths: Vec<PathBuf> = def
            .analyzers
            .iter()
            .map(|a| normalize_path(&dir.join(a)))
            .collect();
        let report = self.load_analyzers(&id, &analyzer_paths);

        Ok(ProjectSnapshot {
            id,
            version: previous.map(|p| p.version).unwrap_or(0),
            definition: definition.to_path_buf(),
            dir,
            source_patterns: patterns,
            sources,
            ruleset,
            severity: Arc::new(resolved.config),
            ruleset_documents: resolved.documents,
            analyzer_paths,
            analyzers: report.loaded.into(),
            analyzer_failures: report.failures,
        })
    }

    /// Recompute only the parts named by `scope` on top of `current`.
    fn build_partial(
        &self,
        handle: &ProjectHandle,
        current: &ProjectSnapshot,
        scope: ReloadScope,
    ) -> ProjectResult<ProjectSnapshot> {
        let mut next = current.clone();
        if scope.ruleset {
            let resolved = self.resolve_ruleset(Some(handle), current.ruleset.as_ref())?;
            next.severity = Arc::new(resolved.config);
            next.ruleset_documents = resolved.documents;
        }
        if scope.analyzers {
            let report = self.load_analyzers(&current.id, &current.analyzer_paths);
            next.analyzers = report.loaded.into();
            next.analyzer_failures = report.failures;
        }
        if scope.sources {
            next.sources = collect_sources(&current.source_patterns)?;
        }
        Ok(next)
    }

    /// Diagnostics for one file, computed from a single snapshot.
    pub fn request_diagnostics(
        &self,
        engine: &dyn AnalysisEngine,
        id: &ProjectId,
        file: &Path,
    ) -> ProjectResult<Vec<Diagnostic>> {
        let snapshot = self.snapshot(id)?;
        analyze_file(engine, &snapshot, file)
    }

    /// Diagnostics for several files (every source when `files` is empty),
    /// all computed from the same snapshot.
    pub fn check(
        &self,
        engine: &dyn AnalysisEngine,
        id: &ProjectId,
        files: &[PathBuf],
    ) -> ProjectResult<CheckResult> {
        let snapshot = self.snapshot(id)?;
        let targets: Vec<PathBuf> = if files.is_empty() {
            snapshot.sources.iter().cloned().collect()
        } else {
            files.iter().map(|f| normalize_path(f)).collect()
        };
        let per_file = targets
            .par_iter()
            .map(|f| analyze_file(engine, &snapshot, f))
            .collect::<ProjectResult<Vec<_>>>()?;
        let diagnostics = per_file.into_iter().flatten().collect();
        Ok(CheckResult::new(id.to_string(), diagnostics, targets.len()))
    }
}

fn analyze_file(
    engine: &dyn AnalysisEngine,
    snapshot: &ProjectSnapshot,
    file: &Path,
) -> ProjectResult<Vec<Diagnostic>> {
    let text = fs::read_to_string(file).map_err(|e| ProjectError::Read {
        path: file.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(engine.analyze(&AnalysisRequest {
        file,
        text: &text,
        severity: &snapshot.severity,
        analyzers: &snapshot.analyzers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_collapses_to_full_on_definition() {
        assert_eq!(ReloadScope::RULESET.merge(ReloadScope::FULL), ReloadScope::FULL);
        let both = ReloadScope::RULESET.merge(ReloadScope::SOURCES);
        assert!(both.ruleset && both.sources && !both.analyzers && !both.definition);
        assert!(ReloadScope::NONE.merge(ReloadScope::NONE).is_empty());
    }

    #[test]
    fn queue_coalesces_work_arriving_while_running() {
        let mut q = ChangeQueue::default();
        assert!(q.enqueue(ReloadScope::RULESET));
        assert_eq!(q.next(), Some(ReloadScope::RULESET));

        // In flight: further work only merges.
        assert!(!q.enqueue(ReloadScope::RULESET));
        assert!(!q.enqueue(ReloadScope::RULESET));
        assert_eq!(q.next(), Some(ReloadScope::RULESET));
        assert_eq!(q.next(), None);

        // Drained: the next caller drains again.
        assert!(q.enqueue(ReloadScope::SOURCES));
    }

    #[test]
    fn queued_scopes_of_different_kinds_merge() {
        let mut q = ChangeQueue::default();
        assert!(q.enqueue(ReloadScope::RULESET));
        assert!(!q.enqueue(ReloadScope::ANALYZERS));
        let merged = q.next().unwrap();
        assert!(merged.ruleset && merged.analyzers);
        assert_eq!(q.next(), None);
    }
}
