//! The single mutable cell (spec.md §5): one [`Analyzer`] per server
//! instance, owning the workspace's [`WorkspaceState`] behind a mutex.
//! Mutating operations (`build`, `code_changed`, `parse_and_compile`,
//! `get_or_build`) take the lock for the whole synchronous transition and
//! install the result atomically; query operations (`definition`,
//! `completion`) snapshot the state under the lock, release, and compute
//! on the snapshot — mirroring `foundry-lsp`'s own `Analyzer` (see
//! `test_utils.rs`), generalized from "one compiled Foundry project" to
//! "one workspace's `WorkspaceState`".

#[cfg(test)]
pub mod test_utils;

use crate::compiler_facade::{BatchCompiler, RalphBatchCompiler};
use crate::completion::{self, Suggestion};
use crate::definition::{self};
use crate::dependency::DependencyId;
use crate::file_access::{FileAccess, RealFileAccess};
use crate::location::SourceLocation;
use crate::source::ParsedData;
use crate::uri::Uri;
use crate::workspace::{self, BuildOutcome, WorkspaceState};
use ralph_compiler::CompilerMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// An owned `(file, SourceIndex)` pair, detached from the snapshot it was
/// computed against — what crosses the lock boundary out of `Analyzer`.
#[derive(Debug, Clone)]
pub struct OwnedLocation {
    pub file_uri: Uri,
    pub index: ralph_compiler::SourceIndex,
}

impl From<SourceLocation<'_>> for OwnedLocation {
    fn from(loc: SourceLocation<'_>) -> Self {
        Self { file_uri: loc.source.file_uri.clone(), index: loc.index }
    }
}

pub struct Analyzer {
    state: Mutex<WorkspaceState>,
    files: Arc<dyn FileAccess>,
    compiler: Arc<dyn BatchCompiler>,
    /// Bumped on every mutating operation; §5's "single monotonic version
    /// counter" the adapter layer uses to discard stale publishes.
    version: AtomicU64,
}

impl Analyzer {
    pub fn new(workspace_uri: Uri, files: Arc<dyn FileAccess>, compiler: Arc<dyn BatchCompiler>) -> Self {
        Self { state: Mutex::new(workspace::create(workspace_uri)), files, compiler, version: AtomicU64::new(0) }
    }

    pub fn with_real_io(workspace_uri: Uri) -> Self {
        Self::new(workspace_uri, Arc::new(RealFileAccess), Arc::new(RalphBatchCompiler))
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// A cheap clone of the current state for read-only queries (§5:
    /// "snapshot-pure-functional views").
    pub fn snapshot(&self) -> WorkspaceState {
        self.state.lock().expect("analyzer mutex poisoned").clone()
    }

    /// `getOrBuild`: lazily advances `Created` toward a first build
    /// attempt, then immediately parses/compiles.
    pub fn initialize(&self) -> (WorkspaceState, u64) {
        let mut guard = self.state.lock().expect("analyzer mutex poisoned");
        let advanced = workspace::get_or_build(guard.clone(), self.files.as_ref(), self.compiler.as_ref());
        let compiled = workspace::parse_and_compile(advanced, self.files.as_ref(), self.compiler.as_ref());
        *guard = compiled.clone();
        (compiled, self.bump())
    }

    /// `build(buildURI, code?, state)`. Returns `None` when the build text
    /// is unchanged (so the adapter can clear stale errors without
    /// invalidating source state) — otherwise the freshly installed state
    /// plus its version.
    pub fn build_changed(&self, build_uri: Uri, code: Option<String>) -> Option<(WorkspaceState, u64)> {
        let mut guard = self.state.lock().expect("analyzer mutex poisoned");
        match workspace::build(build_uri, code, guard.clone(), self.files.as_ref(), self.compiler.as_ref()) {
            BuildOutcome::Unchanged => None,
            BuildOutcome::Changed(next) => {
                let compiled = workspace::parse_and_compile(next, self.files.as_ref(), self.compiler.as_ref());
                *guard = compiled.clone();
                Some((compiled, self.bump()))
            }
        }
    }

    /// `codeChanged` + `parseAndCompile` in one step — the shape every
    /// `didOpen`/`didChange` handler wants (spec §4.L).
    pub fn code_changed(&self, file_uri: Uri, updated_code: Option<String>) -> (WorkspaceState, u64) {
        let mut guard = self.state.lock().expect("analyzer mutex poisoned");
        let next = workspace::code_changed(file_uri, updated_code, guard.clone());
        let compiled = workspace::parse_and_compile(next, self.files.as_ref(), self.compiler.as_ref());
        *guard = compiled.clone();
        (compiled, self.bump())
    }

    /// Every `CompilerMessage` currently attached to build or source
    /// state, keyed by the `Uri` it diagnoses — the input to diagnostic
    /// publishing (spec §4.L, §7).
    pub fn diagnostics(&self, state: &WorkspaceState) -> Vec<(Uri, Vec<CompilerMessage>)> {
        let mut out = Vec::new();
        if let Some(build) = state.build() {
            let messages = match build {
                crate::build::BuildState::Errored { errors, .. } => errors.clone(),
                _ => Vec::new(),
            };
            if !messages.is_empty() {
                out.push((build.build_uri().clone(), messages));
            }
        }
        for source in state.sources() {
            let messages = source.messages();
            if !messages.is_empty() {
                out.push((source.file_uri().clone(), messages));
            }
        }
        out
    }

    pub fn definition(&self, file_uri: &Uri, offset: usize) -> Vec<OwnedLocation> {
        let snapshot = self.snapshot();
        let Some(source) = find_source(&snapshot, file_uri) else { return Vec::new() };

        let all_sources = workspace::parsed_workspace_sources(&snapshot);
        let builtin_sources = workspace::dependency_sources(&snapshot, DependencyId::BuiltIn);

        definition::go_to_definition(offset, source, &all_sources, &builtin_sources)
            .into_iter()
            .map(OwnedLocation::from)
            .collect()
    }

    pub fn completion(&self, file_uri: &Uri, offset: usize) -> Vec<Suggestion> {
        let snapshot = self.snapshot();
        let Some(source) = find_source(&snapshot, file_uri) else { return Vec::new() };

        let all_sources = workspace::parsed_workspace_sources(&snapshot);
        let builtin_sources = workspace::dependency_sources(&snapshot, DependencyId::BuiltIn);

        completion::complete(offset, source, &all_sources, &builtin_sources)
    }
}

fn find_source<'a>(state: &'a WorkspaceState, file_uri: &Uri) -> Option<&'a ParsedData> {
    workspace::parsed_workspace_sources(state)
        .into_iter()
        .find(|s| s.file_uri.as_str() == file_uri.as_str())
}
