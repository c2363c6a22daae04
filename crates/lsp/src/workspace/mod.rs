//! The workspace engine. Owns the top-level `WorkspaceState` state machine
//! and orchestrates the build and source lifecycles behind it. Every
//! function here is a pure transition: `(state, event) -> state`; the
//! caller (the [`crate::analyzer::Analyzer`]) is the one that actually
//! holds the mutable cell.

use crate::build::{self, BuildState};
use crate::compiler_facade::BatchCompiler;
use crate::dependency::{self, DependencyId};
use crate::file_access::FileAccess;
use crate::import;
use crate::source::{self, ParsedData, SourceCodeState};
use crate::uri::Uri;
use ralph_compiler::CompilerMessage;

#[derive(Debug, Clone)]
pub enum WorkspaceState {
    Created { workspace_uri: Uri },
    BuildAware { workspace_uri: Uri, build: Box<BuildState>, sources: Vec<SourceCodeState> },
}

/// Returned by [`build`] when the incoming build-file text is unchanged
/// from the current build's, so the adapter can clear stale errors
/// without invalidating source state.
pub enum BuildOutcome {
    Changed(WorkspaceState),
    Unchanged,
}

impl WorkspaceState {
    pub fn workspace_uri(&self) -> &Uri {
        match self {
            Self::Created { workspace_uri } => workspace_uri,
            Self::BuildAware { workspace_uri, .. } => workspace_uri,
        }
    }

    pub fn build(&self) -> Option<&BuildState> {
        match self {
            Self::Created { .. } => None,
            Self::BuildAware { build, .. } => Some(build),
        }
    }

    pub fn sources(&self) -> &[SourceCodeState] {
        match self {
            Self::Created { .. } => &[],
            Self::BuildAware { sources, .. } => sources,
        }
    }

    /// All sources compiled and the build itself compiled.
    pub fn is_compiled(&self) -> bool {
        matches!(self.build(), Some(BuildState::Compiled { .. }))
            && self.sources().iter().all(|s| matches!(s, SourceCodeState::Compiled { .. } | SourceCodeState::ErrorSource { .. }))
    }

    pub fn is_parsed(&self) -> bool {
        self.sources().iter().all(|s| s.as_parsed().is_some())
    }
}

/// `create(workspaceURI)`.
pub fn create(workspace_uri: Uri) -> WorkspaceState {
    WorkspaceState::Created { workspace_uri }
}

/// `build(buildURI, code?, state)`. Reads from disk when `code` is
/// `None`, parses, validates, loads dependencies, and synchronizes the
/// source set. Detects "build unchanged" so the adapter can clear stale
/// errors without invalidating source state.
pub fn build(
    build_uri: Uri,
    code: Option<String>,
    state: WorkspaceState,
    files: &dyn FileAccess,
    compiler: &dyn BatchCompiler,
) -> BuildOutcome {
    let workspace_uri = state.workspace_uri().clone();

    let code = match code {
        Some(code) => code,
        None => match files.read(&build_uri) {
            Ok(code) => code,
            Err(err) => {
                return BuildOutcome::Changed(errored(
                    workspace_uri,
                    build_uri.clone(),
                    None,
                    vec![CompilerMessage::error(err.to_string(), ralph_compiler::SourceIndex::zero(build_uri.as_str()))],
                    previous_build(&state),
                ));
            }
        },
    };

    if let Some(current) = state.build() {
        if current.code() == Some(code.as_str()) {
            return BuildOutcome::Unchanged;
        }
    }

    if let Err(message) = build::validate_build_uri(&build_uri, &workspace_uri) {
        return BuildOutcome::Changed(errored(workspace_uri, build_uri, Some(code), vec![message], previous_build(&state)));
    }

    let parsed = build::parse(build_uri.clone(), code.clone());
    let validated = build::validate(parsed, &workspace_uri, |uri| files.exists(uri).unwrap_or(false));

    let BuildState::Parsed { config, .. } = validated else {
        let BuildState::Errored { errors, .. } = validated else { unreachable!("validate only returns Parsed or Errored") };
        return BuildOutcome::Changed(errored(workspace_uri, build_uri, Some(code), errors, previous_build(&state)));
    };

    let contract_path = Uri::from_url(tower_lsp::lsp_types::Url::parse(&config.contract_path).unwrap());
    let artifact_path = Uri::from_url(tower_lsp::lsp_types::Url::parse(&config.artifact_path).unwrap());

    let dependency_root = dependency_root_uri(&workspace_uri);
    let dependencies = match dependency::load_dependencies(&dependency_root, files, compiler) {
        Ok(deps) => deps,
        Err(err) => {
            return BuildOutcome::Changed(errored(
                workspace_uri,
                build_uri.clone(),
                Some(code),
                vec![CompilerMessage::error(err.to_string(), ralph_compiler::SourceIndex::zero(build_uri.as_str()))],
                previous_build(&state),
            ));
        }
    };

    let resolved = build::ResolvedConfig {
        compiler_options: config.compiler_options,
        contract_path: contract_path.clone(),
        artifact_path,
    };

    let compiled_build = BuildState::Compiled {
        build_uri,
        code,
        config: resolved,
        dependency: Some(Box::new(dependencies)),
        dependency_path: dependency_root,
    };

    // A listing failure here means `contractPath` is unreadable despite
    // just having been validated as existing; fall back to an empty
    // source set rather than failing the whole build.
    let sources = source::synchronise(&contract_path, Vec::new(), files).unwrap_or_default();

    BuildOutcome::Changed(WorkspaceState::BuildAware { workspace_uri, build: Box::new(compiled_build), sources })
}

fn dependency_root_uri(workspace_uri: &Uri) -> Uri {
    workspace_uri.join("ralph-lsp-dependencies/").expect("workspace_uri is a valid base")
}

fn previous_build(state: &WorkspaceState) -> Option<Box<BuildState>> {
    match state {
        WorkspaceState::BuildAware { build, .. } => match build.as_ref() {
            compiled @ BuildState::Compiled { .. } => Some(Box::new(compiled.clone())),
            BuildState::Errored { activate_workspace, .. } => activate_workspace.clone(),
            BuildState::Parsed { .. } => None,
        },
        WorkspaceState::Created { .. } => None,
    }
}

fn errored(
    workspace_uri: Uri,
    build_uri: Uri,
    code: Option<String>,
    errors: Vec<CompilerMessage>,
    activate_workspace: Option<Box<BuildState>>,
) -> WorkspaceState {
    let build = BuildState::Errored { build_uri, code, errors, dependency: None, activate_workspace };
    WorkspaceState::BuildAware { workspace_uri, build: Box::new(build), sources: Vec::new() }
}

/// `getOrBuild(state)`: lazily advance `Created` toward a first build
/// attempt.
pub fn get_or_build(state: WorkspaceState, files: &dyn FileAccess, compiler: &dyn BatchCompiler) -> WorkspaceState {
    match state {
        WorkspaceState::Created { workspace_uri } => {
            let build_uri = workspace_uri.join("ralph.json").expect("workspace_uri is a valid base");
            match build(build_uri, None, WorkspaceState::Created { workspace_uri }, files, compiler) {
                BuildOutcome::Changed(next) => next,
                BuildOutcome::Unchanged => unreachable!("a freshly Created workspace has no prior build to match"),
            }
        }
        already @ WorkspaceState::BuildAware { .. } => already,
    }
}

/// `codeChanged(fileURI, updatedCode?, state)`: per-source edit. With
/// `Some(code)` the source becomes `UnCompiled`; with `None` (save/close)
/// it becomes `OnDisk` so the next access re-reads from disk.
pub fn code_changed(file_uri: Uri, updated_code: Option<String>, state: WorkspaceState) -> WorkspaceState {
    let WorkspaceState::BuildAware { workspace_uri, build, sources } = state else { return state };

    let mut sources = sources;
    let next = match updated_code {
        Some(code) => SourceCodeState::UnCompiled { file_uri: file_uri.clone(), code },
        None => SourceCodeState::OnDisk { file_uri: file_uri.clone() },
    };

    if let Some(existing) = sources.iter_mut().find(|s| s.file_uri().as_str() == file_uri.as_str()) {
        *existing = next;
    } else {
        sources.push(next);
    }

    WorkspaceState::BuildAware { workspace_uri, build, sources }
}

/// `parseAndCompile(state)`: drive every source through `parse`, then
/// `compile` the full set. Produces `Compiled` (with the previous
/// `Parsed` view implicitly available via `SourceCodeState::Compiled`) or
/// leaves per-file `ErrorSource`s in place; a workspace-level error
/// surfaces only when the build itself failed.
pub fn parse_and_compile(
    state: WorkspaceState,
    files: &dyn FileAccess,
    compiler: &dyn BatchCompiler,
) -> WorkspaceState {
    let WorkspaceState::BuildAware { workspace_uri, build, sources } = state else { return state };

    let parsed_sources: Vec<SourceCodeState> = sources.into_iter().map(|s| source::parse(s, files, compiler)).collect();

    let extension = "ral";
    let dependency_sources: Vec<SourceCodeState> = match build.as_ref() {
        BuildState::Compiled { dependency: Some(dep), .. } => dep.all_sources().cloned().collect(),
        _ => Vec::new(),
    };

    let checked_sources: Vec<SourceCodeState> = parsed_sources
        .into_iter()
        .map(|state| resolve_imports_then_compile(state, &dependency_sources, extension, compiler))
        .collect();

    WorkspaceState::BuildAware { workspace_uri, build, sources: checked_sources }
}

fn resolve_imports_then_compile(
    state: SourceCodeState,
    dependency_sources: &[SourceCodeState],
    extension: &str,
    compiler: &dyn BatchCompiler,
) -> SourceCodeState {
    let import_errors = match state.as_parsed() {
        Some(parsed) => import::resolve(&parsed.import_statements, dependency_sources, extension).1,
        None => return source::compile_single(state, compiler),
    };

    if import_errors.is_empty() {
        return source::compile_single(state, compiler);
    }

    let SourceCodeState::Parsed(data) = state else { unreachable!("as_parsed() returned Some") };
    let errors = import_errors
        .into_iter()
        .map(|err| CompilerMessage::error(err.to_string(), ralph_compiler::SourceIndex::zero(data.file_uri.as_str())))
        .collect();
    SourceCodeState::ErrorSource {
        file_uri: data.file_uri.clone(),
        code: data.code.clone(),
        errors,
        previous: Some(Box::new(data)),
    }
}

/// Every [`ParsedData`] reachable from a `BuildAware` workspace — its own
/// sources plus the dependency subtrees — the shared input for
/// go-to-definition and completion (§4.I's `collectParsed`).
pub fn parsed_workspace_sources(state: &WorkspaceState) -> Vec<&ParsedData> {
    let mut out: Vec<&ParsedData> = state.sources().iter().filter_map(|s| s.as_parsed()).collect();
    if let Some(BuildState::Compiled { dependency: Some(dep), .. }) = state.build() {
        out.extend(dep.all_sources().filter_map(|s| s.as_parsed()));
    }
    out
}

pub fn dependency_sources(state: &WorkspaceState, id: DependencyId) -> Vec<&ParsedData> {
    match state.build() {
        Some(BuildState::Compiled { dependency: Some(dep), .. }) => {
            dep.sources(id).iter().filter_map(|s| s.as_parsed()).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests;
