//! Components 4.C–4.D: the build-file lifecycle (`BuildState`) and its
//! validator. `ralph.json` parses into a [`BuildConfig`] via `serde`
//! (spec.md §6's schema), then [`validate`] checks path containment and
//! existence, accumulating every error before deciding pass/fail — the
//! same "collect everything, then decide" shape `foundry_compilers`'
//! artifact-output validation uses.

use crate::dependency::DependencyWorkspace;
use crate::error::BuildError;
use crate::uri::Uri;
use ralph_compiler::{CompilerMessage, SourceIndex};
use serde::Deserialize;

/// Schema of `ralph.json` (spec.md §6). Unknown keys are rejected, which
/// is how "Unknown keys rejected with a parse error" is realized.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFileSchema {
    #[serde(rename = "compilerOptions", default)]
    pub compiler_options: serde_json::Value,
    #[serde(rename = "contractPath")]
    pub contract_path: String,
    #[serde(rename = "artifactPath")]
    pub artifact_path: String,
}

/// `config` payload carried by both `BuildParsed` and `BuildCompiled`; in
/// the latter, `contract_path`/`artifact_path` are resolved to absolute
/// `Uri`s within the workspace.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub compiler_options: serde_json::Value,
    pub contract_path: String,
    pub artifact_path: String,
}

impl From<BuildFileSchema> for BuildConfig {
    fn from(schema: BuildFileSchema) -> Self {
        Self {
            compiler_options: schema.compiler_options,
            contract_path: schema.contract_path,
            artifact_path: schema.artifact_path,
        }
    }
}

/// Resolved, validated config: both paths are absolute `Uri`s known to
/// lie within the workspace directory (invariant 1, spec.md §8).
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub compiler_options: serde_json::Value,
    pub contract_path: Uri,
    pub artifact_path: Uri,
}

#[derive(Debug, Clone)]
pub enum BuildState {
    Parsed { build_uri: Uri, code: String, config: BuildConfig },
    Compiled {
        build_uri: Uri,
        code: String,
        config: ResolvedConfig,
        dependency: Option<Box<DependencyWorkspace>>,
        dependency_path: Uri,
    },
    Errored {
        build_uri: Uri,
        code: Option<String>,
        errors: Vec<CompilerMessage>,
        dependency: Option<Box<DependencyWorkspace>>,
        /// Previous successful compile, retained so the adapter can fall
        /// back to it (spec's "retain previous compiled build").
        activate_workspace: Option<Box<BuildState>>,
    },
}

impl BuildState {
    pub fn build_uri(&self) -> &Uri {
        match self {
            Self::Parsed { build_uri, .. } => build_uri,
            Self::Compiled { build_uri, .. } => build_uri,
            Self::Errored { build_uri, .. } => build_uri,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Parsed { code, .. } => Some(code),
            Self::Compiled { code, .. } => Some(code),
            Self::Errored { code, .. } => code.as_deref(),
        }
    }

    pub fn as_compiled(&self) -> Option<(&ResolvedConfig, Option<&DependencyWorkspace>)> {
        match self {
            Self::Compiled { config, dependency, .. } => Some((config, dependency.as_deref())),
            _ => None,
        }
    }
}

/// `BuildState::parse` (spec §4.C): JSON-parse the build file's text.
/// JSON syntax errors become `BuildErrored` with a `SourceIndex` pointing
/// at the offending token, located via `serde_json`'s line/column via
/// [`locate_json_error`].
pub fn parse(build_uri: Uri, code: String) -> BuildState {
    match serde_json::from_str::<BuildFileSchema>(&code) {
        Ok(schema) => BuildState::Parsed { build_uri, code, config: schema.into() },
        Err(err) => {
            let index = locate_json_error(&build_uri, &code, &err);
            BuildState::Errored {
                build_uri,
                code: Some(code),
                errors: vec![CompilerMessage::error(format!("{}: {err}", BuildError::ParseError), index)],
                dependency: None,
                activate_workspace: None,
            }
        }
    }
}

fn locate_json_error(build_uri: &Uri, code: &str, err: &serde_json::Error) -> SourceIndex {
    let mut offset = 0usize;
    for (i, line) in code.split('\n').enumerate() {
        if i + 1 == err.line() {
            offset += (err.column().saturating_sub(1)).min(line.len());
            break;
        }
        offset += line.len() + 1;
    }
    SourceIndex::new(build_uri.as_str(), offset, 1)
}

/// `BuildState::validate` (spec §4.D). Resolves `contractPath` and
/// `artifactPath` against `workspaceURI`, checks containment then
/// existence, and accumulates every failure before returning
/// `BuildErrored` — never fails on the first violation. Either path
/// resolving outside the workspace is reported as
/// `DirectoryOutsideWorkspace`; `DirectoryDoesNotExist` is reserved for a
/// contained path that isn't actually on disk.
pub fn validate(
    parsed: BuildState,
    workspace_uri: &Uri,
    exists: impl Fn(&Uri) -> bool,
) -> BuildState {
    let BuildState::Parsed { build_uri, code, config } = parsed else {
        return parsed;
    };

    let mut errors = Vec::new();

    let contract_path = workspace_uri.join(&append_slash(&config.contract_path));
    let artifact_path = workspace_uri.join(&append_slash(&config.artifact_path));

    let contract_path = match contract_path {
        Some(uri) if workspace_uri.contains(&uri) => Some(uri),
        Some(_) | None => {
            errors.push(CompilerMessage::error(
                BuildError::DirectoryOutsideWorkspace.to_string(),
                last_occurrence_index(&build_uri, &code, &config.contract_path),
            ));
            None
        }
    };

    let artifact_path = match artifact_path {
        Some(uri) if workspace_uri.contains(&uri) => Some(uri),
        Some(_) | None => {
            errors.push(CompilerMessage::error(
                BuildError::DirectoryOutsideWorkspace.to_string(),
                last_occurrence_index(&build_uri, &code, &config.artifact_path),
            ));
            None
        }
    };

    if let Some(uri) = &contract_path {
        if !exists(uri) {
            errors.push(CompilerMessage::error(
                BuildError::DirectoryDoesNotExist.to_string(),
                last_occurrence_index(&build_uri, &code, &config.contract_path),
            ));
        }
    }
    if let Some(uri) = &artifact_path {
        if !exists(uri) {
            errors.push(CompilerMessage::error(
                BuildError::DirectoryDoesNotExist.to_string(),
                last_occurrence_index(&build_uri, &code, &config.artifact_path),
            ));
        }
    }

    if !errors.is_empty() {
        return BuildState::Errored { build_uri, code: Some(code), errors, dependency: None, activate_workspace: None };
    }

    BuildState::Parsed {
        build_uri: build_uri.clone(),
        code,
        config: BuildConfig {
            compiler_options: config.compiler_options,
            contract_path: contract_path.unwrap().as_str().to_string(),
            artifact_path: artifact_path.unwrap().as_str().to_string(),
        },
    }
}

fn append_slash(relative: &str) -> String {
    if relative.ends_with('/') { relative.to_string() } else { format!("{relative}/") }
}

/// Open question resolved (spec §9): error indexing uses a last-occurrence
/// textual search for the offending literal, documented as a placeholder
/// until an AST-based locator replaces it.
pub fn last_occurrence_index(build_uri: &Uri, code: &str, needle: &str) -> SourceIndex {
    match code.rfind(needle) {
        Some(offset) => SourceIndex::new(build_uri.as_str(), offset, needle.len()),
        None => SourceIndex::zero(build_uri.as_str()),
    }
}

/// `validateBuildURI` (spec §4.D): the build file must sit directly in
/// the workspace root.
pub fn validate_build_uri(build_uri: &Uri, workspace_uri: &Uri) -> Result<(), CompilerMessage> {
    match build_uri.parent() {
        Some(parent) if parent.as_str() == workspace_uri.ensure_dir().as_str() => Ok(()),
        _ => Err(CompilerMessage::error(
            BuildError::InvalidBuildFileLocation.to_string(),
            SourceIndex::zero(build_uri.as_str()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Uri {
        Uri::from_url(tower_lsp::lsp_types::Url::parse(path).unwrap())
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let build_uri = uri("file:///w/ralph.json");
        let code = r#"{"contractPath":"contracts","artifactPath":"artifacts","typo":1}"#.to_string();
        let state = parse(build_uri, code);
        assert!(matches!(state, BuildState::Errored { .. }));
    }

    #[test]
    fn parse_accepts_known_schema() {
        let build_uri = uri("file:///w/ralph.json");
        let code = r#"{"contractPath":"contracts","artifactPath":"artifacts"}"#.to_string();
        let state = parse(build_uri, code);
        assert!(matches!(state, BuildState::Parsed { .. }));
    }

    #[test]
    fn validate_flags_outside_workspace_path() {
        let workspace = uri("file:///w/");
        let build_uri = uri("file:///w/ralph.json");
        let code = r#"{"contractPath":"contracts","artifactPath":"../outside"}"#.to_string();
        let parsed = parse(build_uri, code);
        let validated = validate(parsed, &workspace, |_| true);
        match validated {
            BuildState::Errored { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].index.offset, code_of().rfind("../outside").unwrap());
                assert!(errors[0].message.contains(&BuildError::DirectoryOutsideWorkspace.to_string()));
            }
            other => panic!("expected Errored, got {other:?}"),
        }

        fn code_of() -> String {
            r#"{"contractPath":"contracts","artifactPath":"../outside"}"#.to_string()
        }
    }

    #[test]
    fn validate_accepts_contained_existing_paths() {
        let workspace = uri("file:///w/");
        let build_uri = uri("file:///w/ralph.json");
        let code = r#"{"contractPath":"contracts","artifactPath":"artifacts"}"#.to_string();
        let parsed = parse(build_uri, code);
        let validated = validate(parsed, &workspace, |_| true);
        assert!(matches!(validated, BuildState::Parsed { .. }));
    }

    #[test]
    fn build_uri_must_be_workspace_root() {
        let workspace = uri("file:///w/");
        let nested = uri("file:///w/sub/ralph.json");
        assert!(validate_build_uri(&nested, &workspace).is_err());
        let root = uri("file:///w/ralph.json");
        assert!(validate_build_uri(&root, &workspace).is_ok());
    }
}
