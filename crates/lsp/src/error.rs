//! Per-component error enums (spec.md §7). Each boundary gets its own
//! `thiserror` type; the top-level [`CoreError`] only exists for the
//! handful of protocol-level preconditions that are genuinely fatal for a
//! single request (no client, no workspace URI). Everything else is
//! captured as a [`ralph_compiler::CompilerMessage`] attached to build or
//! source state, never propagated as a Rust error out of a state
//! transition — mirroring `foundry_compilers::error::SolcError`'s role in
//! the teacher stack.

use crate::uri::Uri;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("file not found: {0}")]
    NotFound(Uri),
    #[error("io error reading {uri}: {source}")]
    Io {
        uri: Uri,
        #[source]
        source: std::io::Error,
    },
    #[error("path has no valid file URI: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build file is not valid JSON")]
    ParseError,
    #[error("build file must sit directly in the workspace root")]
    InvalidBuildFileLocation,
    #[error("path lies outside the workspace")]
    DirectoryOutsideWorkspace,
    #[error("path does not exist on disk")]
    DirectoryDoesNotExist,
}

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("failed to materialize dependency {id} at {path}: {source}")]
    ErrorDownloadingDependency { id: String, path: String, #[source] source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown import `{0}`")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Protocol-level preconditions that make a request meaningless rather
/// than merely unsuccessful. These are the only errors allowed to escape
/// a core operation as a Rust `Err`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("client was not configured before this request")]
    ClientNotConfigured,
    #[error("no workspace folder was supplied on initialize")]
    WorkspaceFolderNotSupplied,
    #[error("unrecognized file extension for {0}")]
    UnknownFile(Uri),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
