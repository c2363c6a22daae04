//! Component 4.E: the dependency loader. Materializes the two bundled
//! source sets (`std`, `built-in`) onto disk under the dependency root on
//! first successful build compile, then parses/compiles them through the
//! same pipeline ordinary workspace sources go through — producing a
//! synthetic, always-`Compiled` sub-workspace the rest of the pipeline can
//! treat uniformly.
//!
//! Bundled sources are embedded in the binary via `rust_embed`, the way
//! the broader corpus bundles static assets that ship with the server
//! rather than being fetched at runtime.

use crate::compiler_facade::BatchCompiler;
use crate::error::DependencyError;
use crate::file_access::FileAccess;
use crate::source::SourceCodeState;
use crate::uri::Uri;
use rust_embed::RustEmbed;
use std::collections::BTreeMap;

#[derive(RustEmbed)]
#[folder = "assets/std/"]
struct StdAssets;

#[derive(RustEmbed)]
#[folder = "assets/built-in/"]
struct BuiltinAssets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyId {
    Std,
    BuiltIn,
}

impl DependencyId {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Std => "std",
            Self::BuiltIn => "built-in",
        }
    }
}

/// The synthetic compiled sub-workspace spec §4.E describes: two
/// addressable trees, `std` and `built-in`, each a flat list of already
/// `Compiled`/`ErrorSource` sources.
#[derive(Debug, Clone, Default)]
pub struct DependencyWorkspace {
    pub trees: BTreeMap<DependencyId, Vec<SourceCodeState>>,
}

impl DependencyWorkspace {
    pub fn sources(&self, id: DependencyId) -> &[SourceCodeState] {
        self.trees.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_sources(&self) -> impl Iterator<Item = &SourceCodeState> {
        self.trees.values().flatten()
    }
}

/// Loads (materializing if needed) both bundled sets and compiles them,
/// producing the final `DependencyWorkspace` carried by `BuildCompiled`.
pub fn load_dependencies(
    dependency_root: &Uri,
    files: &dyn FileAccess,
    compiler: &dyn BatchCompiler,
) -> Result<DependencyWorkspace, DependencyError> {
    let mut trees = BTreeMap::new();
    trees.insert(DependencyId::Std, materialize::<StdAssets>(DependencyId::Std, dependency_root, files, compiler)?);
    trees.insert(
        DependencyId::BuiltIn,
        materialize::<BuiltinAssets>(DependencyId::BuiltIn, dependency_root, files, compiler)?,
    );
    Ok(DependencyWorkspace { trees })
}

/// For each bundled `(relativePath, code)`: if a file already exists at
/// `dependencyPath/relativePath` it is left untouched (open question in
/// spec §9, "do not overwrite" preserved exactly); otherwise the bundled
/// code is written. Every file is then parsed and compiled through the
/// ordinary batch-compiler pipeline.
fn materialize<A: RustEmbed>(
    id: DependencyId,
    dependency_root: &Uri,
    files: &dyn FileAccess,
    compiler: &dyn BatchCompiler,
) -> Result<Vec<SourceCodeState>, DependencyError> {
    let subtree = dependency_root
        .join(&format!("{}/", id.dir_name()))
        .expect("dependency root must be a valid base URI");

    let mut compiled = Vec::new();
    for relative_path in A::iter() {
        let file = A::get(&relative_path).expect("embedded asset listed by iter() must exist");
        let code = String::from_utf8_lossy(file.data.as_ref()).into_owned();

        let uri = subtree.join(&relative_path).expect("embedded asset path must be a valid relative URI");

        let already_present = files.exists(&uri).unwrap_or(false);
        if !already_present {
            files
                .write(&uri, &code)
                .map_err(|source| DependencyError::ErrorDownloadingDependency {
                    id: format!("{id:?}"),
                    path: uri.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, source.to_string()),
                })?;
        }

        // Always compile from the bundled `code`, regardless of whether an
        // on-disk copy already existed — the bundle is the source of truth
        // for what the dependency subtree contains.
        let state = SourceCodeState::OnDisk { file_uri: uri };
        let state = crate::source::parse(state, files, compiler);
        let state = crate::source::compile_single(state, compiler);
        compiled.push(state);
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_facade::RalphBatchCompiler;
    use crate::file_access::fake::FakeFileAccess;

    fn uri(path: &str) -> Uri {
        Uri::from_url(tower_lsp::lsp_types::Url::parse(path).unwrap())
    }

    #[test]
    fn materializes_std_and_builtin_without_overwrite() {
        let root = uri("file:///home/.ralph-lsp/dependencies/");
        let files = FakeFileAccess::default();
        let compiler = RalphBatchCompiler;

        let deps = load_dependencies(&root, &files, &compiler).unwrap();
        assert!(!deps.sources(DependencyId::Std).is_empty());
        assert!(!deps.sources(DependencyId::BuiltIn).is_empty());

        // Pre-seed an existing file with different content; re-running
        // must not overwrite it.
        let std_uri = root.join("std/").unwrap().join("nft_interface.ral").unwrap();
        files.write(&std_uri, "pre-existing").unwrap();
        load_dependencies(&root, &files, &compiler).unwrap();
        assert_eq!(files.read(&std_uri).unwrap(), "pre-existing");
    }
}
