#![cfg(test)]

//! Test harness mirroring `forge-lsp`'s own `setup_analyzer`: a temp
//! directory with a `ralph.json` and a `contracts/` tree, wired into a
//! fresh [`Analyzer`] backed by real disk I/O.

use crate::analyzer::Analyzer;
use crate::uri::Uri;
use std::fs;
use tempfile::{tempdir, TempDir};

/// Creates a temporary workspace: `ralph.json` (contractPath=`contracts`,
/// artifactPath=`artifacts`) plus the given `(filename, code)` contracts
/// under `contracts/`, then runs `initialize()` so the returned analyzer
/// is in whatever post-compile state the fixtures produce.
pub fn setup_analyzer(contracts: &[(&str, &str)]) -> (Uri, Analyzer, TempDir) {
    let temp_dir = tempdir().expect("failed to create temporary directory");
    let root = temp_dir.path();

    let contracts_dir = root.join("contracts");
    let artifacts_dir = root.join("artifacts");
    fs::create_dir(&contracts_dir).expect("failed to create contracts directory");
    fs::create_dir(&artifacts_dir).expect("failed to create artifacts directory");

    fs::write(
        root.join("ralph.json"),
        r#"{"contractPath":"contracts","artifactPath":"artifacts"}"#,
    )
    .expect("failed to write ralph.json");

    for (name, content) in contracts {
        fs::write(contracts_dir.join(name), content).expect("failed to write contract fixture");
    }

    let workspace_uri = Uri::from_file_path(root).expect("workspace root must be a valid file URI");
    let file_uri = contracts
        .first()
        .and_then(|(name, _)| Uri::from_file_path(contracts_dir.join(name)))
        .unwrap_or_else(|| workspace_uri.clone());

    let analyzer = Analyzer::with_real_io(workspace_uri);
    analyzer.initialize();

    (file_uri, analyzer, temp_dir)
}
