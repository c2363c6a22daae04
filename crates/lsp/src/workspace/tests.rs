//! End-to-end scenarios E1–E6 from spec.md §8, driven through
//! [`crate::analyzer::test_utils::setup_analyzer`] against a real
//! `tempfile::tempdir()`-backed workspace — matching `forge-lsp`'s own
//! `test_utils.rs::setup_analyzer` harness pattern.

use crate::analyzer::test_utils::setup_analyzer;
use crate::analyzer::Analyzer;
use crate::build::BuildState;
use crate::error::BuildError;
use crate::file_access::{FileAccess, RealFileAccess};
use crate::source::SourceCodeState;
use crate::uri::Uri;
use std::fs;
use tempfile::tempdir;

/// E1: empty `contracts`/`artifacts`, both existing. Expected:
/// `BuildCompiled`; workspace `Compiled` with zero sources, zero errors.
#[test]
fn e1_empty_workspace_compiles_with_no_sources() {
    let (_, analyzer, _tmp) = setup_analyzer(&[]);
    let state = analyzer.snapshot();

    assert!(matches!(state.build(), Some(BuildState::Compiled { .. })));
    assert!(state.sources().is_empty());
    assert!(analyzer.diagnostics(&state).is_empty());
}

/// E2: `artifactPath="../outside"`. Expected: `BuildErrored` with exactly
/// one `DirectoryOutsideWorkspace` error whose range is the last textual
/// occurrence of `"../outside"`.
#[test]
fn e2_artifact_path_outside_workspace_errors() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("contracts")).unwrap();

    let code = r#"{"contractPath":"contracts","artifactPath":"../outside"}"#;
    fs::write(root.join("ralph.json"), code).unwrap();

    let workspace_uri = Uri::from_file_path(root).unwrap();
    let analyzer = Analyzer::with_real_io(workspace_uri);
    let (state, _) = analyzer.initialize();

    match state.build() {
        Some(BuildState::Errored { errors, .. }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].index.offset, code.rfind("../outside").unwrap());
            assert_eq!(errors[0].index.width, "../outside".len());
            assert!(errors[0].message.contains(&BuildError::DirectoryOutsideWorkspace.to_string()));
        }
        other => panic!("expected Errored, got {other:?}"),
    }
}

/// E3: `B.ral` imports and calls into `A.ral`. After `parseAndCompile`
/// both are `Compiled`; go-to-definition on the call resolves to `f`'s
/// signature in `A.ral`.
#[test]
fn e3_contract_call_resolves_across_files() {
    let a_code = "Contract A(id:U256){ pub fn f()->U256 { return id } }";
    let b_code = "Contract B(a:A){ pub fn g()->U256 { return a.f() } }";
    let (file_uri, analyzer, _tmp) = setup_analyzer(&[("A.ral", a_code), ("B.ral", b_code)]);

    let state = analyzer.snapshot();
    for source in state.sources() {
        assert!(matches!(source, SourceCodeState::Compiled { .. }), "expected Compiled, got {source:?}");
    }

    let b_uri = file_uri.parent().unwrap().join("B.ral").unwrap();
    let offset = b_code.find("f()").unwrap();
    let results = analyzer.definition(&b_uri, offset);

    assert_eq!(results.len(), 1);
    assert!(results[0].file_uri.as_str().ends_with("A.ral"));
}

/// E4: a `std` import resolves once the bundled archive is materialized;
/// a second session reuses the extracted files without rewriting them.
#[test]
fn e4_std_import_materializes_once_and_is_reused() {
    let code = r#"import "std/nft_interface"
Contract A(id:U256){ pub fn f()->Bool { return id } }"#;
    let (_, analyzer, tmp) = setup_analyzer(&[("A.ral", code)]);

    let state = analyzer.snapshot();
    assert!(matches!(state.sources().first(), Some(SourceCodeState::Compiled { .. })));

    let dependency_root = tmp.path().join("ralph-lsp-dependencies").join("std");
    assert!(dependency_root.join("nft_interface.ral").exists());

    let files = RealFileAccess;
    let std_uri = Uri::from_file_path(dependency_root.join("nft_interface.ral")).unwrap();
    let original = files.read(&std_uri).unwrap();

    // Re-running a build against the same workspace must not rewrite an
    // already-materialized dependency file (spec §9's open question,
    // preserved).
    let workspace_uri = Uri::from_file_path(tmp.path()).unwrap();
    let build_uri = workspace_uri.join("ralph.json").unwrap();
    analyzer.build_changed(build_uri, None);
    assert_eq!(files.read(&std_uri).unwrap(), original);
}

/// E5: an edit introduces an unbound identifier. The edited file becomes
/// `ErrorSource` with its last good `Parsed` retained; sibling files stay
/// `Compiled`.
#[test]
fn e5_edit_with_unbound_identifier_retains_previous_parse() {
    let a_code = "Contract A(id:U256){ pub fn f()->U256 { return id } }";
    let sibling_code = "Contract S(id:U256){ pub fn h()->U256 { return id } }";
    let (file_uri, analyzer, _tmp) = setup_analyzer(&[("A.ral", a_code), ("S.ral", sibling_code)]);

    let broken = "Contract A(id:U256){ pub fn f()->U256 { return X } }";
    let (state, _) = analyzer.code_changed(file_uri.clone(), Some(broken.to_string()));

    let edited = state.sources().iter().find(|s| s.file_uri().as_str() == file_uri.as_str()).unwrap();
    match edited {
        SourceCodeState::ErrorSource { previous, .. } => assert!(previous.is_some()),
        other => panic!("expected ErrorSource, got {other:?}"),
    }

    let sibling = state.sources().iter().find(|s| s.file_uri().as_str() != file_uri.as_str()).unwrap();
    assert!(matches!(sibling, SourceCodeState::Compiled { .. }));
}

/// E6: an inheritance chain with a self-loop and a two-cycle.
/// `collectInheritanceInScope` still terminates and de-duplicates.
#[test]
fn e6_inheritance_closure_survives_cycles_and_self_reference() {
    let child = parsed_fixture("Child.ral", "Contract Child(x:U256) extends P2 { fn f() {} }");
    let p2 = parsed_fixture("P2.ral", "Contract P2(x:U256) extends P4, P6 { fn f() {} }");
    let p4 = parsed_fixture("P4.ral", "Contract P4(x:U256) extends P5, P6, P4 { fn f() {} }");
    let p5 = parsed_fixture("P5.ral", "Contract P5(x:U256) extends P4 { fn f() {} }");
    let p6 = parsed_fixture("P6.ral", "Contract P6(x:U256) { fn f() {} }");

    let all: Vec<&crate::source::ParsedData> = vec![&child, &p2, &p4, &p5, &p6];
    let closure = crate::search::collect_inheritance_in_scope(&child, &all);

    let names: std::collections::HashSet<&str> = closure.iter().map(|t| t.name()).collect();
    assert_eq!(names, std::collections::HashSet::from(["P2", "P4", "P5", "P6"]));
    assert_eq!(closure.len(), names.len());
}

fn parsed_fixture(file: &str, code: &str) -> crate::source::ParsedData {
    let ast = ralph_compiler::parse(file, code).expect("fixture parses");
    let import_statements = crate::import::extract_imports(file, code);
    let file_uri = Uri::from_url(tower_lsp::lsp_types::Url::parse(&format!("file:///w/{file}")).unwrap());
    crate::source::ParsedData { file_uri, code: code.to_string(), ast, import_statements }
}

/// Invariant 2 (source URI uniqueness): `synchronise` never produces two
/// entries for the same file even when called repeatedly.
#[test]
fn source_uris_remain_unique_across_synchronise() {
    let (_, analyzer, _tmp) = setup_analyzer(&[("A.ral", "Contract A(id:U256){ fn f(){} }")]);
    let state = analyzer.snapshot();

    let mut seen = std::collections::HashSet::new();
    for source in state.sources() {
        assert!(seen.insert(source.file_uri().as_str().to_string()), "duplicate URI in workspace sources");
    }
}

/// Invariant 7 (diagnostic clearing): fixing a file's error must leave it
/// with no diagnostics in the new state.
#[test]
fn diagnostics_clear_once_the_error_is_fixed() {
    let (file_uri, analyzer, _tmp) = setup_analyzer(&[("A.ral", "Contract A(id:U256){ fn f(){ return X } }")]);

    let first = analyzer.snapshot();
    assert!(!analyzer.diagnostics(&first).is_empty());

    let fixed = "Contract A(id:U256){ fn f(){ return id } }";
    let (state, _) = analyzer.code_changed(file_uri, Some(fixed.to_string()));
    assert!(analyzer.diagnostics(&state).is_empty());
}
