//! Component 4.F: per-file source state machine.
//!
//! `SourceCodeState` models spec.md §3's tagged variant directly; the
//! transition functions below ([`initialise`], [`synchronise`], [`parse`],
//! [`compile`]) are pure functions over that enum, not methods with
//! virtual dispatch (spec §9's "tagged variants over inheritance").

use crate::compiler_facade::BatchCompiler;
use crate::error::AccessError;
use crate::file_access::FileAccess;
use crate::import::{extract_imports, Import};
use crate::uri::Uri;
use ralph_compiler::{Ast, CompilerMessage};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ParsedData {
    pub file_uri: Uri,
    pub code: String,
    pub ast: Ast,
    pub import_statements: Vec<Import>,
}

#[derive(Debug, Clone)]
pub enum SourceCodeState {
    OnDisk { file_uri: Uri },
    UnCompiled { file_uri: Uri, code: String },
    Parsed(ParsedData),
    Compiled {
        file_uri: Uri,
        code: String,
        parsed: Box<ParsedData>,
        warnings: Vec<CompilerMessage>,
        compiled_contracts: Vec<String>,
    },
    ErrorAccess { file_uri: Uri, error: String },
    ErrorSource { file_uri: Uri, code: String, errors: Vec<CompilerMessage>, previous: Option<Box<ParsedData>> },
}

impl SourceCodeState {
    pub fn file_uri(&self) -> &Uri {
        match self {
            Self::OnDisk { file_uri } => file_uri,
            Self::UnCompiled { file_uri, .. } => file_uri,
            Self::Parsed(data) => &data.file_uri,
            Self::Compiled { file_uri, .. } => file_uri,
            Self::ErrorAccess { file_uri, .. } => file_uri,
            Self::ErrorSource { file_uri, .. } => file_uri,
        }
    }

    pub fn as_parsed(&self) -> Option<&ParsedData> {
        match self {
            Self::Parsed(data) => Some(data),
            Self::Compiled { parsed, .. } => Some(parsed),
            _ => None,
        }
    }

    pub fn messages(&self) -> Vec<CompilerMessage> {
        match self {
            Self::ErrorAccess { error, file_uri } => {
                vec![CompilerMessage::error(error.clone(), ralph_compiler::SourceIndex::zero(file_uri.as_str()))]
            }
            Self::ErrorSource { errors, .. } => errors.clone(),
            Self::Compiled { warnings, .. } => warnings.clone(),
            _ => Vec::new(),
        }
    }
}

/// `initialise(dir)`: every file under `dir` starts life as `OnDisk`.
pub fn initialise(dir: &Uri, files: &dyn FileAccess) -> Result<Vec<SourceCodeState>, AccessError> {
    Ok(files.list(dir)?.into_iter().map(|file_uri| SourceCodeState::OnDisk { file_uri }).collect())
}

/// `synchronise(dir, current)`: drop entries outside `dir`, then union
/// with a fresh `initialise(dir)` using "keep existing if URI already
/// present" semantics — new files appear as `OnDisk`, existing files keep
/// whatever state they were already in (invariant 4: idempotent).
pub fn synchronise(
    dir: &Uri,
    current: Vec<SourceCodeState>,
    files: &dyn FileAccess,
) -> Result<Vec<SourceCodeState>, AccessError> {
    let mut by_uri: BTreeMap<String, SourceCodeState> = current
        .into_iter()
        .filter(|s| dir.contains(s.file_uri()))
        .map(|s| (s.file_uri().as_str().to_string(), s))
        .collect();

    for fresh in initialise(dir, files)? {
        by_uri.entry(fresh.file_uri().as_str().to_string()).or_insert(fresh);
    }

    Ok(by_uri.into_values().collect())
}

/// `parse(state)`: tail-recursive advance toward `Parsed`. Implemented as
/// a loop with an explicit state variable per spec §9, rather than actual
/// recursion, to avoid unbounded stack growth on repeated `ErrorAccess`
/// retries.
pub fn parse(mut state: SourceCodeState, files: &dyn FileAccess, compiler: &dyn BatchCompiler) -> SourceCodeState {
    loop {
        state = match state {
            SourceCodeState::OnDisk { file_uri } => match files.read(&file_uri) {
                Ok(code) => SourceCodeState::UnCompiled { file_uri, code },
                Err(err) => SourceCodeState::ErrorAccess { file_uri, error: err.to_string() },
            },
            SourceCodeState::ErrorAccess { file_uri, error } => match files.read(&file_uri) {
                Ok(code) => SourceCodeState::UnCompiled { file_uri, code },
                Err(err) => return SourceCodeState::ErrorAccess { file_uri, error: err.to_string() },
            },
            SourceCodeState::UnCompiled { file_uri, code } => {
                match compiler.parse(file_uri.as_str(), &code) {
                    Ok(ast) => {
                        let import_statements = extract_imports(file_uri.as_str(), &code);
                        return SourceCodeState::Parsed(ParsedData { file_uri, code, ast, import_statements });
                    }
                    Err(errors) => return SourceCodeState::ErrorSource { file_uri, code, errors, previous: None },
                }
            }
            // Already parsed/compiled/errored: identity, no re-parse
            // without an explicit edit event (monotonic parse, invariant 3).
            already @ (SourceCodeState::Parsed(_)
            | SourceCodeState::Compiled { .. }
            | SourceCodeState::ErrorSource { .. }) => return already,
        };
    }
}

/// `compile(parseds, options)`: run the batch compiler's type-check over
/// every `Parsed` source, distributing per-file outcomes back. Files not
/// yet `Parsed` (still `OnDisk`/`UnCompiled`/errored) pass through
/// unchanged — the caller is expected to have driven them through
/// [`parse`] first.
pub fn compile(states: Vec<SourceCodeState>, compiler: &dyn BatchCompiler) -> Vec<SourceCodeState> {
    states.into_iter().map(|state| compile_single(state, compiler)).collect()
}

/// Compiles a single already-`Parsed` source in isolation (used both by
/// [`compile`] and the dependency loader, which has no cross-file
/// distribution to do).
pub fn compile_single(state: SourceCodeState, compiler: &dyn BatchCompiler) -> SourceCodeState {
    let SourceCodeState::Parsed(data) = state else { return state };

    let messages = compiler.typecheck(data.file_uri.as_str(), &data.ast);
    let (errors, warnings): (Vec<_>, Vec<_>) = messages.into_iter().partition(CompilerMessage::is_error);

    if errors.is_empty() {
        let compiled_contracts = data.ast.all_func_defs().iter().map(|f| f.name().to_string()).collect();
        SourceCodeState::Compiled {
            file_uri: data.file_uri.clone(),
            code: data.code.clone(),
            parsed: Box::new(data),
            warnings,
            compiled_contracts,
        }
    } else {
        SourceCodeState::ErrorSource {
            file_uri: data.file_uri.clone(),
            code: data.code.clone(),
            errors,
            previous: Some(Box::new(data)),
        }
    }
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
    fn parse_walks_on_disk_to_parsed() {
        let file = uri("file:///w/contracts/A.ral");
        let files = FakeFileAccess::new([(file.clone(), "Contract A(id:U256){ fn f(){ return id } }".to_string())]);
        let compiler = RalphBatchCompiler;

        let state = parse(SourceCodeState::OnDisk { file_uri: file }, &files, &compiler);
        assert!(matches!(state, SourceCodeState::Parsed(_)));
    }

    #[test]
    fn parse_is_identity_on_already_parsed() {
        let file = uri("file:///w/contracts/A.ral");
        let files = FakeFileAccess::new([(file.clone(), "Contract A(id:U256){ fn f(){ return id } }".to_string())]);
        let compiler = RalphBatchCompiler;

        let once = parse(SourceCodeState::OnDisk { file_uri: file }, &files, &compiler);
        let twice = parse(once.clone(), &files, &compiler);
        assert_eq!(twice.file_uri(), once.file_uri());
        assert!(matches!(twice, SourceCodeState::Parsed(_)));
    }

    #[test]
    fn compile_flags_unbound_identifier_as_error_source() {
        let file = uri("file:///w/contracts/A.ral");
        let files = FakeFileAccess::new([(file.clone(), "Contract A(id:U256){ fn f(){ return X } }".to_string())]);
        let compiler = RalphBatchCompiler;

        let parsed = parse(SourceCodeState::OnDisk { file_uri: file }, &files, &compiler);
        let compiled = compile_single(parsed, &compiler);
        match compiled {
            SourceCodeState::ErrorSource { previous, .. } => assert!(previous.is_some()),
            other => panic!("expected ErrorSource, got {other:?}"),
        }
    }

    #[test]
    fn synchronise_is_idempotent() {
        let file = uri("file:///w/contracts/A.ral");
        let dir = uri("file:///w/contracts/");
        let files = FakeFileAccess::new([(file.clone(), "Contract A(id:U256){}".to_string())]);

        let once = synchronise(&dir, Vec::new(), &files).unwrap();
        let twice = synchronise(&dir, once.clone(), &files).unwrap();
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].file_uri(), twice[0].file_uri());
    }
}
