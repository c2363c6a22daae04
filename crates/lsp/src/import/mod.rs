//! The import resolver, in two passes.
//!
//! 1. *Syntactic* ([`extract_imports`]): regex-based extraction of
//!    `import "<folder>/<file>"` statements, mirroring
//!    `foundry_compilers_core::utils::RE_SOL_IMPORT`/`capture_imports`
//!    rather than a hand-rolled character scanner — the "cheap enough,
//!    don't need a real parser" idiom for this exact extraction.
//! 2. *Type-check* ([`resolve`]): match each import against the
//!    dependency set by relative path, with or without the language's
//!    file extension.

use crate::error::ImportError;
use crate::source::SourceCodeState;
use ralph_compiler::SourceIndex;
use regex::Regex;
use std::sync::LazyLock;

/// Matches `import`, optional `//` line comments and whitespace, then a
/// quoted path literal. The language's file extension is optional on the
/// literal. Mirrors `foundry_compilers_core::utils::RE_SOL_IMPORT`, a
/// module-level `Lazy<Regex>` compiled once and reused across files.
static RE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import(?:\s*//[^\n]*\n|\s)*"([^"]+)""#).expect("RE_IMPORT is a valid regex")
});

/// A single `import "<folder>/<file>"` statement extracted from source
/// text.
#[derive(Debug, Clone)]
pub struct Import {
    pub folder: Option<String>,
    pub file: String,
    pub source_index: SourceIndex,
}

/// Syntactic pass: extract every `import` statement from `code`. Other
/// statements are ignored here but still reach the real compiler
/// unchanged.
pub fn extract_imports(file_uri: &str, code: &str) -> Vec<Import> {
    RE_IMPORT
        .captures_iter(code)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let literal = cap.get(1)?.as_str();
            let (folder, file) = split_path(literal);
            Some(Import {
                folder,
                file,
                source_index: SourceIndex::new(file_uri, whole.start(), whole.len()),
            })
        })
        .collect()
}

fn split_path(literal: &str) -> (Option<String>, String) {
    match literal.rsplit_once('/') {
        Some((folder, file)) => (Some(folder.to_string()), file.to_string()),
        None => (None, literal.to_string()),
    }
}

/// Type-check pass: for each import, find a dependency source whose
/// relative path matches `folder/file`, with or without the language's
/// extension. Returns the set of dependency sources actually referenced,
/// or an `Unknown` error for each import that matched nothing.
pub fn resolve<'a>(
    imports: &[Import],
    dependency_sources: &'a [SourceCodeState],
    extension: &str,
) -> (Vec<&'a SourceCodeState>, Vec<ImportError>) {
    let mut matched = Vec::new();
    let mut errors = Vec::new();

    for import in imports {
        let wanted = match &import.folder {
            Some(folder) => format!("{folder}/{}", import.file),
            None => import.file.clone(),
        };
        let wanted_with_ext = format!("{wanted}.{extension}");

        let found = dependency_sources.iter().find(|source| {
            let path = dependency_relative_path(source);
            path == wanted || path == wanted_with_ext || path.trim_end_matches(&format!(".{extension}")) == wanted
        });

        match found {
            Some(source) => matched.push(source),
            None => errors.push(ImportError::Unknown(wanted)),
        }
    }

    (matched, errors)
}

/// `folder/file` relative to the dependency subtree root (e.g.
/// `std/nft_interface.ral`) — the form import literals are written
/// against.
fn dependency_relative_path(source: &SourceCodeState) -> String {
    let uri = source.file_uri();
    let filename = uri.filename().unwrap_or_default();
    match uri.parent().and_then(|p| p.filename()) {
        Some(folder) => format!("{folder}/{filename}"),
        None => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_import() {
        let code = r#"import "std/nft_interface""#;
        let imports = extract_imports("A.ral", code);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].folder.as_deref(), Some("std"));
        assert_eq!(imports[0].file, "nft_interface");
    }

    #[test]
    fn extracts_import_with_interleaved_comment() {
        let code = "import // pull in the nft interface\n\"std/nft_interface\"";
        let imports = extract_imports("A.ral", code);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].file, "nft_interface");
    }

    #[test]
    fn ignores_non_import_statements() {
        let code = "fn helper() { return }\nimport \"A\"\nhelper()";
        let imports = extract_imports("A.ral", code);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].file, "A");
    }

    #[test]
    fn resolve_matches_dependency_by_folder_and_file() {
        use crate::source::ParsedData;
        use crate::uri::Uri;

        let dep_uri =
            Uri::from_url(tower_lsp::lsp_types::Url::parse("file:///deps/std/nft_interface.ral").unwrap());
        let ast = ralph_compiler::parse("nft_interface.ral", "Interface NFTInterface { fn owner() -> Address }")
            .expect("fixture parses");
        let dependency = SourceCodeState::Parsed(ParsedData {
            file_uri: dep_uri,
            code: String::new(),
            ast,
            import_statements: Vec::new(),
        });

        let imports = extract_imports("A.ral", r#"import "std/nft_interface""#);
        let (matched, errors) = resolve(&imports, std::slice::from_ref(&dependency), "ral");

        assert_eq!(matched.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn resolve_reports_unknown_import() {
        let imports = extract_imports("A.ral", r#"import "std/missing""#);
        let (matched, errors) = resolve(&imports, &[], "ral");
        assert!(matched.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
