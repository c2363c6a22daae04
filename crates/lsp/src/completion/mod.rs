//! Component 4.K: completion dispatch.
//!
//! Entry point [`complete`] finds the deepest AST node under the cursor;
//! only one context currently produces suggestions — inside a `FuncDef`
//! body — per spec.md §4.K ("any other context → empty").

use crate::search;
use crate::source::ParsedData;
use ralph_compiler::{Ast, ContractDef, FuncDef, Stmt};

/// The closed set of suggestion kinds spec.md §4.K names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Variable,
    Function,
    Type,
    Interface,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub label: String,
    pub detail: String,
    pub documentation: Option<String>,
    pub insert: String,
    pub kind: SuggestionKind,
}

impl Suggestion {
    fn variable(name: &str, type_name: Option<&str>) -> Self {
        let detail = type_name.map(|t| format!(": {t}")).unwrap_or_default();
        Self { label: name.to_string(), detail, documentation: None, insert: name.to_string(), kind: SuggestionKind::Variable }
    }

    fn function(func: &FuncDef) -> Self {
        let params = func.params.iter().map(|p| format!("{}: {}", p.name, p.ty.tpe.name)).collect::<Vec<_>>().join(", ");
        let ret = func.ret.as_ref().map(|r| format!(" -> {}", r.tpe.name)).unwrap_or_default();
        Self {
            label: func.name().to_string(),
            detail: format!("({params}){ret}"),
            documentation: None,
            insert: format!("{}(", func.name()),
            kind: SuggestionKind::Function,
        }
    }
}

/// `(cursorOffset, sourceCode, workspace) -> Iterator<Suggestion>`.
///
/// `all_sources` and `builtin_sources` mirror [`crate::definition::go_to_definition`]'s
/// parameters: everything else in the workspace + dependency set, and the
/// `DependencyID::BuiltIn` subtree respectively.
pub fn complete<'a>(
    cursor_offset: usize,
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    builtin_sources: &[&'a ParsedData],
) -> Vec<Suggestion> {
    let Some((contract, func)) = enclosing_func(source, cursor_offset) else { return Vec::new() };
    if !func.body.index.contains_offset(cursor_offset) {
        return Vec::new();
    }

    function_body_completer(source, all_sources, builtin_sources, contract, func, cursor_offset)
}

/// `FunctionBodyCompleter`: union of local variables visible at the
/// offset, inherited function signatures, contract members of the
/// receiver if the cursor follows a `.`, plus built-in functions.
fn function_body_completer<'a>(
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    builtin_sources: &[&'a ParsedData],
    contract: Option<&ContractDef>,
    func: &FuncDef,
    cursor_offset: usize,
) -> Vec<Suggestion> {
    if let Some(receiver_type) = receiver_before_dot(source, func, cursor_offset) {
        return all_sources
            .iter()
            .flat_map(|s| search::type_defs(s))
            .filter(|t| t.name() == receiver_type)
            .flat_map(|t| t.functions.iter())
            .map(Suggestion::function)
            .collect();
    }

    let mut suggestions = Vec::new();

    let contract_params = contract.map(|c| c.params.as_slice()).unwrap_or(&[]);
    let scope = ralph_compiler::ScopeTable::for_function(func, contract_params);
    for entry in scope.names_visible_at(cursor_offset) {
        suggestions.push(Suggestion::variable(&entry.name, None));
    }

    if contract.is_some() {
        for parent in search::collect_inheritance_in_scope(source, all_sources) {
            for f in parent.functions {
                suggestions.push(Suggestion::function(f));
            }
        }
    }

    for f in all_func_defs(builtin_sources) {
        suggestions.push(Suggestion::function(f));
    }

    suggestions
}

/// Detects the `receiver.` shape immediately before the cursor and
/// returns the receiver's inferred static type name, so members of that
/// type can be suggested. Mirrors
/// [`crate::definition::go_to_definition`]'s own best-effort, `Ident`-only
/// type inference.
fn receiver_before_dot(source: &ParsedData, func: &FuncDef, cursor_offset: usize) -> Option<String> {
    let code = &source.code;
    let before = code.get(..cursor_offset)?;
    let trimmed = before.trim_end();
    if !trimmed.ends_with('.') {
        return None;
    }
    let ident_end = trimmed.len() - 1;
    let ident_start = trimmed[..ident_end].rfind(|c: char| !c.is_alphanumeric() && c != '_').map(|i| i + 1).unwrap_or(0);
    let name = &trimmed[ident_start..ident_end];
    if name.is_empty() {
        return None;
    }

    if let Some(param) = func.params.iter().find(|p| p.name == name) {
        return Some(param.ty.tpe.name.clone());
    }
    find_let_type(&func.body.statements, name)
}

fn find_let_type(statements: &[Stmt], name: &str) -> Option<String> {
    statements.iter().find_map(|stmt| match stmt {
        Stmt::Let(var, _) if var.name == name => var.ty.as_ref().map(|t| t.tpe.name.clone()),
        _ => None,
    })
}

fn enclosing_func<'a>(source: &'a ParsedData, offset: usize) -> Option<(Option<&'a ContractDef>, &'a FuncDef)> {
    match &source.ast {
        Ast::Contract(unit) => {
            for contract in &unit.contracts {
                if let Some(func) = contract.functions.iter().find(|f| f.index.contains_offset(offset)) {
                    return Some((Some(contract), func));
                }
            }
            for interface in &unit.interfaces {
                if let Some(func) = interface.functions.iter().find(|f| f.index.contains_offset(offset)) {
                    return Some((None, func));
                }
            }
            None
        }
        Ast::Script(unit) => unit.functions.iter().find(|f| f.index.contains_offset(offset)).map(|f| (None, f)),
    }
}

fn all_func_defs<'a>(sources: &[&'a ParsedData]) -> Vec<&'a FuncDef> {
    sources.iter().flat_map(|s| s.ast.all_func_defs()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::Uri;

    fn parsed(file: &str, code: &str) -> ParsedData {
        let ast = ralph_compiler::parse(file, code).expect("parses");
        let import_statements = crate::import::extract_imports(file, code);
        let file_uri = Uri::from_url(tower_lsp::lsp_types::Url::parse(&format!("file:///w/{file}")).unwrap());
        ParsedData { file_uri, code: code.to_string(), ast, import_statements }
    }

    #[test]
    fn suggests_local_variables_and_inherited_functions() {
        let parent = parsed("P.ral", "Contract P(x:U256){ pub fn helper()->U256 { return x } }");
        let child = parsed("C.ral", "Contract C(y:U256) extends P { fn f() { let z = y return z } }");
        let all: Vec<&ParsedData> = vec![&parent, &child];

        let offset = child.code.rfind('}').unwrap() - 1;
        let suggestions = complete(offset, &child, &all, &[]);

        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert!(labels.contains(&"y"));
        assert!(labels.contains(&"z"));
        assert!(labels.contains(&"helper"));
    }

    #[test]
    fn suggests_receiver_members_after_dot() {
        let a = parsed("A.ral", "Contract A(id:U256){ pub fn f()->U256 { return id } }");
        let b = parsed("B.ral", "Contract B(a:A){ pub fn g()->U256 { return a. } }");
        let all: Vec<&ParsedData> = vec![&a, &b];

        let offset = b.code.find("a. ").unwrap() + 2;
        let suggestions = complete(offset, &b, &all, &[]);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].label, "f");
    }

    #[test]
    fn empty_outside_function_body() {
        let a = parsed("A.ral", "Contract A(id:U256){ fn f() {} }");
        let all: Vec<&ParsedData> = vec![&a];
        let offset = a.code.find("Contract").unwrap();
        assert!(complete(offset, &a, &all, &[]).is_empty());
    }
}
