//! Component 4.J: go-to-definition.
//!
//! Entry point [`go_to_definition`] finds the deepest AST node under the
//! cursor (via [`crate::search::find_last`]) and dispatches on its kind.
//! Results are `funcSignature`-coalesced per spec: a matched `FuncDef`
//! contributes its header range, not its whole body, so the editor jumps
//! to a stable anchor.

use crate::location::SourceLocation;
use crate::search::{self, TypeDef};
use crate::source::ParsedData;
use ralph_compiler::{Ast, ContractDef, Expr, FuncDef, Node, NodeParent, Param, Stmt};

/// `(cursorOffset, sourceCode, workspace) -> Iterator<SourceLocation>`.
///
/// `builtin_sources` is the `DependencyID::BuiltIn` subtree — searched only
/// for calls the compiler already flagged `isBuiltIn`; `all_sources` is
/// every other workspace + `std` source (component I's `collectParsed`).
pub fn go_to_definition<'a>(
    cursor_offset: usize,
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    builtin_sources: &[&'a ParsedData],
) -> Vec<SourceLocation<'a>> {
    let Some(node) = search::find_last(source, cursor_offset) else { return Vec::new() };

    match node {
        Node::Ident(ident) => resolve_ident(source, all_sources, &ident.name, ident.index.offset),
        Node::FuncId(func_id, parent) => resolve_func_id(source, all_sources, builtin_sources, func_id, parent),
        Node::Type(type_id) => resolve_type_id(all_sources, &type_id.name),
        _ => Vec::new(),
    }
}

/// `Ident` dispatch: local scope table first (which already covers the
/// enclosing contract's own constructor params), then the inherited
/// parents' constructor params — a subcontract can reference an abstract
/// parent's fields by bare name.
fn resolve_ident<'a>(
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    name: &str,
    offset: usize,
) -> Vec<SourceLocation<'a>> {
    let Some((contract, func)) = enclosing_func(source, offset) else { return Vec::new() };

    let contract_params: &[Param] = contract.map(|c| c.params.as_slice()).unwrap_or(&[]);
    let scope = ralph_compiler::ScopeTable::for_function(func, contract_params);
    if let Some(index) = scope.lookup(name, offset) {
        return vec![SourceLocation::new(source, index.clone())];
    }

    if contract.is_none() {
        return Vec::new();
    }

    search::collect_inheritance_in_scope(source, all_sources)
        .into_iter()
        .filter(TypeDef::is_contract)
        .filter_map(|parent| {
            let idx = parent.params().iter().find(|p| p.name == name)?.index.clone();
            let parent_source = *all_sources.iter().find(|s| type_defs_contain(s, parent.name()))?;
            Some(SourceLocation::new(parent_source, idx))
        })
        .collect()
}

/// `FuncId` dispatch: behavior depends entirely on the immediate parent
/// node.
fn resolve_func_id<'a>(
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    builtin_sources: &[&'a ParsedData],
    func_id: &ralph_compiler::FuncId,
    parent: NodeParent<'_>,
) -> Vec<SourceLocation<'a>> {
    match parent {
        NodeParent::Call(call) if call.func.name == func_id.name => {
            if call.is_built_in {
                builtin_sources
                    .iter()
                    .flat_map(|s| all_func_defs(s).into_iter().map(move |f| (*s, f)))
                    .filter(|(_, f)| f.name() == func_id.name)
                    .map(|(s, f)| SourceLocation::new(s, f.signature_index.clone()))
                    .collect()
            } else {
                let mut locations: Vec<SourceLocation<'a>> = all_func_defs(source)
                    .into_iter()
                    .filter(|f| f.name() == func_id.name)
                    .map(|f| SourceLocation::new(source, f.signature_index.clone()))
                    .collect();
                locations.extend(
                    search::collect_inheritance_in_scope(source, all_sources)
                        .into_iter()
                        .filter_map(|t| {
                            let parent_source = *all_sources.iter().find(|s| type_defs_contain(s, t.name()))?;
                            Some((parent_source, t))
                        })
                        .flat_map(|(parent_source, t)| t.functions.iter().map(move |f| (parent_source, f)))
                        .filter(|(_, f)| f.name() == func_id.name)
                        .map(|(parent_source, f)| SourceLocation::new(parent_source, f.signature_index.clone())),
                );
                locations
            }
        }
        NodeParent::FuncDef(func_def) if func_def.name() == func_id.name => find_usages(source, all_sources, func_def),
        NodeParent::ContractCall(call) if call.call_id.name == func_id.name => {
            resolve_contract_call(source, all_sources, call)
        }
        _ => Vec::new(),
    }
}

/// `FuncDef` parent: the cursor is on the *definition*'s name, so this is
/// "find usages" rather than "go to definition" — scan every type that
/// transitively depends on `source`'s type for call sites referencing it.
fn find_usages<'a>(source: &'a ParsedData, all_sources: &[&'a ParsedData], func_def: &FuncDef) -> Vec<SourceLocation<'a>> {
    let children = search::collect_implementing_children(source, all_sources);
    let mut out = Vec::new();
    for child_type in &children {
        let Some(child_source) = all_sources.iter().find(|s| type_defs_contain(s, child_type.name())) else { continue };
        for node in search::walk_down(child_source) {
            match node {
                Node::Call(call) if call.func.name == func_def.name() => {
                    out.push(SourceLocation::new(child_source, call.index.clone()));
                }
                Node::ContractCall(call) if call.call_id.name == func_def.name() => {
                    out.push(SourceLocation::new(child_source, call.index.clone()));
                }
                _ => {}
            }
        }
    }
    out
}

fn type_defs_contain(source: &ParsedData, name: &str) -> bool {
    search::type_defs(source).iter().any(|t| t.name() == name)
}

/// `ContractCallExpr` parent: resolve the receiver's static type, then
/// search every workspace source whose type name matches (plus its
/// inherited parents) for a function named `call.call_id`.
fn resolve_contract_call<'a>(
    source: &'a ParsedData,
    all_sources: &[&'a ParsedData],
    call: &ralph_compiler::ContractCallExpr,
) -> Vec<SourceLocation<'a>> {
    let Some(type_name) = infer_receiver_type(source, &call.receiver) else {
        // Type inference absent on receiver: log a diagnostic hint, return
        // empty (spec's documented failure mode).
        tracing::debug!(
            file = %source.file_uri,
            "go-to-definition: could not infer receiver type for contract call `{}`",
            call.call_id.name
        );
        return Vec::new();
    };

    let mut matches: Vec<&'a ParsedData> =
        all_sources.iter().copied().filter(|s| type_defs_contain(s, &type_name)).collect();

    // Include the inherited parents of every matching type too, so a call
    // through an interface-typed receiver resolves to a default/parent
    // implementation.
    for matching in matches.clone() {
        for parent in search::collect_inheritance_in_scope(matching, all_sources) {
            if let Some(parent_source) = all_sources.iter().find(|s| type_defs_contain(s, parent.name())) {
                matches.push(parent_source);
            }
        }
    }
    matches.dedup_by_key(|s| s.file_uri.as_str().to_string());

    matches
        .into_iter()
        .flat_map(|s| all_func_defs(s).into_iter().map(move |f| (s, f)))
        .filter(|(_, f)| f.name() == call.call_id.name)
        .map(|(s, f)| SourceLocation::new(s, f.signature_index.clone()))
        .collect()
}

/// Best-effort static type inference for a receiver expression: only
/// handles the `Ident` shape (a contract field, param, or local `let`
/// declared with an explicit type) — the one case the rest of this
/// pipeline can resolve without a real type checker.
fn infer_receiver_type(source: &ParsedData, receiver: &Expr) -> Option<String> {
    let Expr::Ident(ident) = receiver else { return None };
    let (contract, func) = enclosing_func(source, ident.index.offset)?;

    if let Some(contract) = contract {
        if let Some(param) = contract.params.iter().find(|p| p.name == ident.name) {
            return Some(param.ty.tpe.name.clone());
        }
    }
    if let Some(param) = func.params.iter().find(|p| p.name == ident.name) {
        return Some(param.ty.tpe.name.clone());
    }
    find_let_type(&func.body.statements, &ident.name)
}

fn find_let_type(statements: &[Stmt], name: &str) -> Option<String> {
    statements.iter().find_map(|stmt| match stmt {
        Stmt::Let(var, _) if var.name == name => var.ty.as_ref().map(|t| t.tpe.name.clone()),
        _ => None,
    })
}

/// `TypeId` dispatch: resolve to the contract/interface definition by
/// name across workspace + dependencies.
fn resolve_type_id<'a>(all_sources: &[&'a ParsedData], name: &str) -> Vec<SourceLocation<'a>> {
    all_sources
        .iter()
        .flat_map(|source| search::type_defs(source).into_iter().map(move |t| (*source, t)))
        .filter(|(_, t)| t.name() == name)
        .map(|(source, t)| SourceLocation::new(source, t.id.index.clone()))
        .collect()
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

fn all_func_defs(source: &ParsedData) -> Vec<&FuncDef> {
    source.ast.all_func_defs()
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
    fn resolves_contract_call_through_receiver_field_type() {
        let a = parsed("A.ral", "Contract A(id:U256){ pub fn f()->U256 { return id } }");
        let b = parsed("B.ral", "Contract B(a:A){ pub fn g()->U256 { return a.f() } }");
        let all: Vec<&ParsedData> = vec![&a, &b];

        let offset = b.code.find("f()").unwrap();
        let results = go_to_definition(offset, &b, &all, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.file_uri.as_str(), a.file_uri.as_str());
    }

    #[test]
    fn resolves_local_variable_to_its_binding() {
        let a = parsed("A.ral", "Contract A(id:U256){ fn f() { let x = id return x } }");
        let all: Vec<&ParsedData> = vec![&a];
        let offset = a.code.rfind("x").unwrap();
        let results = go_to_definition(offset, &a, &all, &[]);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn resolves_builtin_call_against_builtin_tree() {
        let builtin = parsed(
            "builtin.ral",
            "Interface BuiltIn { fn assert(condition:Bool) -> Unit }",
        );
        let a = parsed("A.ral", "Contract A(id:U256){ fn f() { assert(id) } }");
        let all: Vec<&ParsedData> = vec![&a];
        let builtins: Vec<&ParsedData> = vec![&builtin];

        let offset = a.code.find("assert(").unwrap();
        let results = go_to_definition(offset, &a, &all, &builtins);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn resolves_type_id_to_contract_definition() {
        let a = parsed("A.ral", "Contract A(id:U256){ fn f() {} }");
        let b = parsed("B.ral", "Contract B(a:A) extends A { fn g() {} }");
        let all: Vec<&ParsedData> = vec![&a, &b];

        let offset = b.code.find("extends A").unwrap() + "extends ".len();
        let results = go_to_definition(offset, &b, &all, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.file_uri.as_str(), a.file_uri.as_str());
    }
}
