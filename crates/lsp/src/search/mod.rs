//! Component 4.I: search/AST utilities. All operate against the AST
//! `ralph-compiler` hands back by reference — never mutated, no parent
//! pointers materialized (spec §9). Ancestor context is threaded through
//! the walk stack instead, via [`NodeParent`](ralph_compiler::NodeParent).

use crate::source::ParsedData;
use ralph_compiler::{ContractDef, Expr, FuncDef, InterfaceDef, Node, NodeParent, Param, Stmt, TypeId};
use std::collections::HashSet;

/// A uniform view over `ContractDef`/`InterfaceDef` — the two "type with
/// parents" shapes the inheritance walk needs to treat identically.
#[derive(Debug, Clone, Copy)]
pub struct TypeDef<'a> {
    pub id: &'a TypeId,
    pub functions: &'a [FuncDef],
    is_contract: bool,
    contract: Option<&'a ContractDef>,
    interface: Option<&'a InterfaceDef>,
}

impl<'a> TypeDef<'a> {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn parents(&self) -> Vec<&'a TypeId> {
        match (self.contract, self.interface) {
            (Some(c), _) => c.parents().collect(),
            (_, Some(i)) => i.extends.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_contract(&self) -> bool {
        self.is_contract
    }

    /// Constructor-style params, empty for interfaces.
    pub fn params(&self) -> &'a [Param] {
        self.contract.map(|c| c.params.as_slice()).unwrap_or(&[])
    }
}

/// Every `Contract`/`Interface` definition in a single parsed file.
pub fn type_defs(source: &ParsedData) -> Vec<TypeDef<'_>> {
    let Some(unit) = source.ast.as_contract_unit() else { return Vec::new() };
    let mut out = Vec::new();
    for c in &unit.contracts {
        out.push(TypeDef { id: &c.id, functions: &c.functions, is_contract: true, contract: Some(c), interface: None });
    }
    for i in &unit.interfaces {
        out.push(TypeDef { id: &i.id, functions: &i.functions, is_contract: false, contract: None, interface: Some(i) });
    }
    out
}

/// Pre-order walk over every node in `source`'s AST. Used both by
/// [`find_last`] and by completion's context dispatch.
pub fn walk_down(source: &ParsedData) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for type_def in type_defs(source) {
        if let Some(contract) = type_def.contract {
            out.push(Node::Contract(contract));
            for param in &contract.params {
                out.push(Node::Param(param));
            }
            for parent in contract.parents() {
                out.push(Node::Type(parent));
            }
            for func in &contract.functions {
                walk_func(func, &mut out);
            }
        }
        if let Some(interface) = type_def.interface {
            out.push(Node::Interface(interface));
            for parent in &interface.extends {
                out.push(Node::Type(parent));
            }
            for func in &interface.functions {
                walk_func(func, &mut out);
            }
        }
    }
    if let ralph_compiler::Ast::Script(script) = &source.ast {
        for func in &script.functions {
            walk_func(func, &mut out);
        }
        for stmt in &script.statements {
            walk_stmt(stmt, &mut out);
        }
    }
    out
}

fn walk_func<'a>(func: &'a FuncDef, out: &mut Vec<Node<'a>>) {
    out.push(Node::Func(func));
    out.push(Node::FuncId(&func.id, NodeParent::FuncDef(func)));
    for param in &func.params {
        out.push(Node::Param(param));
    }
    out.push(Node::Block(&func.body));
    for stmt in &func.body.statements {
        walk_stmt(stmt, out);
    }
}

fn walk_stmt<'a>(stmt: &'a Stmt, out: &mut Vec<Node<'a>>) {
    out.push(Node::Stmt(stmt));
    match stmt {
        Stmt::Let(var, value) => {
            out.push(Node::Var(var));
            walk_expr(value, out, NodeParent::None);
        }
        Stmt::Return(Some(expr), _) => walk_expr(expr, out, NodeParent::None),
        Stmt::Return(None, _) => {}
        Stmt::Expr(expr) => walk_expr(expr, out, NodeParent::None),
    }
}

fn walk_expr<'a>(expr: &'a Expr, out: &mut Vec<Node<'a>>, parent: NodeParent<'a>) {
    let _ = parent;
    match expr {
        Expr::Ident(ident) => out.push(Node::Ident(ident)),
        Expr::Literal(_) => {}
        Expr::Call(call) => {
            out.push(Node::Call(call));
            out.push(Node::FuncId(&call.func, NodeParent::Call(call)));
            for arg in &call.args {
                walk_expr(arg, out, NodeParent::Call(call));
            }
        }
        Expr::ContractCall(call) => {
            out.push(Node::ContractCall(call));
            walk_expr(&call.receiver, out, NodeParent::ContractCall(call));
            out.push(Node::FuncId(&call.call_id, NodeParent::ContractCall(call)));
            for arg in &call.args {
                walk_expr(arg, out, NodeParent::ContractCall(call));
            }
        }
    }
}

/// `findLast(root, predicate)`: the deepest node whose `sourceIndex`
/// contains `offset`. Implemented as "last node in pre-order DFS whose
/// range contains the offset, tie-broken by narrowest range" — in a
/// well-formed tree a child's range is always a subset of its parent's,
/// so the narrowest containing range is always the most deeply nested
/// one regardless of traversal order.
pub fn find_last(source: &ParsedData, offset: usize) -> Option<Node<'_>> {
    walk_down(source)
        .into_iter()
        .filter(|node| node.index().contains_offset(offset))
        .min_by_key(|node| node.index().width)
}

/// Transitive `extends`/`implements` closure starting from `source`'s own
/// type(s), excluding `source` itself. A worklist with a visited-set of
/// type names makes this safe against cycles and duplicate parents
/// (invariant 6, E6).
pub fn collect_inheritance_in_scope<'a>(
    source: &'a ParsedData,
    all_sources: &'a [&'a ParsedData],
) -> Vec<TypeDef<'a>> {
    let mut visited: HashSet<String> = HashSet::new();
    for type_def in type_defs(source) {
        visited.insert(type_def.name().to_string());
    }

    let mut worklist: Vec<String> =
        type_defs(source).iter().flat_map(|t| t.parents()).map(|p| p.name.clone()).collect();
    let mut result = Vec::new();

    while let Some(name) = worklist.pop() {
        if visited.contains(&name) {
            continue;
        }
        visited.insert(name.clone());

        if let Some(found) = find_type_def(&name, all_sources) {
            for parent in found.parents() {
                if !visited.contains(&parent.name) {
                    worklist.push(parent.name.clone());
                }
            }
            result.push(found);
        }
    }

    result
}

fn find_type_def<'a>(name: &str, all_sources: &'a [&'a ParsedData]) -> Option<TypeDef<'a>> {
    all_sources.iter().find_map(|source| type_defs(source).into_iter().find(|t| t.name() == name))
}

/// Reverse of [`collect_inheritance_in_scope`]: every type across the
/// workspace whose transitive `extends`/`implements` closure includes
/// `source`.
pub fn collect_implementing_children<'a>(
    source: &'a ParsedData,
    all_sources: &'a [&'a ParsedData],
) -> Vec<TypeDef<'a>> {
    let own_names: HashSet<String> = type_defs(source).iter().map(|t| t.name().to_string()).collect();

    all_sources
        .iter()
        .flat_map(|candidate| type_defs(candidate))
        .filter(|candidate_type| type_defs_extends_any(*candidate_type, all_sources, &own_names))
        .collect()
}

fn type_defs_extends_any(candidate: TypeDef<'_>, all_sources: &[&ParsedData], own_names: &HashSet<String>) -> bool {
    let mut visited = HashSet::new();
    let mut worklist: Vec<String> = candidate.parents().iter().map(|p| p.name.clone()).collect();
    while let Some(name) = worklist.pop() {
        if own_names.contains(&name) {
            return true;
        }
        if !visited.insert(name.clone()) {
            continue;
        }
        if let Some(found) = find_type_def(&name, all_sources) {
            worklist.extend(found.parents().iter().map(|p| p.name.clone()));
        }
    }
    false
}

/// `collectParsed(workspace)`: every parsed source — workspace sources
/// plus dependency sources — as a flat slice, the input every other
/// search utility above takes.
pub fn collect_parsed<'a>(
    workspace_sources: impl Iterator<Item = &'a ParsedData>,
    dependency_sources: impl Iterator<Item = &'a ParsedData>,
) -> Vec<&'a ParsedData> {
    workspace_sources.chain(dependency_sources).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ParsedData;
    use crate::uri::Uri;

    fn parsed(file: &str, code: &str) -> ParsedData {
        let ast = ralph_compiler::parse(file, code).expect("parses");
        let import_statements = crate::import::extract_imports(file, code);
        let file_uri = Uri::from_url(tower_lsp::lsp_types::Url::parse(&format!("file:///w/{file}")).unwrap());
        ParsedData { file_uri, code: code.to_string(), ast, import_statements }
    }

    #[test]
    fn find_last_returns_deepest_containing_node() {
        let source = parsed("A.ral", "Contract A(id:U256){ fn f()->U256 { return id } }");
        let offset = source.code.find("id }").unwrap();
        let node = find_last(&source, offset).expect("some node contains offset");
        assert!(matches!(node, Node::Ident(_)));
    }

    #[test]
    fn inheritance_closure_handles_diamond_and_cycles() {
        let child = parsed("Child.ral", "Contract Child(x:U256) extends P2 { fn f() {} }");
        let p2 = parsed("P2.ral", "Contract P2(x:U256) extends P4, P6 { fn f() {} }");
        let p4 = parsed("P4.ral", "Contract P4(x:U256) extends P5, P6, P4 { fn f() {} }");
        let p5 = parsed("P5.ral", "Contract P5(x:U256) extends P4 { fn f() {} }");
        let p6 = parsed("P6.ral", "Contract P6(x:U256) { fn f() {} }");

        let all: Vec<&ParsedData> = vec![&child, &p2, &p4, &p5, &p6];
        let closure = collect_inheritance_in_scope(&child, &all);

        let names: std::collections::HashSet<&str> = closure.iter().map(|t| t.name()).collect();
        assert_eq!(names, std::collections::HashSet::from(["P2", "P4", "P5", "P6"]));
        assert_eq!(closure.len(), names.len(), "no duplicate parents");
    }

    #[test]
    fn implementing_children_finds_transitive_descendants() {
        let base = parsed("Base.ral", "Interface Base { fn f() }");
        let mid = parsed("Mid.ral", "Contract Mid(x:U256) implements Base { fn f() {} }");
        let leaf = parsed("Leaf.ral", "Contract Leaf(x:U256) extends Mid { fn f() {} }");

        let all: Vec<&ParsedData> = vec![&base, &mid, &leaf];
        let children = collect_implementing_children(&base, &all);
        let names: std::collections::HashSet<&str> = children.iter().map(|t| t.name()).collect();
        assert_eq!(names, std::collections::HashSet::from(["Mid", "Leaf"]));
    }
}
