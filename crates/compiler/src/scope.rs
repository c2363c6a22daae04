//! Per-function scope tables: a name-to-defining-node index ordered by
//! source offset, used both by the type checker (unbound identifier
//! checks) and, via [`crate::ast::Node`], by the presentation compiler's
//! go-to-definition for local variables.

use crate::ast::{Block, FuncDef, Param, Stmt};
use crate::index::SourceIndex;

#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub name: String,
    pub index: SourceIndex,
    /// Byte offset after which this binding is visible (its own
    /// declaration's end), so "nearest enclosing" lookups never resolve a
    /// use to a `let` that appears later in the same block.
    pub visible_from: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    /// Ordered by `visible_from`, ascending.
    entries: Vec<ScopeEntry>,
}

impl ScopeTable {
    /// Builds the scope visible inside `func`: its parameters (visible from
    /// the start of the body) plus every `let` binding in the body,
    /// visible from just after its own declaration.
    pub fn for_function(func: &FuncDef, contract_params: &[Param]) -> Self {
        let mut entries = Vec::new();
        let body_start = func.body.index.offset;

        for param in contract_params.iter().chain(func.params.iter()) {
            entries.push(ScopeEntry { name: param.name.clone(), index: param.index.clone(), visible_from: body_start });
        }

        collect_block(&func.body, &mut entries);
        entries.sort_by_key(|e| e.visible_from);
        Self { entries }
    }

    /// Nearest enclosing binding for `name` visible at `offset`: the last
    /// (highest `visible_from`) entry that is still `<= offset`.
    pub fn lookup(&self, name: &str, offset: usize) -> Option<&SourceIndex> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name && e.visible_from <= offset)
            .map(|e| &e.index)
    }

    pub fn names_visible_at(&self, offset: usize) -> Vec<&ScopeEntry> {
        self.entries.iter().filter(|e| e.visible_from <= offset).collect()
    }
}

fn collect_block(block: &Block, out: &mut Vec<ScopeEntry>) {
    for stmt in &block.statements {
        if let Stmt::Let(var, value) = stmt {
            out.push(ScopeEntry { name: var.name.clone(), index: var.index.clone(), visible_from: var.index.end() });
            collect_expr(value, out);
        }
    }
}

fn collect_expr(_expr: &crate::ast::Expr, _out: &mut [ScopeEntry]) {
    // Nested function-literal scoping isn't part of this language; nothing
    // to recurse into beyond statement-level `let`s.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn resolves_contract_param_and_local_let() {
        let code = "Contract A(id:U256){ fn f() { let x = id return x } }";
        let ast = parse("A.ral", code).unwrap();
        let contract = &ast.as_contract_unit().unwrap().contracts[0];
        let func = &contract.functions[0];
        let scope = ScopeTable::for_function(func, &contract.params);

        let return_offset = func.body.index.end() - 2;
        assert!(scope.lookup("id", return_offset).is_some());
        assert!(scope.lookup("x", return_offset).is_some());
        assert!(scope.lookup("nonexistent", return_offset).is_none());
    }
}
