//! A minimal type checker: enough to produce the diagnostics the
//! presentation compiler needs to exercise (unbound identifiers), without
//! attempting anything like the real target language's type system. Real
//! type checking is the batch compiler's own black-box job; this stands in
//! for it so the rest of the pipeline has something concrete to drive.

use crate::ast::{Ast, Expr, FuncDef, Stmt};
use crate::index::CompilerMessage;
use crate::parser::is_builtin_name;
use crate::scope::ScopeTable;

pub fn typecheck(file: &str, ast: &Ast) -> Vec<CompilerMessage> {
    let mut messages = Vec::new();
    match ast {
        Ast::Contract(unit) => {
            for contract in &unit.contracts {
                let known_types: Vec<&str> = Vec::new();
                let _ = known_types;
                for func in &contract.functions {
                    let scope = ScopeTable::for_function(func, &contract.params);
                    check_func(file, func, &scope, &mut messages);
                }
            }
            for interface in &unit.interfaces {
                for func in &interface.functions {
                    let scope = ScopeTable::for_function(func, &[]);
                    check_func(file, func, &scope, &mut messages);
                }
            }
        }
        Ast::Script(unit) => {
            for func in &unit.functions {
                let scope = ScopeTable::for_function(func, &[]);
                check_func(file, func, &scope, &mut messages);
            }
        }
    }
    messages
}

fn check_func(_file: &str, func: &FuncDef, scope: &ScopeTable, out: &mut Vec<CompilerMessage>) {
    for stmt in &func.body.statements {
        check_stmt(stmt, scope, out);
    }
}

fn check_stmt(stmt: &Stmt, scope: &ScopeTable, out: &mut Vec<CompilerMessage>) {
    match stmt {
        Stmt::Return(Some(expr), _) => check_expr(expr, scope, out),
        Stmt::Return(None, _) => {}
        Stmt::Let(_, value) => check_expr(value, scope, out),
        Stmt::Expr(expr) => check_expr(expr, scope, out),
    }
}

fn check_expr(expr: &Expr, scope: &ScopeTable, out: &mut Vec<CompilerMessage>) {
    match expr {
        Expr::Ident(ident) => {
            if scope.lookup(&ident.name, ident.index.offset).is_none() {
                out.push(CompilerMessage::error(format!("unbound identifier `{}`", ident.name), ident.index.clone()));
            }
        }
        Expr::Literal(_) => {}
        Expr::Call(call) => {
            if !call.is_built_in && !is_builtin_name(&call.func.name) {
                // Free-function calls are resolved against the inheritance
                // graph by the presentation compiler's go-to-definition
                // pass, not here; the batch compiler's real type checker
                // would verify arity/types, which is out of scope for this
                // stand-in.
            }
            for arg in &call.args {
                check_expr(arg, scope, out);
            }
        }
        Expr::ContractCall(call) => {
            check_expr(&call.receiver, scope, out);
            for arg in &call.args {
                check_expr(arg, scope, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn flags_unbound_identifier() {
        let code = "Contract A(id:U256){ pub fn f()->U256 { return X } }";
        let ast = parse("A.ral", code).unwrap();
        let messages = typecheck("A.ral", &ast);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains('X'));
    }

    #[test]
    fn accepts_bound_identifier() {
        let code = "Contract A(id:U256){ pub fn f()->U256 { return id } }";
        let ast = parse("A.ral", code).unwrap();
        let messages = typecheck("A.ral", &ast);
        assert!(messages.is_empty());
    }
}
