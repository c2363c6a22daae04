//! Batch parser and type checker for the target smart-contract language.
//!
//! Spec.md treats this concern as an external, black-box dependency of the
//! presentation compiler ("parsing source text into an AST and
//! type-checking it"); it lives in its own crate here the same way
//! `forge-lsp` depends on `solar-ast`/`solar-sema` rather than embedding a
//! parser. `ralph-lsp` only ever calls [`parse`] and [`typecheck`] through
//! its own `BatchCompiler` trait (see `ralph_lsp::compiler_facade`).

pub mod ast;
pub mod index;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod typecheck;

pub use ast::{Ast, ContractDef, ContractUnit, FuncDef, InterfaceDef, Node, NodeParent, ScriptUnit};
pub use index::{CompilerMessage, MessageKind, SourceIndex};
pub use parser::{is_builtin_name, parse};
pub use scope::ScopeTable;
pub use typecheck::typecheck;

/// Convenience wrapper combining [`parse`] and [`typecheck`] into the single
/// call the workspace engine's `compile` step wants: a parsed AST plus
/// whatever diagnostics the (stand-in) type checker produced.
pub struct CompileResult {
    pub ast: Ast,
    pub messages: Vec<CompilerMessage>,
}

pub fn parse_and_check(file: &str, code: &str) -> Result<CompileResult, Vec<CompilerMessage>> {
    let ast = parse(file, code)?;
    let messages = typecheck(file, &ast);
    Ok(CompileResult { ast, messages })
}
