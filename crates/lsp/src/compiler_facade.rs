//! Component 4.B: the compiler facade. Spec.md treats the batch compiler
//! as a black box; here that box is the sibling `ralph-compiler` crate,
//! reached only through this trait so workspace-level tests can swap in a
//! fake compiler without constructing real source text — the same reason
//! `forge-lsp` keeps `solar_sema`/`foundry_compilers` behind `Analyzer`
//! methods rather than calling them inline everywhere.

use ralph_compiler::{Ast, CompilerMessage};

pub trait BatchCompiler: Send + Sync {
    fn parse(&self, file: &str, code: &str) -> Result<Ast, Vec<CompilerMessage>>;
    fn typecheck(&self, file: &str, ast: &Ast) -> Vec<CompilerMessage>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RalphBatchCompiler;

impl BatchCompiler for RalphBatchCompiler {
    fn parse(&self, file: &str, code: &str) -> Result<Ast, Vec<CompilerMessage>> {
        ralph_compiler::parse(file, code)
    }

    fn typecheck(&self, file: &str, ast: &Ast) -> Vec<CompilerMessage> {
        ralph_compiler::typecheck(file, ast)
    }
}
