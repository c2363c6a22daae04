//! The AST produced by [`crate::parse`].
//!
//! Deliberately concrete and small: only the node kinds that the
//! presentation compiler's search/go-to-definition/completion layers need
//! to dispatch on. Parent pointers are never materialized (see spec's
//! design notes on avoiding cyclic structures) — callers that need a node's
//! ancestors collect them on the way down during a walk.

use crate::index::SourceIndex;

/// Top-level shape of a parsed file. A file is either a contract/interface
/// unit, or a "script" — a bag of top-level statements with no contract
/// wrapper. Go-to-definition's contract-call resolution only applies to the
/// `Contract` branch; scripts fall back to the empty result (spec's "AST
/// mismatch" failure mode).
#[derive(Debug, Clone)]
pub enum Ast {
    Contract(ContractUnit),
    Script(ScriptUnit),
}

impl Ast {
    pub fn as_contract_unit(&self) -> Option<&ContractUnit> {
        match self {
            Self::Contract(unit) => Some(unit),
            Self::Script(_) => None,
        }
    }

    /// All function definitions reachable from this file, regardless of
    /// shape — used by search utilities that don't care about the
    /// contract/script distinction (e.g. collecting usages).
    pub fn all_func_defs(&self) -> Vec<&FuncDef> {
        match self {
            Self::Contract(unit) => unit.contracts.iter().flat_map(|c| c.functions.iter()).collect(),
            Self::Script(unit) => unit.functions.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractUnit {
    pub contracts: Vec<ContractDef>,
    pub interfaces: Vec<InterfaceDef>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptUnit {
    pub functions: Vec<FuncDef>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ContractDef {
    pub id: TypeId,
    pub params: Vec<Param>,
    pub extends: Vec<TypeId>,
    pub implements: Vec<TypeId>,
    pub functions: Vec<FuncDef>,
    pub index: SourceIndex,
}

impl ContractDef {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn parents(&self) -> impl Iterator<Item = &TypeId> {
        self.extends.iter().chain(self.implements.iter())
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub id: TypeId,
    pub extends: Vec<TypeId>,
    pub functions: Vec<FuncDef>,
    pub index: SourceIndex,
}

impl InterfaceDef {
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct FuncDef {
    pub id: FuncId,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub visibility: Visibility,
    pub body: Block,
    /// Range of the whole definition, body included.
    pub index: SourceIndex,
    /// Range of just `(name)(params) -> ret` — what go-to-definition jumps
    /// to, per spec's "stable anchor" rule.
    pub signature_index: SourceIndex,
}

impl FuncDef {
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub index: SourceIndex,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub index: SourceIndex,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub tpe: TypeId,
    pub index: SourceIndex,
}

/// A reference to a type name, either in a declaration (`extends A`) or a
/// usage position.
#[derive(Debug, Clone)]
pub struct TypeId {
    pub name: String,
    pub index: SourceIndex,
}

/// A reference to a variable/field name.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub index: SourceIndex,
}

/// A reference to a function name, at a call site or a definition site.
#[derive(Debug, Clone)]
pub struct FuncId {
    pub name: String,
    pub index: SourceIndex,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let(VarDef, Expr),
    Return(Option<Expr>, SourceIndex),
    Expr(Expr),
}

impl Stmt {
    pub fn index(&self) -> SourceIndex {
        match self {
            Self::Let(var, _) => var.index.clone(),
            Self::Return(_, idx) => idx.clone(),
            Self::Expr(expr) => expr.index().clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub index: SourceIndex,
}

impl Default for SourceIndex {
    fn default() -> Self {
        SourceIndex::zero(String::new())
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Literal(SourceIndex),
    /// A free/local/built-in function call: `f(args)` or `builtin(args)`.
    Call(CallExpr),
    /// A call through a receiver expression: `receiver.call(args)`.
    ContractCall(ContractCallExpr),
}

impl Expr {
    pub fn index(&self) -> &SourceIndex {
        match self {
            Self::Ident(i) => &i.index,
            Self::Literal(idx) => idx,
            Self::Call(c) => &c.index,
            Self::ContractCall(c) => &c.index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub func: FuncId,
    pub args: Vec<Expr>,
    pub is_built_in: bool,
    pub index: SourceIndex,
}

#[derive(Debug, Clone)]
pub struct ContractCallExpr {
    pub receiver: Box<Expr>,
    pub call_id: FuncId,
    pub args: Vec<Expr>,
    pub index: SourceIndex,
}

/// Any node that search utilities walk. Returned by [`crate::walk::walk_down`]
/// and matched on by the presentation compiler's go-to-definition/completion
/// dispatchers.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    Contract(&'a ContractDef),
    Interface(&'a InterfaceDef),
    Func(&'a FuncDef),
    Param(&'a Param),
    Var(&'a VarDef),
    Type(&'a TypeId),
    Ident(&'a Ident),
    FuncId(&'a FuncId, NodeParent<'a>),
    Call(&'a CallExpr),
    ContractCall(&'a ContractCallExpr),
    Stmt(&'a Stmt),
    Block(&'a Block),
}

/// The immediate parent of a [`Node::FuncId`], since go-to-definition's
/// dispatch on a function-id node depends entirely on what contains it.
#[derive(Debug, Clone, Copy)]
pub enum NodeParent<'a> {
    Call(&'a CallExpr),
    ContractCall(&'a ContractCallExpr),
    FuncDef(&'a FuncDef),
    None,
}

impl Node<'_> {
    pub fn index(&self) -> SourceIndex {
        match self {
            Node::Contract(c) => c.index.clone(),
            Node::Interface(i) => i.index.clone(),
            Node::Func(f) => f.index.clone(),
            Node::Param(p) => p.index.clone(),
            Node::Var(v) => v.index.clone(),
            Node::Type(t) => t.index.clone(),
            Node::Ident(i) => i.index.clone(),
            Node::FuncId(f, _) => f.index.clone(),
            Node::Call(c) => c.index.clone(),
            Node::ContractCall(c) => c.index.clone(),
            Node::Stmt(s) => s.index(),
            Node::Block(b) => b.index.clone(),
        }
    }
}
