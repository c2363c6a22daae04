//! Recursive-descent parser. Produces an [`Ast`] or a non-empty list of
//! [`CompilerMessage`]s describing why it couldn't.

use crate::ast::*;
use crate::index::{CompilerMessage, SourceIndex};
use crate::lexer::{lex, Token, TokenKind};

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<CompilerMessage>,
}

pub fn parse(file: &str, code: &str) -> Result<Ast, Vec<CompilerMessage>> {
    let tokens = lex(code);
    let mut parser = Parser { file, tokens, pos: 0, errors: Vec::new() };
    let ast = parser.parse_source_unit();
    if parser.errors.is_empty() {
        Ok(ast)
    } else {
        Err(parser.errors)
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn at_punct(&self, c: char) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) {
        if !self.eat_punct(c) {
            let tok = self.peek().clone();
            self.error(format!("expected '{c}'"), tok.offset, tok.width.max(1));
        }
    }

    fn error(&mut self, message: impl Into<String>, offset: usize, width: usize) {
        self.errors.push(CompilerMessage::error(message, SourceIndex::new(self.file, offset, width)));
    }

    fn idx(&self, offset: usize, width: usize) -> SourceIndex {
        SourceIndex::new(self.file, offset, width)
    }

    fn parse_source_unit(&mut self) -> Ast {
        // Look ahead: a file is a `Contract`/`Interface` unit if its first
        // real item is one of those keywords; otherwise it's a script.
        if self.peek().is_keyword("Contract") || self.peek().is_keyword("Interface") {
            let mut unit = ContractUnit::default();
            while !self.at_eof() {
                if self.peek().is_keyword("Contract") {
                    unit.contracts.push(self.parse_contract());
                } else if self.peek().is_keyword("Interface") {
                    unit.interfaces.push(self.parse_interface());
                } else {
                    let tok = self.advance();
                    self.error("expected 'Contract' or 'Interface'", tok.offset, tok.width.max(1));
                }
            }
            Ast::Contract(unit)
        } else {
            let mut unit = ScriptUnit::default();
            while !self.at_eof() {
                if self.peek().is_keyword("fn") || self.peek().is_keyword("pub") {
                    unit.functions.push(self.parse_func_def());
                } else {
                    unit.statements.push(self.parse_stmt());
                }
            }
            Ast::Script(unit)
        }
    }

    fn parse_ident_token(&mut self) -> (String, SourceIndex) {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(name) => (name, self.idx(tok.offset, tok.width)),
            _ => {
                self.error("expected identifier", tok.offset, tok.width.max(1));
                (String::new(), self.idx(tok.offset, tok.width.max(1)))
            }
        }
    }

    fn parse_type_id(&mut self) -> TypeId {
        let (name, index) = self.parse_ident_token();
        TypeId { name, index }
    }

    fn parse_type_expr(&mut self) -> TypeExpr {
        let tpe = self.parse_type_id();
        TypeExpr { index: tpe.index.clone(), tpe }
    }

    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        self.expect_punct('(');
        while !self.at_punct(')') && !self.at_eof() {
            let (name, index) = self.parse_ident_token();
            self.expect_punct(':');
            let ty = self.parse_type_expr();
            params.push(Param { name, ty, index });
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct(')');
        params
    }

    fn parse_type_list(&mut self) -> Vec<TypeId> {
        let mut list = vec![self.parse_type_id()];
        while self.eat_punct(',') {
            list.push(self.parse_type_id());
        }
        list
    }

    fn parse_contract(&mut self) -> ContractDef {
        let start = self.advance(); // `Contract`
        let id = self.parse_type_id();
        let params = self.parse_params();

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        if self.peek().is_keyword("extends") {
            self.advance();
            extends = self.parse_type_list();
        }
        if self.peek().is_keyword("implements") {
            self.advance();
            implements = self.parse_type_list();
        }

        self.expect_punct('{');
        let mut functions = Vec::new();
        while !self.at_punct('}') && !self.at_eof() {
            functions.push(self.parse_func_def());
        }
        let end_tok = self.advance(); // `}`

        let index = self.span(start.offset, end_tok.offset + end_tok.width.max(1));
        ContractDef { id, params, extends, implements, functions, index }
    }

    fn parse_interface(&mut self) -> InterfaceDef {
        let start = self.advance(); // `Interface`
        let id = self.parse_type_id();
        let mut extends = Vec::new();
        if self.peek().is_keyword("extends") {
            self.advance();
            extends = self.parse_type_list();
        }
        self.expect_punct('{');
        let mut functions = Vec::new();
        while !self.at_punct('}') && !self.at_eof() {
            functions.push(self.parse_func_def());
        }
        let end_tok = self.advance();
        let index = self.span(start.offset, end_tok.offset + end_tok.width.max(1));
        InterfaceDef { id, extends, functions, index }
    }

    fn span(&self, start: usize, end: usize) -> SourceIndex {
        self.idx(start, end.saturating_sub(start))
    }

    fn parse_func_def(&mut self) -> FuncDef {
        let start_tok = self.peek().clone();
        let visibility = if self.peek().is_keyword("pub") {
            self.advance();
            Visibility::Public
        } else {
            Visibility::Private
        };

        if self.peek().is_keyword("fn") {
            self.advance();
        } else {
            let tok = self.peek().clone();
            self.error("expected 'fn'", tok.offset, tok.width.max(1));
        }

        let (name, name_index) = self.parse_ident_token();
        let params = self.parse_params();
        let ret = if matches!(self.peek().kind, TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_expr())
        } else {
            None
        };
        let sig_end = ret.as_ref().map(|r| r.index.end()).unwrap_or_else(|| {
            params.last().map(|p| p.ty.index.end()).unwrap_or(name_index.end())
        });
        let signature_index = self.span(start_tok.offset, sig_end);

        let body = self.parse_block();
        let index = self.span(start_tok.offset, body.index.end());

        FuncDef {
            id: FuncId { name, index: name_index },
            params,
            ret,
            visibility,
            body,
            index,
            signature_index,
        }
    }

    fn parse_block(&mut self) -> Block {
        let start_tok = self.peek().clone();
        self.expect_punct('{');
        let mut statements = Vec::new();
        while !self.at_punct('}') && !self.at_eof() {
            statements.push(self.parse_stmt());
        }
        let end_tok = self.advance();
        Block { statements, index: self.span(start_tok.offset, end_tok.offset + end_tok.width.max(1)) }
    }

    fn parse_stmt(&mut self) -> Stmt {
        if self.peek().is_keyword("return") {
            let tok = self.advance();
            let expr = if self.at_punct(';') || self.at_punct('}') { None } else { Some(self.parse_expr()) };
            self.eat_punct(';');
            let end = expr.as_ref().map(|e| e.index().end()).unwrap_or(tok.offset + tok.width);
            return Stmt::Return(expr, self.span(tok.offset, end));
        }
        if self.peek().is_keyword("let") {
            self.advance();
            let (name, index) = self.parse_ident_token();
            let ty = if self.eat_punct(':') { Some(self.parse_type_expr()) } else { None };
            self.expect_punct('=');
            let value = self.parse_expr();
            self.eat_punct(';');
            return Stmt::Let(VarDef { name, ty, index }, value);
        }
        let expr = self.parse_expr();
        self.eat_punct(';');
        Stmt::Expr(expr)
    }

    fn parse_expr(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            if self.eat_punct('.') {
                let (name, name_index) = self.parse_ident_token();
                let start = expr.index().offset;
                self.expect_punct('(');
                let args = self.parse_args();
                let end_tok = self.advance(); // `)`
                expr = Expr::ContractCall(ContractCallExpr {
                    receiver: Box::new(expr),
                    call_id: FuncId { name, index: name_index },
                    args,
                    index: self.span(start, end_tok.offset + end_tok.width.max(1)),
                });
            } else if self.at_punct('(') {
                // A bare call on an identifier: `f(args)`.
                if let Expr::Ident(ident) = &expr {
                    let func = FuncId { name: ident.name.clone(), index: ident.index.clone() };
                    let start = func.index.offset;
                    self.advance();
                    let args = self.parse_args();
                    let end_tok = self.advance();
                    let is_built_in = is_builtin_name(&func.name);
                    expr = Expr::Call(CallExpr {
                        func,
                        args,
                        is_built_in,
                        index: self.span(start, end_tok.offset + end_tok.width.max(1)),
                    });
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        expr
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        while !self.at_punct(')') && !self.at_eof() {
            args.push(self.parse_expr());
            if !self.eat_punct(',') {
                break;
            }
        }
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Expr::Ident(Ident { name: name.clone(), index: self.idx(tok.offset, tok.width) })
            }
            TokenKind::Int(_) | TokenKind::Str(_) => {
                self.advance();
                Expr::Literal(self.idx(tok.offset, tok.width))
            }
            TokenKind::Punct('(') => {
                self.advance();
                let inner = self.parse_expr();
                self.expect_punct(')');
                inner
            }
            _ => {
                self.advance();
                self.error("expected expression", tok.offset, tok.width.max(1));
                Expr::Literal(self.idx(tok.offset, tok.width.max(1)))
            }
        }
    }
}

/// Functions provided by the compiler itself rather than user code (spec's
/// `DependencyID::BuiltIn` set). A fixed name list stands in for the real
/// built-in signature table the dependency loader materializes.
pub fn is_builtin_name(name: &str) -> bool {
    matches!(name, "assert" | "panic" | "blockTimestamp" | "txCaller" | "approveToken")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_contract_with_function() {
        let code = "Contract A(id:U256){ pub fn f()->U256 { return id } }";
        let ast = parse("A.ral", code).expect("parses");
        let unit = ast.as_contract_unit().unwrap();
        assert_eq!(unit.contracts.len(), 1);
        let contract = &unit.contracts[0];
        assert_eq!(contract.name(), "A");
        assert_eq!(contract.functions.len(), 1);
        assert_eq!(contract.functions[0].name(), "f");
    }

    #[test]
    fn parses_contract_call_expression() {
        let code = "Contract B(a:A){ pub fn g()->U256 { return a.f() } }";
        let ast = parse("B.ral", code).expect("parses");
        let unit = ast.as_contract_unit().unwrap();
        let func = &unit.contracts[0].functions[0];
        match &func.body.statements[0] {
            Stmt::Return(Some(Expr::ContractCall(call)), _) => assert_eq!(call.call_id.name, "f"),
            other => panic!("expected contract call, got {other:?}"),
        }
    }

    #[test]
    fn parses_inheritance_lists() {
        let code = "Contract Child(x:U256) extends P2, P4 implements I1 { fn f() { } }";
        let ast = parse("Child.ral", code).expect("parses");
        let contract = &ast.as_contract_unit().unwrap().contracts[0];
        assert_eq!(contract.extends.len(), 2);
        assert_eq!(contract.implements.len(), 1);
    }

    #[test]
    fn parses_script_files() {
        let code = "fn helper() { return } helper()";
        let ast = parse("script.ral", code).expect("parses");
        match ast {
            Ast::Script(unit) => {
                assert_eq!(unit.functions.len(), 1);
                assert_eq!(unit.statements.len(), 1);
            }
            Ast::Contract(_) => panic!("expected script"),
        }
    }
}
