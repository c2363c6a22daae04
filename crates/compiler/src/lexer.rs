//! A hand-rolled lexer for the target language's surface syntax. Kept
//! small and regular — it only needs to support the constructs the AST in
//! [`crate::ast`] models.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(String),
    Str(String),
    /// Single-char punctuation: `( ) { } , : ; .`
    Punct(char),
    Arrow,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub width: usize,
}

pub const KEYWORDS: &[&str] =
    &["Contract", "Interface", "extends", "implements", "fn", "pub", "return", "let"];

pub fn lex(code: &str) -> Vec<Token> {
    let bytes = code.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let len = bytes.len();

    while i < len {
        let c = bytes[i] as char;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Line comments, permitted between `import` and its literal, and
        // anywhere else as ordinary whitespace-equivalent noise.
        if c == '/' && i + 1 < len && bytes[i + 1] as char == '/' {
            while i < len && bytes[i] as char != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '"' {
            let start = i;
            i += 1;
            while i < len && bytes[i] as char != '"' {
                i += 1;
            }
            let end = (i + 1).min(len);
            let text = &code[start + 1..i.min(len)];
            tokens.push(Token { kind: TokenKind::Str(text.to_string()), offset: start, width: end - start });
            i = end;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < len && (bytes[i] as char == '_' || (bytes[i] as char).is_alphanumeric()) {
                i += 1;
            }
            let text = code[start..i].to_string();
            tokens.push(Token { kind: TokenKind::Ident(text), offset: start, width: i - start });
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < len && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Int(code[start..i].to_string()),
                offset: start,
                width: i - start,
            });
            continue;
        }

        if c == '-' && i + 1 < len && bytes[i + 1] as char == '>' {
            tokens.push(Token { kind: TokenKind::Arrow, offset: i, width: 2 });
            i += 2;
            continue;
        }

        if "(){},:;.=".contains(c) {
            tokens.push(Token { kind: TokenKind::Punct(c), offset: i, width: 1 });
            i += 1;
            continue;
        }

        // Unknown byte: skip it. The parser surfaces missing-structure
        // errors; the lexer never hard-fails.
        i += 1;
    }

    tokens.push(Token { kind: TokenKind::Eof, offset: len, width: 0 });
    tokens
}

impl Token {
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == kw)
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
