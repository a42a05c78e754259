//! Tokenizer built on `logos`.
//!
//! Whitespace and `//` comments are skipped. Characters the grammar has no
//! use for become [`TokenKind::Unknown`]; the parser rejects them at
//! declaration level and skips them inside function bodies.

use std::ops::Range;

use logos::Logos;

use crate::Pos;

/// Token kinds of the declaration language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // === Keywords ===
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("pub")]
    Pub,
    #[token("const")]
    Const,
    #[token("type")]
    Type,
    #[token("var")]
    Var,
    #[token("fn")]
    Fn,
    #[token("struct")]
    Struct,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // === Literals ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    Str,

    // === Punctuation ===
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("->")]
    Arrow,
    #[token("*")]
    Star,
    #[token("-")]
    Minus,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    /// Any character the grammar does not know.
    Unknown,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// How the token reads in "expected X" messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Package => "`package`",
            TokenKind::Import => "`import`",
            TokenKind::Pub => "`pub`",
            TokenKind::Const => "`const`",
            TokenKind::Type => "`type`",
            TokenKind::Var => "`var`",
            TokenKind::Fn => "`fn`",
            TokenKind::Struct => "`struct`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::Str => "string literal",
            TokenKind::Semi => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Eq => "`=`",
            TokenKind::Arrow => "`->`",
            TokenKind::Star => "`*`",
            TokenKind::Minus => "`-`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Unknown => "unknown character",
            TokenKind::Eof => "end of file",
        }
    }
}

/// A token and its byte range in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Tokenize `src`. The result always ends with an [`TokenKind::Eof`] token.
pub fn lex(src: &str) -> Vec<Token> {
    let mut lexer = TokenKind::lexer(src);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        tokens.push(Token {
            kind: result.unwrap_or(TokenKind::Unknown),
            span: lexer.span(),
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: src.len()..src.len(),
    });
    tokens
}

/// Maps byte offsets to 1-based line/column positions.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { line_starts }
    }

    pub fn pos(&self, offset: usize) -> Pos {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line.saturating_sub(1)];
        Pos {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(offset - start + 1).unwrap_or(u32::MAX),
        }
    }
}
