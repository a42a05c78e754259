//! Recursive-descent parser for `.pk` files.
//!
//! Parsing stops at the first syntax error; the error carries the file path
//! and the 1-based line and column of the offending token.

use std::path::Path;

use pkgload_ir::ParseError;

use crate::ast::{
    Body, Decl, DeclKind, Expr, Ident, ImportDecl, Param, QualifiedRef, SourceFile, TypeExpr,
    TypeExprKind,
};
use crate::lexer::{lex, LineIndex, Token, TokenKind};
use crate::Pos;


type PResult<T> = Result<T, ParseError>;

/// Parse the text of one file.
pub fn parse_source(path: &Path, src: &str) -> PResult<SourceFile> {
    Parser::new(path, src).parse_file()
}

struct Parser<'a> {
    path: &'a Path,
    src: &'a str,
    tokens: Vec<Token>,
    lines: LineIndex,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(path: &'a Path, src: &'a str) -> Self {
        Parser {
            path,
            src,
            tokens: lex(src),
            lines: LineIndex::new(src),
            pos: 0,
        }
    }

    // --- Cursor ---

    /// The token stream always ends with `Eof` and `advance` never steps
    /// past it, so `pos` stays in bounds.
    #[inline]
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    #[inline]
    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn text(&self) -> &'a str {
        let src: &'a str = self.src;
        &src[self.current().span.clone()]
    }

    fn current_pos(&self) -> Pos {
        self.lines.pos(self.current().span.start)
    }

    fn advance(&mut self) {
        if self.kind() != TokenKind::Eof {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        if !self.check(TokenKind::Ident) {
            return Err(self.unexpected("identifier"));
        }
        let ident = Ident::new(self.text(), self.current_pos());
        self.advance();
        Ok(ident)
    }

    // --- Errors ---

    #[cold]
    fn error_at(&self, pos: Pos, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            path: self.path.to_path_buf(),
            line: pos.line,
            column: pos.column,
            message: message.into(),
        }
    }

    #[cold]
    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.kind() {
            TokenKind::Eof => "end of file".to_owned(),
            TokenKind::Unknown => format!("unexpected character {:?}", self.text()),
            _ => format!("{:?}", self.text()),
        };
        self.error_at(
            self.current_pos(),
            format!("expected {expected}, found {found}"),
        )
    }

    // --- Grammar ---

    fn parse_file(mut self) -> PResult<SourceFile> {
        self.expect(TokenKind::Package)?;
        let package = self.expect_ident()?;
        self.expect(TokenKind::Semi)?;

        let mut imports = Vec::new();
        while self.check(TokenKind::Import) {
            imports.push(self.parse_import()?);
        }

        let mut decls = Vec::new();
        while !self.check(TokenKind::Eof) {
            decls.push(self.parse_decl()?);
        }

        Ok(SourceFile {
            path: self.path.to_path_buf(),
            package,
            imports,
            decls,
        })
    }

    fn parse_import(&mut self) -> PResult<ImportDecl> {
        let pos = self.current_pos();
        self.expect(TokenKind::Import)?;
        let alias = if self.check(TokenKind::Ident) {
            let alias = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            Some(alias)
        } else {
            None
        };
        if !self.check(TokenKind::Str) {
            return Err(self.unexpected("import path"));
        }
        let path_pos = self.current_pos();
        let path = self.parse_string()?;
        if path.is_empty() {
            return Err(self.error_at(path_pos, "empty import path"));
        }
        self.expect(TokenKind::Semi)?;
        Ok(ImportDecl { alias, path, pos })
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        let public = self.eat(TokenKind::Pub);
        let keyword = self.kind();
        if !matches!(
            keyword,
            TokenKind::Const | TokenKind::Type | TokenKind::Var | TokenKind::Fn
        ) {
            return Err(self.unexpected("declaration"));
        }
        self.advance();
        let name = self.expect_ident()?;

        let kind = match keyword {
            TokenKind::Const => {
                let ty = if self.eat(TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semi)?;
                DeclKind::Const { ty, value }
            }
            TokenKind::Type => {
                self.expect(TokenKind::Eq)?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::Semi)?;
                DeclKind::Type { ty }
            }
            TokenKind::Var => {
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::Semi)?;
                DeclKind::Var { ty }
            }
            _ => self.parse_func()?,
        };

        Ok(Decl { public, name, kind })
    }

    fn parse_func(&mut self) -> PResult<DeclKind> {
        self.expect(TokenKind::LParen)?;
        let params = self.parse_fields(TokenKind::RParen)?;
        let result = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = if self.eat(TokenKind::Semi) {
            None
        } else if self.check(TokenKind::LBrace) {
            Some(self.parse_body()?)
        } else {
            return Err(self.unexpected("`{` or `;`"));
        };
        Ok(DeclKind::Func {
            params,
            result,
            body,
        })
    }

    /// `name: Type` list after its opening delimiter, through `close`.
    /// A trailing comma is allowed.
    fn parse_fields(&mut self, close: TokenKind) -> PResult<Vec<Param>> {
        let mut fields = Vec::new();
        while !self.eat(close) {
            let name = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push(Param { name, ty });
            if !self.eat(TokenKind::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(fields)
    }

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let pos = self.current_pos();
        let kind = match self.kind() {
            TokenKind::Ident => {
                let first = self.expect_ident()?;
                if self.eat(TokenKind::Dot) {
                    TypeExprKind::Qualified(first, self.expect_ident()?)
                } else {
                    TypeExprKind::Name(first.name)
                }
            }
            TokenKind::Star => {
                self.advance();
                TypeExprKind::Pointer(Box::new(self.parse_type()?))
            }
            TokenKind::LBracket => {
                self.advance();
                self.expect(TokenKind::RBracket)?;
                TypeExprKind::Slice(Box::new(self.parse_type()?))
            }
            TokenKind::Struct => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                TypeExprKind::Struct(self.parse_fields(TokenKind::RBrace)?)
            }
            _ => return Err(self.unexpected("type")),
        };
        Ok(TypeExpr { pos, kind })
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        let pos = self.current_pos();
        match self.kind() {
            TokenKind::Minus => {
                self.advance();
                self.parse_number(pos, true)
            }
            TokenKind::Int | TokenKind::Float => self.parse_number(pos, false),
            TokenKind::Str => Ok(Expr::Str(self.parse_string()?, pos)),
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, pos))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, pos))
            }
            TokenKind::Ident => {
                let first = self.expect_ident()?;
                if self.eat(TokenKind::Dot) {
                    Ok(Expr::Qualified(first, self.expect_ident()?))
                } else {
                    Ok(Expr::Name(first))
                }
            }
            _ => Err(self.unexpected("constant expression")),
        }
    }

    fn parse_number(&mut self, pos: Pos, negative: bool) -> PResult<Expr> {
        let text = self.text();
        let expr = match self.kind() {
            TokenKind::Int => {
                let magnitude: i128 = text
                    .parse()
                    .map_err(|_| self.error_at(pos, "integer literal out of range"))?;
                let value = if negative { -magnitude } else { magnitude };
                let value = i64::try_from(value)
                    .map_err(|_| self.error_at(pos, "integer literal out of range"))?;
                Expr::Int(value, pos)
            }
            TokenKind::Float => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| self.error_at(pos, "malformed float literal"))?;
                Expr::Float(if negative { -value } else { value }, pos)
            }
            _ => return Err(self.unexpected("number")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_string(&mut self) -> PResult<String> {
        let pos = self.current_pos();
        let text = self.text();
        // The token regex guarantees both quotes.
        let raw = &text[1..text.len() - 1];
        let value = unescape(raw)
            .map_err(|c| self.error_at(pos, format!("unknown escape sequence `\\{c}`")))?;
        self.advance();
        Ok(value)
    }

    /// Balanced `{ ... }`. Only `a.b` pairs are kept; whether `a` names an
    /// import is for the checker to decide.
    fn parse_body(&mut self) -> PResult<Body> {
        let open = self.current_pos();
        self.expect(TokenKind::LBrace)?;
        let mut depth = 1usize;
        let mut refs = Vec::new();
        loop {
            match self.kind() {
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => return Err(self.error_at(open, "unclosed function body")),
                TokenKind::Ident
                    if self.peek_kind(1) == TokenKind::Dot
                        && self.peek_kind(2) == TokenKind::Ident =>
                {
                    let package = self.expect_ident()?;
                    self.advance();
                    let member = self.expect_ident()?;
                    refs.push(QualifiedRef { package, member });
                }
                _ => self.advance(),
            }
        }
        Ok(Body { refs })
    }
}

fn unescape(raw: &str) -> Result<String, char> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => return Err(other),
            None => return Err('\\'),
        }
    }
    Ok(out)
}
