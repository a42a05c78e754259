//! Reference front-end syntax for pkgload: the `.pk` declaration language.
//!
//! A `.pk` file names its package, lists its imports and declares constants,
//! types, variables and functions. Function bodies are kept only as the
//! qualified references they contain.
//!
//! ```text
//! package geom;
//! import "unsafe";
//! import f = "example.com/fmt";
//!
//! pub type Point = struct { x: int, y: int };
//! pub const Origin: int = 0;
//! pub fn Describe(p: *Point) -> string { f.Sprint(p) }
//! ```

use std::io::Read;
use std::path::Path;

use pkgload_ir::{ParseError, Position, SourceParser};

pub mod ast;
mod lexer;
mod parser;

pub use ast::SourceFile;
pub use lexer::{lex, Token, TokenKind};
pub use parser::parse_source;

/// 1-based line and column inside a file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    /// Attach the file to make a diagnostic position.
    pub fn in_file(self, file: &Path) -> Position {
        Position {
            file: file.to_path_buf(),
            line: self.line,
            column: self.column,
        }
    }
}

/// [`SourceParser`] for `.pk` files.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeclParser;

impl SourceParser for DeclParser {
    type File = SourceFile;

    #[tracing::instrument(level = "trace", skip_all, fields(path = %path.display()))]
    fn parse_file(&self, path: &Path, src: &mut dyn Read) -> Result<SourceFile, ParseError> {
        let mut text = String::new();
        src.read_to_string(&mut text)
            .map_err(|source| ParseError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        parse_source(path, &text)
    }
}
