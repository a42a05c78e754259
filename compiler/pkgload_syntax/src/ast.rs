//! Syntax tree of one source file.

use std::path::PathBuf;

use crate::Pos;

/// A parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Name from the `package` clause.
    pub package: Ident,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

/// An identifier and where it appeared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Ident {
            name: name.into(),
            pos,
        }
    }
}

/// `import [alias =] "path";`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub alias: Option<Ident>,
    pub path: String,
    pub pos: Pos,
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    /// Declared with `pub`; only public objects are visible to importers.
    pub public: bool,
    pub name: Ident,
    pub kind: DeclKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Const {
        ty: Option<TypeExpr>,
        value: Expr,
    },
    Type {
        ty: TypeExpr,
    },
    Var {
        ty: TypeExpr,
    },
    Func {
        params: Vec<Param>,
        result: Option<TypeExpr>,
        /// `None` for a body-less (external) function.
        body: Option<Body>,
    },
}

/// `name: Type`, used for parameters and struct fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub pos: Pos,
    pub kind: TypeExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    Name(String),
    /// `pkg.Name`
    Qualified(Ident, Ident),
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Struct(Vec<Param>),
}

/// Constant initializer.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64, Pos),
    Float(f64, Pos),
    Str(String, Pos),
    Bool(bool, Pos),
    Name(Ident),
    Qualified(Ident, Ident),
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Int(_, pos) | Expr::Float(_, pos) | Expr::Str(_, pos) | Expr::Bool(_, pos) => {
                *pos
            }
            Expr::Name(ident) | Expr::Qualified(ident, _) => ident.pos,
        }
    }
}

/// A function body. Only its qualified references survive parsing; they are
/// all the checker looks at when bodies are checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body {
    pub refs: Vec<QualifiedRef>,
}

/// `pkg.member` appearing inside a function body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedRef {
    pub package: Ident,
    pub member: Ident,
}
