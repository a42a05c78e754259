//! Error types shared across the pkgload crates.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::Package;

/// The resolver could not produce metadata for an import path.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolveError {
    pub message: String,
}

impl ResolveError {
    #[cold]
    pub fn new(message: impl Into<String>) -> Self {
        ResolveError {
            message: message.into(),
        }
    }
}

/// A source file could not be opened, read or parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}:{column}: {message}", .path.display())]
    Syntax {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },
}

impl ParseError {
    /// The file the error belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ParseError::Open { path, .. }
            | ParseError::Read { path, .. }
            | ParseError::Syntax { path, .. } => path,
        }
    }
}

/// A precompiled artifact could not be located, opened or decoded.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no export data for {path:?}")]
    NotFound { path: String },
    #[error("open {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: not an export file", .file.display())]
    BadHeader { file: PathBuf },
    #[error("{}: unsupported export format version {found}", .file.display())]
    Version { file: PathBuf, found: u32 },
    #[error("{}: {message}", .file.display())]
    Decode { file: PathBuf, message: String },
    #[error("{}: export data is for {found:?}, expected {expected:?}", .file.display())]
    Mismatch {
        file: PathBuf,
        expected: String,
        found: String,
    },
    #[error("{}: export data for {path:?} is incomplete", .file.display())]
    Truncated { file: PathBuf, path: String },
    #[error("cannot export incomplete package {path:?}")]
    Incomplete { path: String },
    #[error("encoding export data for {path:?}: {message}")]
    Encode { path: String, message: String },
}

/// Position in a source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A diagnostic produced while type-checking.
///
/// Soft errors leave the symbol table usable; hard errors mean it may be
/// incompletely populated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{pos}: {message}")]
pub struct TypeError {
    pub pos: Position,
    pub message: String,
    pub soft: bool,
}

impl TypeError {
    #[cold]
    pub fn hard(pos: Position, message: impl Into<String>) -> Self {
        TypeError {
            pos,
            message: message.into(),
            soft: false,
        }
    }

    #[cold]
    pub fn soft(pos: Position, message: impl Into<String>) -> Self {
        TypeError {
            pos,
            message: message.into(),
            soft: true,
        }
    }
}

/// Classification of [`ImportError`]s for programmatic matching.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImportErrorKind {
    /// No metadata, or the precompiled artifact could not be read.
    UnresolvablePath,
    /// The path is already being resolved further up the chain.
    ImportCycle,
    /// A previous attempt left an incomplete package behind.
    ReimportedPartial,
    /// A source file could not be opened or parsed.
    Parse,
    /// Type-checking reported errors.
    TypeCheck,
}

/// Failure to import a package.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },
    #[error("failed to import precompiled {path}: {source}")]
    Precompiled {
        path: String,
        #[source]
        source: ExportError,
    },
    #[error("import cycle through package {path:?}")]
    Cycle { path: String },
    /// The package is attached but must not be trusted.
    #[error("reimported partially imported package {path:?}")]
    ReimportedPartial { path: String, package: Arc<Package> },
    #[error("parsing package {path:?} failed: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
    /// `package` is only present when every error was soft.
    #[error("type-checking package {path:?} failed ({error})")]
    TypeCheck {
        path: String,
        error: TypeError,
        package: Option<Arc<Package>>,
    },
}

impl ImportError {
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::Resolve { .. } | ImportError::Precompiled { .. } => {
                ImportErrorKind::UnresolvablePath
            }
            ImportError::Cycle { .. } => ImportErrorKind::ImportCycle,
            ImportError::ReimportedPartial { .. } => ImportErrorKind::ReimportedPartial,
            ImportError::Parse { .. } => ImportErrorKind::Parse,
            ImportError::TypeCheck { .. } => ImportErrorKind::TypeCheck,
        }
    }

    /// The import path the error is about.
    pub fn path(&self) -> &str {
        match self {
            ImportError::Resolve { path, .. }
            | ImportError::Precompiled { path, .. }
            | ImportError::Cycle { path }
            | ImportError::ReimportedPartial { path, .. }
            | ImportError::Parse { path, .. }
            | ImportError::TypeCheck { path, .. } => path,
        }
    }

    /// Parse failures count as unresolvable, alongside missing metadata.
    pub fn is_unresolvable(&self) -> bool {
        matches!(
            self.kind(),
            ImportErrorKind::UnresolvablePath | ImportErrorKind::Parse
        )
    }

    /// The unsafe partial package carried by the error, if any.
    pub fn partial_package(&self) -> Option<&Arc<Package>> {
        match self {
            ImportError::ReimportedPartial { package, .. } => Some(package),
            ImportError::TypeCheck { package, .. } => package.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(line: u32) -> Position {
        Position {
            file: PathBuf::from("/src/a.pk"),
            line,
            column: 3,
        }
    }

    #[test]
    fn type_error_display() {
        let err = TypeError::hard(pos(4), "undefined: Foo");
        assert_eq!(err.to_string(), "/src/a.pk:4:3: undefined: Foo");
        assert!(!err.soft);
        assert!(TypeError::soft(pos(1), "x").soft);
    }

    #[test]
    fn import_error_kinds() {
        let resolve = ImportError::Resolve {
            path: "a".into(),
            source: ResolveError::new("not listed"),
        };
        assert_eq!(resolve.kind(), ImportErrorKind::UnresolvablePath);
        assert_eq!(resolve.to_string(), "failed to resolve a: not listed");

        let parse = ImportError::Parse {
            path: "a".into(),
            source: ParseError::Syntax {
                path: PathBuf::from("/src/a.pk"),
                line: 1,
                column: 1,
                message: "expected `package`".into(),
            },
        };
        assert!(parse.is_unresolvable());
        assert_eq!(parse.path(), "a");

        let cycle = ImportError::Cycle { path: "b".into() };
        assert!(!cycle.is_unresolvable());
        assert_eq!(cycle.to_string(), "import cycle through package \"b\"");
    }

    #[test]
    fn partial_package_only_on_partial_errors() {
        let pkg = Arc::new(Package::new("a", "a"));
        let err = ImportError::ReimportedPartial {
            path: "a".into(),
            package: Arc::clone(&pkg),
        };
        assert!(err.partial_package().is_some_and(|p| Arc::ptr_eq(p, &pkg)));

        let hard = ImportError::TypeCheck {
            path: "a".into(),
            error: TypeError::hard(pos(2), "bad"),
            package: None,
        };
        assert!(hard.partial_package().is_none());
    }
}
