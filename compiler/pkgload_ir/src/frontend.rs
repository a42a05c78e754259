//! Parse and type-check capabilities driven by the import engine.
//!
//! The engine treats both as black boxes: a [`SourceParser`] turns one file
//! into an AST, a [`Checker`] turns a package's ASTs into a [`Package`],
//! calling back into an [`Importer`] for every import it meets.

use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::{Importer, Package, ParseError, Sizes, TypeError};

/// Parses one source file.
///
/// Parsers are shared across the worker threads that parse a package's files
/// concurrently, hence the `Sync` bound.
pub trait SourceParser: Sync {
    type File: Send;

    /// Parse the contents of `src`; `path` is used for positions and errors.
    fn parse_file(&self, path: &Path, src: &mut dyn Read) -> Result<Self::File, ParseError>;
}

/// Options for one type-checking run.
pub struct CheckConfig<'a> {
    /// Skip function bodies; only declarations are checked.
    pub ignore_func_bodies: bool,
    /// Accept the foreign-function pseudo package without resolving it.
    pub fake_import_ffi: bool,
    /// Size rules for layouts and constant ranges.
    pub sizes: Sizes,
    /// Directory imports are resolved from.
    pub src_dir: &'a Path,
    /// Resolves the package's imports.
    pub importer: &'a dyn Importer,
    /// Called for every error, in detection order. Checking never stops at
    /// the first error; without a handler errors are only collected.
    pub error: Option<&'a mut dyn FnMut(&TypeError)>,
}

impl<'a> CheckConfig<'a> {
    pub fn new(importer: &'a dyn Importer, src_dir: &'a Path) -> Self {
        CheckConfig {
            ignore_func_bodies: false,
            fake_import_ffi: false,
            sizes: Sizes::default(),
            src_dir,
            importer,
            error: None,
        }
    }

    #[must_use]
    pub fn with_sizes(mut self, sizes: Sizes) -> Self {
        self.sizes = sizes;
        self
    }

    #[must_use]
    pub fn shallow(mut self) -> Self {
        self.ignore_func_bodies = true;
        self.fake_import_ffi = true;
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: &'a mut dyn FnMut(&TypeError)) -> Self {
        self.error = Some(handler);
        self
    }
}

impl fmt::Debug for CheckConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckConfig")
            .field("ignore_func_bodies", &self.ignore_func_bodies)
            .field("fake_import_ffi", &self.fake_import_ffi)
            .field("sizes", &self.sizes)
            .field("src_dir", &self.src_dir)
            .finish_non_exhaustive()
    }
}

/// Checking finished with at least one error.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CheckFailure {
    /// Whatever was declared; complete only if every error was soft.
    pub package: Package,
    /// The first error reported, hard or soft.
    pub error: TypeError,
}

/// Type-checks the parsed files of one package.
pub trait Checker {
    type File;

    fn check(
        &self,
        path: &str,
        files: &[Self::File],
        conf: CheckConfig<'_>,
    ) -> Result<Package, CheckFailure>;
}
