//! Shallow checker for `.pk` packages.
//!
//! Builds a package's symbol table from its parsed files: imports are bound
//! through the injected [`Importer`](pkgload_ir::Importer), declarations are
//! resolved in source order with cycle detection, and every type declaration
//! gets a layout under the configured [`Sizes`](pkgload_ir::Sizes).
//!
//! # Error classes
//!
//! Hard errors leave the symbol table possibly incomplete; the package is
//! marked complete only when none occurred. Soft errors (redundant or unused
//! imports) are reported but leave the package usable.

mod checker;

use pkgload_ir::{CheckConfig, CheckFailure, Checker, Package};
use pkgload_syntax::SourceFile;

use checker::PackageChecker;


/// [`Checker`] for files produced by [`pkgload_syntax::DeclParser`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DeclChecker;

impl Checker for DeclChecker {
    type File = SourceFile;

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(path = %path, files = files.len(), shallow = conf.ignore_func_bodies)
    )]
    fn check(
        &self,
        path: &str,
        files: &[SourceFile],
        conf: CheckConfig<'_>,
    ) -> Result<Package, CheckFailure> {
        PackageChecker::new(path, files, conf).run()
    }
}
