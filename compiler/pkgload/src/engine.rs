//! The source import engine.
//!
//! Resolves an import path to its metadata, then either hands the package to
//! the precompiled importer (standard packages) or parses and shallowly
//! type-checks its sources, importing dependencies recursively through
//! itself. Results are memoized in the shared [`PackageCache`].
//!
//! # Failure cleanup
//!
//! The in-progress marker for a package is owned by a [`Resolving`] guard
//! for the whole parse and check. Any early return or panic drops the guard,
//! which releases the marker, so a later import of the same path starts over
//! instead of being reported as a cycle.
//!
//! [`Resolving`]: pkgload_ir::Resolving

use std::path::Path;
use std::sync::Arc;

use pkgload_export::ExportIndex;
use pkgload_ir::{
    ensure_sufficient_stack, BuildContext, CacheState, CheckConfig, CheckFailure, Checker,
    ExportReader, ImportError, ImportMode, Importer, Package, PackageCache, SourceParser, Sizes,
    TypeError, UNSAFE_PATH,
};

use crate::loader::FileLoader;
use crate::parse::parse_with;
use crate::precompiled::PrecompiledImporter;
use crate::resolver::Resolver;

/// Importer that loads non-standard packages from source.
///
/// Cheap to share by reference across threads when its parser and checker
/// are; concurrent imports coordinate only through the package cache.
///
/// A caller that asks for a path another thread is still resolving does not
/// wait for it: it sees the in-progress marker and gets
/// [`ImportError::Cycle`]. Callers that share an engine should import
/// overlapping dependency sets one at a time.
pub struct ImportEngine<P, C> {
    ctxt: BuildContext,
    sizes: Sizes,
    resolver: Arc<dyn Resolver>,
    parser: P,
    checker: C,
    packages: PackageCache,
    precompiled: PrecompiledImporter,
}

impl<P, C> ImportEngine<P, C>
where
    P: SourceParser,
    C: Checker<File = P::File>,
{
    /// An engine with a fresh package cache and no export data.
    ///
    /// Sizes are fixed here from the context's target.
    pub fn new(ctxt: BuildContext, resolver: Arc<dyn Resolver>, parser: P, checker: C) -> Self {
        let packages = PackageCache::new();
        let sizes = ctxt.sizes();
        tracing::debug!(compiler = %ctxt.compiler, arch = %ctxt.arch, "created import engine");
        ImportEngine {
            precompiled: PrecompiledImporter::new(packages.clone(), Arc::new(ExportIndex::new())),
            ctxt,
            sizes,
            resolver,
            parser,
            checker,
            packages,
        }
    }

    /// Share `packages` with the caller (and with the precompiled importer).
    #[must_use]
    pub fn with_packages(mut self, packages: PackageCache) -> Self {
        self.precompiled = PrecompiledImporter::new(packages.clone(), self.precompiled.reader());
        self.packages = packages;
        self
    }

    /// Read standard packages through `reader`.
    #[must_use]
    pub fn with_export_reader(mut self, reader: Arc<dyn ExportReader>) -> Self {
        self.precompiled = PrecompiledImporter::new(self.packages.clone(), reader);
        self
    }

    pub fn packages(&self) -> &PackageCache {
        &self.packages
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctxt
    }

    pub fn sizes(&self) -> Sizes {
        self.sizes
    }

    pub fn precompiled(&self) -> &PrecompiledImporter {
        &self.precompiled
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    fn import_inner(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError> {
        assert!(mode.is_default(), "import mode {} is not supported", mode.0);

        // The pseudo-package is never resolved.
        if path == UNSAFE_PATH {
            return Ok(Package::unsafe_package());
        }

        let loader = FileLoader::new(&self.ctxt);
        let src_dir = loader.abs_path(src_dir);
        let info = self
            .resolver
            .resolve(path)
            .map_err(|source| ImportError::Resolve {
                path: path.to_owned(),
                source,
            })?;

        if info.standard {
            tracing::debug!("delegating to precompiled importer");
            return self.precompiled.import_from(path, &src_dir, mode);
        }

        let path = info.import_path.as_str();
        let guard = match self.packages.begin(path) {
            Ok(guard) => guard,
            Err(CacheState::Complete(pkg)) => return Ok(pkg),
            Err(CacheState::InProgress) => {
                return Err(ImportError::Cycle {
                    path: path.to_owned(),
                })
            }
            Err(CacheState::Partial(package)) => {
                return Err(ImportError::ReimportedPartial {
                    path: path.to_owned(),
                    package,
                })
            }
            Err(CacheState::Absent) => unreachable!("claim refused for absent path {path:?}"),
        };

        let filenames: Vec<&str> = info.all_files().collect();
        let dir = Path::new(&info.dir);
        let files = parse_with(&self.parser, &loader, dir, &filenames).map_err(|source| {
            ImportError::Parse {
                path: path.to_owned(),
                source,
            }
        })?;

        let mut first_hard: Option<TypeError> = None;
        let mut record = |err: &TypeError| {
            if !err.soft && first_hard.is_none() {
                first_hard = Some(err.clone());
            }
        };
        let conf = CheckConfig::new(self, dir)
            .with_sizes(self.sizes)
            .shallow()
            .with_error_handler(&mut record);
        let checked = self.checker.check(path, &files, conf);

        match (checked, first_hard) {
            (Ok(pkg), None) => {
                tracing::debug!(objects = pkg.len(), "imported from source");
                Ok(guard.finish(Arc::new(pkg)))
            }
            (Ok(_), Some(err)) => {
                panic!("checker accepted {path:?} after reporting {err}")
            }
            // A hard error may leave the package half-built, so it is not
            // handed out; the first hard error is reported over any soft one.
            (Err(_), Some(error)) => Err(ImportError::TypeCheck {
                path: path.to_owned(),
                error,
                package: None,
            }),
            (Err(CheckFailure { package, error }), None) => Err(ImportError::TypeCheck {
                path: path.to_owned(),
                error,
                package: Some(Arc::new(package)),
            }),
        }
    }
}

impl<P, C> Importer for ImportEngine<P, C>
where
    P: SourceParser,
    C: Checker<File = P::File>,
{
    /// # Panics
    ///
    /// Panics if `mode` is not [`ImportMode::DEFAULT`], or if the checker
    /// returns a package after reporting a hard error.
    fn import_from(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError> {
        ensure_sufficient_stack(|| self.import_inner(path, src_dir, mode))
    }
}

impl<P, C> std::fmt::Debug for ImportEngine<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportEngine")
            .field("ctxt", &self.ctxt)
            .field("sizes", &self.sizes)
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
