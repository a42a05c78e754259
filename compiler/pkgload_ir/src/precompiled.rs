//! Reader capability for precompiled package artifacts.

use std::path::Path;
use std::sync::Arc;

use crate::{ExportError, Package, PackageCache};

/// Loads the precompiled interface of a package into a shared cache.
///
/// Readers must return the cached package when `packages` already holds a
/// complete entry for `path`, so repeated requests share one `Arc`.
pub trait ExportReader: Send + Sync {
    fn read(
        &self,
        packages: &PackageCache,
        path: &str,
        src_dir: &Path,
    ) -> Result<Arc<Package>, ExportError>;
}

impl<T: ExportReader + ?Sized> ExportReader for Arc<T> {
    fn read(
        &self,
        packages: &PackageCache,
        path: &str,
        src_dir: &Path,
    ) -> Result<Arc<Package>, ExportError> {
        (**self).read(packages, path, src_dir)
    }
}
