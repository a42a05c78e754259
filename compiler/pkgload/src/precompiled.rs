//! Delegate importer for standard packages.

use std::path::Path;
use std::sync::Arc;

use pkgload_ir::{ExportReader, ImportError, ImportMode, Importer, Package, PackageCache};

/// Loads packages from precompiled export data into the shared cache.
#[derive(Clone)]
pub struct PrecompiledImporter {
    packages: PackageCache,
    reader: Arc<dyn ExportReader>,
}

impl PrecompiledImporter {
    pub fn new(packages: PackageCache, reader: Arc<dyn ExportReader>) -> Self {
        PrecompiledImporter { packages, reader }
    }

    pub fn packages(&self) -> &PackageCache {
        &self.packages
    }

    pub(crate) fn reader(&self) -> Arc<dyn ExportReader> {
        Arc::clone(&self.reader)
    }
}

impl std::fmt::Debug for PrecompiledImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecompiledImporter")
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl Importer for PrecompiledImporter {
    /// # Panics
    ///
    /// Panics if `mode` is not [`ImportMode::DEFAULT`].
    fn import_from(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError> {
        assert!(mode.is_default(), "import mode {} is not supported", mode.0);
        self.reader
            .read(&self.packages, path, src_dir)
            .map_err(|source| ImportError::Precompiled {
                path: path.to_owned(),
                source,
            })
    }
}
