//! The import capability handed to checkers.

use std::path::Path;
use std::sync::Arc;

use crate::{ImportError, Package};

/// Import mode flags. Only the default mode is supported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImportMode(pub u32);

impl ImportMode {
    pub const DEFAULT: ImportMode = ImportMode(0);

    pub fn is_default(self) -> bool {
        self == ImportMode::DEFAULT
    }
}

/// Resolves import paths to type-checked packages.
///
/// Implemented by the source import engine and by the precompiled importer;
/// a checker receives one as `&dyn Importer` and calls back into it for every
/// import it encounters.
pub trait Importer {
    /// Shortcut for `import_from(path, ".", ImportMode::DEFAULT)`.
    fn import(&self, path: &str) -> Result<Arc<Package>, ImportError> {
        self.import_from(path, Path::new("."), ImportMode::DEFAULT)
    }

    /// Import `path` as seen from `src_dir`.
    ///
    /// # Panics
    ///
    /// Implementations panic when `mode` is not [`ImportMode::DEFAULT`].
    fn import_from(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError>;
}

impl<T: Importer + ?Sized> Importer for &T {
    fn import_from(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError> {
        (**self).import_from(path, src_dir, mode)
    }
}

impl<T: Importer + ?Sized> Importer for Arc<T> {
    fn import_from(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<Package>, ImportError> {
        (**self).import_from(path, src_dir, mode)
    }
}
