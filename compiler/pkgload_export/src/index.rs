//! Import path → export file lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pkgload_ir::{default_name, ExportError, ExportReader, Package, PackageCache};
use rustc_hash::FxHashMap;

use crate::read_export;

/// Export files by import path.
#[derive(Clone, Debug, Default)]
pub struct ExportIndex {
    files: FxHashMap<String, PathBuf>,
}

impl ExportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, file: impl Into<PathBuf>) {
        self.files.insert(path.into(), file.into());
    }

    /// The export file registered for `path`.
    pub fn file(&self, path: &str) -> Option<&Path> {
        self.files.get(path).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: Into<String>, F: Into<PathBuf>> FromIterator<(P, F)> for ExportIndex {
    fn from_iter<I: IntoIterator<Item = (P, F)>>(iter: I) -> Self {
        let mut index = ExportIndex::new();
        for (path, file) in iter {
            index.insert(path, file);
        }
        index
    }
}

impl ExportReader for ExportIndex {
    /// Decoded packages enter the shared cache. Their imports that the
    /// cache does not know yet get incomplete placeholders, so a later
    /// source import of one of them is refused as partially imported.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    fn read(
        &self,
        packages: &PackageCache,
        path: &str,
        _src_dir: &Path,
    ) -> Result<Arc<Package>, ExportError> {
        if let Some(package) = packages.get_complete(path) {
            return Ok(package);
        }
        let file = self.files.get(path).ok_or_else(|| ExportError::NotFound {
            path: path.to_owned(),
        })?;
        let package = read_export(file)?;
        if package.path() != path {
            return Err(ExportError::Mismatch {
                file: file.clone(),
                expected: path.to_owned(),
                found: package.path().to_owned(),
            });
        }

        let imports = package.imports().to_vec();
        let package = packages.insert(Arc::new(package));
        for import in &imports {
            packages.insert_stub(import, default_name(import));
        }
        tracing::debug!(
            file = %file.display(),
            objects = package.len(),
            stubs = imports.len(),
            "loaded export data"
        );
        Ok(package)
    }
}
