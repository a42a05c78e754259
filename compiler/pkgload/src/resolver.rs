//! Import path resolution.

use std::sync::Arc;

use pkgload_export::ExportIndex;
use pkgload_ir::{PkgInfo, ResolveError};
use rustc_hash::FxHashMap;

/// Maps an import path to its package metadata.
///
/// Called concurrently from parallel imports, so implementations must be
/// thread-safe. Closures with the right signature are resolvers too.
pub trait Resolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Arc<PkgInfo>, ResolveError>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Result<Arc<PkgInfo>, ResolveError> + Send + Sync,
{
    fn resolve(&self, path: &str) -> Result<Arc<PkgInfo>, ResolveError> {
        self(path)
    }
}

/// A fixed table of package metadata, typically decoded from a manifest.
#[derive(Clone, Debug, Default)]
pub struct PkgIndex {
    origin: String,
    packages: FxHashMap<String, Arc<PkgInfo>>,
}

impl PkgIndex {
    /// An empty index. `origin` names where the records came from and only
    /// appears in resolution errors.
    pub fn new(origin: impl Into<String>) -> Self {
        PkgIndex {
            origin: origin.into(),
            packages: FxHashMap::default(),
        }
    }

    /// Add a record, replacing any previous one for the same import path.
    pub fn insert(&mut self, info: PkgInfo) -> Option<Arc<PkgInfo>> {
        self.packages.insert(info.import_path.clone(), Arc::new(info))
    }

    pub fn get(&self, path: &str) -> Option<&Arc<PkgInfo>> {
        self.packages.get(path)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All records, sorted by import path.
    pub fn infos(&self) -> Vec<&Arc<PkgInfo>> {
        let mut infos: Vec<_> = self.packages.values().collect();
        infos.sort_by(|a, b| a.import_path.cmp(&b.import_path));
        infos
    }

    /// Export files of every record that has one.
    pub fn export_index(&self) -> ExportIndex {
        self.packages
            .values()
            .filter(|info| info.has_export())
            .map(|info| (info.import_path.clone(), info.export.clone()))
            .collect()
    }
}

impl Resolver for PkgIndex {
    fn resolve(&self, path: &str) -> Result<Arc<PkgInfo>, ResolveError> {
        self.packages.get(path).cloned().ok_or_else(|| {
            ResolveError::new(format!("failed to resolve {path} amongst {}", self.origin))
        })
    }
}
