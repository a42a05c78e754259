//! A ready-to-use engine over a manifest, with the `.pk` front end.

use std::path::Path;
use std::sync::Arc;

use pkgload_check::DeclChecker;
use pkgload_export::ExportIndex;
use pkgload_ir::{
    BuildContext, ExportError, ExportReader, ImportError, ImportMode, Importer, Package,
    PackageCache,
};
use pkgload_syntax::DeclParser;
use thiserror::Error;

use crate::engine::ImportEngine;
use crate::manifest::{Manifest, ManifestError};
use crate::resolver::{PkgIndex, Resolver};

/// The engine over the reference `.pk` parser and checker.
pub type SourceEngine = ImportEngine<DeclParser, DeclChecker>;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("failed to load precompiled {path}: {source}")]
    Preload {
        path: String,
        #[source]
        source: ExportError,
    },
}

/// Owns the resolver table, the export index and the engine built on them.
#[derive(Debug)]
pub struct Workspace {
    index: Arc<PkgIndex>,
    engine: SourceEngine,
}

impl Workspace {
    /// Build a workspace from manifest records.
    ///
    /// Every record with export data is loaded into the package cache up
    /// front, so those packages are never parsed from source.
    #[tracing::instrument(level = "debug", skip_all, fields(origin = %origin))]
    pub fn from_manifest(
        ctxt: BuildContext,
        manifest: Manifest,
        origin: &str,
    ) -> Result<Self, SetupError> {
        let index = Arc::new(manifest.into_index(origin));
        let exports: Arc<ExportIndex> = Arc::new(index.export_index());
        let packages = PackageCache::new();

        for info in index.infos() {
            if !info.has_export() {
                continue;
            }
            exports
                .read(&packages, &info.import_path, Path::new(&info.dir))
                .map_err(|source| SetupError::Preload {
                    path: info.import_path.clone(),
                    source,
                })?;
        }
        tracing::debug!(
            packages = index.len(),
            preloaded = packages.complete_paths().len(),
            "workspace ready"
        );

        let resolver: Arc<dyn Resolver> = Arc::clone(&index) as Arc<dyn Resolver>;
        let engine = ImportEngine::new(ctxt, resolver, DeclParser, DeclChecker)
            .with_packages(packages)
            .with_export_reader(exports);
        Ok(Workspace { index, engine })
    }

    /// Load the manifest at `path` with the context taken from the environment.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        Self::load_with(BuildContext::from_env(), path)
    }

    pub fn load_with(ctxt: BuildContext, path: &Path) -> Result<Self, SetupError> {
        let manifest = Manifest::load(path)?;
        Self::from_manifest(ctxt, manifest, &path.display().to_string())
    }

    pub fn engine(&self) -> &SourceEngine {
        &self.engine
    }

    pub fn index(&self) -> &PkgIndex {
        &self.index
    }

    pub fn packages(&self) -> &PackageCache {
        self.engine.packages()
    }

    /// Import `path` as seen from `src_dir`.
    pub fn import_from(&self, path: &str, src_dir: &Path) -> Result<Arc<Package>, ImportError> {
        self.engine.import_from(path, src_dir, ImportMode::DEFAULT)
    }
}
