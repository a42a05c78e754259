//! Source import engine.
//!
//! Imports a package by resolving its import path to metadata, then either
//! loading precompiled export data (standard packages) or parsing its source
//! files in parallel and type-checking them shallowly, with declarations but
//! no function bodies. Dependencies are imported recursively through the same
//! engine and memoized in a shared [`PackageCache`].
//!
//! # Pipeline
//!
//! ```text
//! import_from(path)
//!   ├─ "unsafe" ───────────────► built-in package
//!   ├─ Resolver ──► PkgInfo
//!   │    ├─ standard ──────────► PrecompiledImporter ──► ExportReader
//!   │    └─ source
//!   │         ├─ cache: complete ► cached package
//!   │         ├─ cache: in progress ► import cycle
//!   │         └─ absent ► parse_files (rayon) ► Checker (shallow) ► cache
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pkgload::Workspace;
//!
//! let workspace = Workspace::load(Path::new("deps.json"))?;
//! let pkg = workspace.import_from("example.com/geom", Path::new("."))?;
//! for object in pkg.exported() {
//!     println!("{}", object.describe());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod commands;
mod engine;
mod loader;
mod logging;
mod manifest;
mod parse;
mod precompiled;
mod resolver;
mod workspace;

pub use engine::ImportEngine;
pub use logging::init_tracing;
pub use manifest::{Manifest, ManifestError};
pub use parse::parse_files;
pub use precompiled::PrecompiledImporter;
pub use resolver::{PkgIndex, Resolver};
pub use workspace::{SetupError, SourceEngine, Workspace};

pub use pkgload_ir::{
    BuildContext, CacheState, ImportError, ImportErrorKind, ImportMode, Importer, Package,
    PackageCache, PkgInfo, ResolveError, Sizes, UNSAFE_PATH,
};
