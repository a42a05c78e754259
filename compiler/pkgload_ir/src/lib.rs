//! Shared model for the pkgload import engine.
//!
//! Everything that crosses a crate boundary lives here: module metadata,
//! type-checked packages, the shared resolution cache, size rules, the build
//! context, error types, and the capability traits the engine drives.
//!
//! # Capabilities
//!
//! ```text
//! Resolver (pkgload)  ── import path ──► PkgInfo
//! SourceParser        ── file ─────────► AST
//! Checker             ── ASTs ─────────► Package   (calls back into Importer)
//! ExportReader        ── artifact ─────► Package   (for standard packages)
//! ```

mod cache;
mod context;
mod error;
mod frontend;
mod importer;
mod info;
mod package;
mod precompiled;
mod sizes;
mod stack;

pub use cache::{CacheState, PackageCache, Resolving};
pub use context::{BuildContext, IsAbsPathFn, JoinPathFn, OpenFileFn};
pub use error::{
    ExportError, ImportError, ImportErrorKind, ParseError, Position, ResolveError, TypeError,
};
pub use frontend::{CheckConfig, CheckFailure, Checker, SourceParser};
pub use importer::{ImportMode, Importer};
pub use info::PkgInfo;
pub use package::{
    default_name, BasicKind, ConstValue, Field, Object, ObjectKind, Package, Signature, Type,
    FFI_PATH, UNSAFE_PATH,
};
pub use precompiled::ExportReader;
pub use sizes::Sizes;
pub use stack::ensure_sufficient_stack;
