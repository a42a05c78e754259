//! Precompiled package artifacts.
//!
//! Standard packages are not checked from source; their symbol tables are
//! read from export files written by [`write_export`]. An [`ExportIndex`]
//! maps import paths to those files and implements
//! [`ExportReader`](pkgload_ir::ExportReader) over the shared cache.

mod format;
mod index;

pub use format::{decode, encode, read_export, write_export, FORMAT_VERSION, MAGIC};
pub use index::ExportIndex;
