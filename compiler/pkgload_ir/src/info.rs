//! Module metadata produced by a resolver.

use serde::{Deserialize, Serialize};

/// Everything the import engine needs to know about one resolvable package.
///
/// Records are produced by a [`Resolver`](crate::Resolver) and treated as
/// read-only by the engine. The serialized field names match the JSON emitted
/// by build-listing tools, so a manifest can be decoded straight into this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PkgInfo {
    /// Unique import path, e.g. `example.com/geom`.
    pub import_path: String,
    /// Directory holding the source files.
    pub dir: String,
    /// Path to the precompiled artifact, empty when there is none.
    pub export: String,
    /// Part of the standard distribution (always loaded from `export`).
    pub standard: bool,
    /// Declared package name.
    pub name: String,
    /// Regular source files, relative to `dir`.
    pub source_files: Vec<String>,
    /// Files needing foreign-function handling, relative to `dir`.
    pub ffi_files: Vec<String>,
    /// Import paths only needed by the package's tests.
    pub test_imports: Vec<String>,
}

impl PkgInfo {
    /// Create metadata for a source package with no files yet.
    pub fn new(import_path: impl Into<String>, name: impl Into<String>) -> Self {
        PkgInfo {
            import_path: import_path.into(),
            name: name.into(),
            ..PkgInfo::default()
        }
    }

    /// All files the engine parses, regular files first.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.source_files
            .iter()
            .chain(&self.ffi_files)
            .map(String::as_str)
    }

    /// Whether a precompiled artifact is available.
    pub fn has_export(&self) -> bool {
        !self.export.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_files_keeps_regular_files_first() {
        let info = PkgInfo {
            source_files: vec!["a.pk".into(), "b.pk".into()],
            ffi_files: vec!["sys.pk".into()],
            ..PkgInfo::new("example.com/a", "a")
        };

        let files: Vec<_> = info.all_files().collect();
        assert_eq!(files, vec!["a.pk", "b.pk", "sys.pk"]);
    }

    #[test]
    fn export_flag_follows_path() {
        let mut info = PkgInfo::new("fmt", "fmt");
        assert!(!info.has_export());
        info.export = "/cache/fmt.pkx".into();
        assert!(info.has_export());
    }
}
