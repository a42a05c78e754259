//! Build context: how files are read and paths are joined.

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Sizes;

/// Opens a file for reading.
pub type OpenFileFn = dyn Fn(&Path) -> io::Result<Box<dyn Read + Send>> + Send + Sync;
/// Reports whether a path is absolute.
pub type IsAbsPathFn = dyn Fn(&Path) -> bool + Send + Sync;
/// Joins a directory and a file name.
pub type JoinPathFn = dyn Fn(&Path, &str) -> PathBuf + Send + Sync;

/// Configuration bundle handed to an import engine.
///
/// Every override is optional; when absent the platform behaviour is used.
/// The context is immutable for the lifetime of the engine that owns it.
#[derive(Clone)]
pub struct BuildContext {
    /// Compiler identifier used to select size rules.
    pub compiler: String,
    /// Architecture identifier used to select size rules.
    pub arch: String,
    pub open_file: Option<Arc<OpenFileFn>>,
    pub is_abs_path: Option<Arc<IsAbsPathFn>>,
    pub join_path: Option<Arc<JoinPathFn>>,
}

impl Default for BuildContext {
    fn default() -> Self {
        BuildContext {
            compiler: "std".to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
            open_file: None,
            is_abs_path: None,
            join_path: None,
        }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("compiler", &self.compiler)
            .field("arch", &self.arch)
            .field("open_file", &self.open_file.is_some())
            .field("is_abs_path", &self.is_abs_path.is_some())
            .field("join_path", &self.join_path.is_some())
            .finish()
    }
}

impl BuildContext {
    /// Host defaults, overridden by `PKGLOAD_ARCH` and `PKGLOAD_COMPILER`.
    pub fn from_env() -> Self {
        let mut ctxt = BuildContext::default();
        if let Ok(arch) = std::env::var("PKGLOAD_ARCH") {
            ctxt.arch = arch;
        }
        if let Ok(compiler) = std::env::var("PKGLOAD_COMPILER") {
            ctxt.compiler = compiler;
        }
        ctxt
    }

    /// Size rules for this context's target.
    pub fn sizes(&self) -> Sizes {
        Sizes::for_target_or_default(&self.compiler, &self.arch)
    }

    #[must_use]
    pub fn with_target(mut self, compiler: impl Into<String>, arch: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self.arch = arch.into();
        self
    }

    #[must_use]
    pub fn with_open_file<F>(mut self, open: F) -> Self
    where
        F: Fn(&Path) -> io::Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    {
        self.open_file = Some(Arc::new(open));
        self
    }

    #[must_use]
    pub fn with_is_abs_path<F>(mut self, is_abs: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.is_abs_path = Some(Arc::new(is_abs));
        self
    }

    #[must_use]
    pub fn with_join_path<F>(mut self, join: F) -> Self
    where
        F: Fn(&Path, &str) -> PathBuf + Send + Sync + 'static,
    {
        self.join_path = Some(Arc::new(join));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_overrides() {
        let ctxt = BuildContext::default();
        assert!(ctxt.open_file.is_none());
        assert!(ctxt.is_abs_path.is_none());
        assert!(ctxt.join_path.is_none());
        assert_eq!(ctxt.compiler, "std");
    }

    #[test]
    fn target_selects_sizes() {
        let ctxt = BuildContext::default().with_target("std", "x86");
        assert_eq!(ctxt.sizes().word_size, 4);

        let unknown = BuildContext::default().with_target("std", "vax");
        assert_eq!(unknown.sizes(), Sizes::default());
    }

    #[test]
    fn debug_hides_closures() {
        let ctxt = BuildContext::default().with_join_path(|dir, file| dir.join(file));
        let shown = format!("{ctxt:?}");
        assert!(shown.contains("join_path: true"));
        assert!(shown.contains("open_file: false"));
    }
}
