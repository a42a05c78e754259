//! File access through the build context's overrides.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use pkgload_ir::{BuildContext, ParseError};

pub(crate) struct FileLoader<'a> {
    ctxt: &'a BuildContext,
}

impl<'a> FileLoader<'a> {
    pub(crate) fn new(ctxt: &'a BuildContext) -> Self {
        FileLoader { ctxt }
    }

    pub(crate) fn join(&self, dir: &Path, file: &str) -> PathBuf {
        match &self.ctxt.join_path {
            Some(join) => join(dir, file),
            None => dir.join(file),
        }
    }

    pub(crate) fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>, ParseError> {
        let opened = match &self.ctxt.open_file {
            Some(open) => open(path),
            None => File::open(path).map(|file| Box::new(file) as Box<dyn Read + Send>),
        };
        opened.map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    fn is_abs(&self, path: &Path) -> bool {
        match &self.ctxt.is_abs_path {
            Some(is_abs) => is_abs(path),
            None => path.is_absolute(),
        }
    }

    /// Absolute form of `path`. Falls back to `path` itself when the current
    /// directory is unavailable.
    pub(crate) fn abs_path(&self, path: &Path) -> PathBuf {
        if self.is_abs(path) {
            return path.to_path_buf();
        }
        std::path::absolute(path).unwrap_or_else(|err| {
            tracing::debug!(path = %path.display(), %err, "cannot make path absolute");
            path.to_path_buf()
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io;

    #[test]
    fn overrides_take_precedence() {
        let ctxt = BuildContext::default()
            .with_join_path(|dir, file| PathBuf::from(format!("{}|{file}", dir.display())))
            .with_is_abs_path(|path| path.starts_with("mem:"))
            .with_open_file(|path| {
                let body = format!("contents of {}", path.display());
                Ok(Box::new(io::Cursor::new(body.into_bytes())) as Box<dyn Read + Send>)
            });
        let loader = FileLoader::new(&ctxt);

        assert_eq!(loader.join(Path::new("mem:a"), "x.pk"), PathBuf::from("mem:a|x.pk"));
        assert_eq!(loader.abs_path(Path::new("mem:a")), PathBuf::from("mem:a"));

        let mut text = String::new();
        loader
            .open(Path::new("mem:a|x.pk"))
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "contents of mem:a|x.pk");
    }

    #[test]
    fn host_filesystem_by_default() {
        let ctxt = BuildContext::default();
        let loader = FileLoader::new(&ctxt);
        assert_eq!(loader.join(Path::new("/src"), "a.pk"), PathBuf::from("/src/a.pk"));
        assert!(loader.abs_path(Path::new("rel")).is_absolute());

        let err = loader.open(Path::new("/definitely/not/here.pk")).err().unwrap();
        assert!(matches!(err, ParseError::Open { .. }));
    }
}
