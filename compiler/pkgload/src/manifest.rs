//! Package manifests: a stream of JSON metadata records.
//!
//! A manifest is the concatenated JSON objects a build-listing tool prints,
//! one [`PkgInfo`] per package, with no enclosing array.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pkgload_ir::PkgInfo;
use thiserror::Error;

use crate::resolver::PkgIndex;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("reading manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decoding manifest record {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    packages: Vec<PkgInfo>,
}

impl Manifest {
    pub fn new(packages: Vec<PkgInfo>) -> Self {
        Manifest { packages }
    }

    /// Decode every record in `reader`.
    pub fn from_reader(reader: impl Read) -> Result<Self, ManifestError> {
        let stream = serde_json::Deserializer::from_reader(reader).into_iter::<PkgInfo>();
        let packages = stream
            .enumerate()
            .map(|(index, record)| record.map_err(|source| ManifestError::Decode { index, source }))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(records = packages.len(), "decoded manifest");
        Ok(Manifest { packages })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn packages(&self) -> &[PkgInfo] {
        &self.packages
    }

    /// Build a resolver table; later records win over earlier ones.
    pub fn into_index(self, origin: impl Into<String>) -> PkgIndex {
        let mut index = PkgIndex::new(origin);
        for info in self.packages {
            index.insert(info);
        }
        index
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}
