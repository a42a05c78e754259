//! Export file encoding.
//!
//! ```text
//! +-------+--------------------+------------------+
//! | PKGX  | version (u32, LE)  | bincode(Package) |
//! +-------+--------------------+------------------+
//! ```

use std::path::Path;

use pkgload_ir::{ExportError, Package};

/// Leading bytes of every export file.
pub const MAGIC: [u8; 4] = *b"PKGX";

/// Current format version. Files with any other version are rejected.
pub const FORMAT_VERSION: u32 = 1;

/// Encode a complete package.
pub fn encode(package: &Package) -> Result<Vec<u8>, ExportError> {
    if !package.is_complete() {
        return Err(ExportError::Incomplete {
            path: package.path().to_owned(),
        });
    }
    let body = bincode::serialize(package).map_err(|e| ExportError::Encode {
        path: package.path().to_owned(),
        message: e.to_string(),
    })?;
    let mut bytes = Vec::with_capacity(MAGIC.len() + 4 + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode export data; `file` is only used in errors.
///
/// A package that was not marked complete is refused.
pub fn decode(bytes: &[u8], file: &Path) -> Result<Package, ExportError> {
    let bad_header = || ExportError::BadHeader {
        file: file.to_path_buf(),
    };
    let (magic, rest) = bytes.split_first_chunk::<4>().ok_or_else(bad_header)?;
    if *magic != MAGIC {
        return Err(bad_header());
    }
    let (version, body) = rest.split_first_chunk::<4>().ok_or_else(bad_header)?;
    let version = u32::from_le_bytes(*version);
    if version != FORMAT_VERSION {
        return Err(ExportError::Version {
            file: file.to_path_buf(),
            found: version,
        });
    }
    let package: Package = bincode::deserialize(body).map_err(|e| ExportError::Decode {
        file: file.to_path_buf(),
        message: format!("failed to decode export data: {e}"),
    })?;
    if !package.is_complete() {
        return Err(ExportError::Truncated {
            file: file.to_path_buf(),
            path: package.path().to_owned(),
        });
    }
    Ok(package)
}

/// Write the export file for a complete package.
pub fn write_export(file: &Path, package: &Package) -> Result<(), ExportError> {
    let bytes = encode(package)?;
    std::fs::write(file, bytes).map_err(|source| ExportError::Io {
        file: file.to_path_buf(),
        source,
    })
}

/// Read and decode an export file.
pub fn read_export(file: &Path) -> Result<Package, ExportError> {
    let bytes = std::fs::read(file).map_err(|source| ExportError::Io {
        file: file.to_path_buf(),
        source,
    })?;
    decode(&bytes, file)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pkgload_ir::{BasicKind, Object, ObjectKind, Type};
    use pretty_assertions::assert_eq;

    fn sample() -> Package {
        let mut pkg = Package::new("std/io", "io");
        pkg.insert(Object::new(
            "Reader",
            true,
            ObjectKind::TypeName {
                underlying: Type::Pointer(Box::new(Type::Basic(BasicKind::Byte))),
                size: 8,
                align: 8,
            },
        ))
        .unwrap();
        pkg.add_import("std/errors");
        pkg.mark_complete();
        pkg
    }

    #[test]
    fn header_layout() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(&bytes[..4], b"PKGX");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
    }

    #[test]
    fn decoded_package_matches() {
        let pkg = sample();
        let bytes = encode(&pkg).unwrap();
        assert_eq!(decode(&bytes, Path::new("io.pkx")).unwrap(), pkg);
    }

    #[test]
    fn incomplete_packages_are_not_exported() {
        let err = encode(&Package::new("std/io", "io")).unwrap_err();
        assert!(matches!(err, ExportError::Incomplete { path } if path == "std/io"));
    }

    #[test]
    fn rejects_incomplete_body() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend(bincode::serialize(&Package::new("std/io", "io")).unwrap());
        let err = decode(&bytes, Path::new("io.pkx")).unwrap_err();
        assert!(matches!(err, ExportError::Truncated { path, .. } if path == "std/io"));
    }

    #[test]
    fn rejects_foreign_files() {
        let err = decode(b"PK", Path::new("x")).unwrap_err();
        assert!(matches!(err, ExportError::BadHeader { .. }));
        let err = decode(b"ELF\x7f\x01\x00\x00\x00", Path::new("x")).unwrap_err();
        assert!(matches!(err, ExportError::BadHeader { .. }));
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        let err = decode(&bytes, Path::new("io.pkx")).unwrap_err();
        assert!(matches!(err, ExportError::Version { found: 7, .. }));
    }

    #[test]
    fn rejects_truncated_body() {
        let bytes = encode(&sample()).unwrap();
        let err = decode(&bytes[..bytes.len() / 2], Path::new("io.pkx")).unwrap_err();
        assert!(matches!(err, ExportError::Decode { .. }));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("io.pkx");
        write_export(&file, &sample()).unwrap();
        assert_eq!(read_export(&file).unwrap(), sample());

        let missing = read_export(&dir.path().join("nope.pkx")).unwrap_err();
        assert!(matches!(missing, ExportError::Io { .. }));
    }
}
