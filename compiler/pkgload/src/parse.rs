//! Parallel parsing of one package's files.

use std::path::Path;

use pkgload_ir::{BuildContext, ParseError, SourceParser};
use rayon::prelude::*;

use crate::loader::FileLoader;

/// Parse `filenames` (relative to `dir`) through the context's file access.
///
/// Files are parsed in parallel when there is more than one. Every file is
/// attempted even after a failure; the error reported is the one for the
/// earliest file in `filenames`, so the result does not depend on
/// scheduling. Each file handle is closed as soon as its file is parsed.
pub fn parse_files<P: SourceParser>(
    parser: &P,
    ctxt: &BuildContext,
    dir: &Path,
    filenames: &[&str],
) -> Result<Vec<P::File>, ParseError> {
    let loader = FileLoader::new(ctxt);
    parse_with(parser, &loader, dir, filenames)
}

#[tracing::instrument(level = "debug", skip_all, fields(dir = %dir.display(), files = filenames.len()))]
pub(crate) fn parse_with<P: SourceParser>(
    parser: &P,
    loader: &FileLoader<'_>,
    dir: &Path,
    filenames: &[&str],
) -> Result<Vec<P::File>, ParseError> {
    let parse_one = |name: &&str| -> Result<P::File, ParseError> {
        let path = loader.join(dir, name);
        let mut src = loader.open(&path)?;
        parser.parse_file(&path, &mut *src)
    };

    let results: Vec<Result<P::File, ParseError>> = if filenames.len() <= 1 {
        filenames.iter().map(parse_one).collect()
    } else {
        filenames.par_iter().map(parse_one).collect()
    };
    results.into_iter().collect()
}
