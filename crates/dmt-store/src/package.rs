//! tar.gz packaging of the updatable artifact for transport.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tar::{Archive, Builder};

/// Packs the artifact at `path` under the top-level entry `name`.
pub fn pack_artifact(path: &Path, name: &Path) -> io::Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = Builder::new(encoder);

    if fs::metadata(path)?.is_dir() {
        tar.append_dir_all(name, path)?;
    } else {
        tar.append_path_with_name(path, name)?;
    }

    tar.into_inner()?.finish()
}

/// Unpacks a blob produced by `pack_artifact` into `dest`.
///
/// Entries that would escape `dest` are skipped by `tar`.
pub fn unpack_artifact<R: Read>(blob: R, dest: &Path) -> io::Result<()> {
    let mut archive = Archive::new(GzDecoder::new(blob));
    archive.unpack(dest)
}
