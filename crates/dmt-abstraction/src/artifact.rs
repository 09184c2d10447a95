//! On-disk layout of model artifacts.
//!
//! An artifact is opaque: it may be a single file or a directory bundle. The
//! canonical updatable path is only ever written by moving a fully written
//! staged copy into place, so readers never observe a partial artifact.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const DEFAULT_ARTIFACT_NAME: &str = "updatable_model";

/// Filesystem layout for the baseline and updatable artifacts.
///
/// Default layout is `<data_dir>/models/<baseline file name>`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    baseline: PathBuf,
    artifact_name: OsString,
}

impl ArtifactLayout {
    /// The updatable artifact takes the baseline's file name so that any
    /// extension the backend relies on is preserved.
    #[must_use]
    pub fn new(root: PathBuf, baseline: PathBuf) -> Self {
        let artifact_name = baseline
            .file_name()
            .map_or_else(|| OsString::from(DEFAULT_ARTIFACT_NAME), OsString::from);
        Self { root, baseline, artifact_name }
    }

    #[must_use]
    pub fn for_data_dir(data_dir: &Path, baseline: PathBuf) -> Self {
        Self::new(data_dir.join("models"), baseline)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn baseline_path(&self) -> &Path {
        &self.baseline
    }

    #[must_use]
    pub fn artifact_name(&self) -> &std::ffi::OsStr {
        &self.artifact_name
    }

    #[must_use]
    pub fn updatable_path(&self) -> PathBuf {
        self.root.join(&self.artifact_name)
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Creates a fresh staging directory next to the canonical path so the
    /// final move stays on one filesystem. It is removed when dropped.
    pub fn staging_dir(&self) -> io::Result<TempDir> {
        self.ensure_dirs()?;
        tempfile::Builder::new().prefix(".staging-").tempdir_in(&self.root)
    }

    #[must_use]
    pub fn staged_artifact_path(&self, staging: &TempDir) -> PathBuf {
        staging.path().join(&self.artifact_name)
    }
}

/// Copies a file or directory artifact to `dst`, which must not exist.
pub fn copy_artifact(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    if meta.is_file() {
        fs::copy(src, dst)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Removes a file or directory artifact. Returns whether anything was removed.
pub fn remove_artifact(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|()| true),
        Ok(_) => fs::remove_file(path).map(|()| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Moves a fully written `staged` artifact onto `canonical`.
///
/// Files are replaced with a single rename. A directory on either side is
/// swapped through a sibling `.previous` path which is restored if the
/// second rename fails.
pub fn replace_artifact(staged: &Path, canonical: &Path) -> io::Result<()> {
    let existing = match fs::symlink_metadata(canonical) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    let staged_is_dir = fs::metadata(staged)?.is_dir();

    match existing {
        None => fs::rename(staged, canonical),
        Some(meta) if !meta.is_dir() && !staged_is_dir => fs::rename(staged, canonical),
        Some(_) => {
            let mut previous = canonical.as_os_str().to_owned();
            previous.push(".previous");
            let previous = PathBuf::from(previous);

            remove_artifact(&previous)?;
            fs::rename(canonical, &previous)?;
            if let Err(e) = fs::rename(staged, canonical) {
                let _ = fs::rename(&previous, canonical);
                return Err(e);
            }
            remove_artifact(&previous)?;
            Ok(())
        }
    }
}
