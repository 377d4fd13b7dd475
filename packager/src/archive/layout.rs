//! On-disk layout of a build's staging tree.
//!
//! ```text
//! <staging_root>/<project>/<ref-or-version>/   version root
//!     <repo_location>/...                      archived subtree
//!     repos/<project>-<platform>.tar.gz        archives
//! ```

use super::naming::ArchiveName;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

/// Directory under the version root that receives archives.
pub const REPOS_DIR: &str = "repos";

/// Paths involved in archiving one repository subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    version_root: Utf8PathBuf,
    repo_subpath: Utf8PathBuf,
}

impl ArchiveLayout {
    /// Describe the archive of `repo_subpath` under `version_root`.
    #[must_use]
    pub fn new(version_root: Utf8PathBuf, repo_subpath: &Utf8Path) -> Self {
        Self {
            version_root,
            repo_subpath: repo_subpath.to_owned(),
        }
    }

    /// The directory the archiving tool runs from.
    #[must_use]
    pub fn version_root(&self) -> &Utf8Path {
        &self.version_root
    }

    /// The subtree path as stored in the archive.
    #[must_use]
    pub fn repo_subpath(&self) -> &Utf8Path {
        &self.repo_subpath
    }

    /// The subtree being archived.
    #[must_use]
    pub fn source_dir(&self) -> Utf8PathBuf {
        self.version_root.join(&self.repo_subpath)
    }

    /// The directory archives are written to.
    #[must_use]
    pub fn repos_dir(&self) -> Utf8PathBuf {
        self.version_root.join(REPOS_DIR)
    }

    /// Return `true` when the archived subtree and `repos/` contain one
    /// another, so an archive would pick up its own staging file.
    #[must_use]
    pub fn source_overlaps_repos(&self) -> bool {
        let source = self.source_dir();
        let repos = self.repos_dir();
        source.starts_with(&repos) || repos.starts_with(&source)
    }

    /// The final path of the archive called `name`.
    #[must_use]
    pub fn archive_path(&self, name: &ArchiveName) -> Utf8PathBuf {
        self.repos_dir().join(name.filename())
    }
}

/// Return `true` if `path` does not exist or is a directory with no entries.
///
/// A path that exists but is not a directory counts as content.
///
/// # Errors
///
/// Returns any I/O error other than "not found" raised while inspecting
/// `path`.
pub fn is_empty_or_absent(path: &Utf8Path) -> io::Result<bool> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(err),
    };
    if !metadata.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}
