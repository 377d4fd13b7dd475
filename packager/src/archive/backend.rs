//! Archive writers.
//!
//! Two backends produce the same layout: a gzip-compressed tarball whose
//! entries are stored under the repository subpath and owned by uid/gid 0.
//! [`TarToolBackend`] shells out to the system `tar`; [`NativeBackend`]
//! builds the archive in-process with the `tar` and `flate2` crates.

use crate::config::PackagingConfig;
use crate::error::{PackagerError, Result};
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::tool::resolve_tool;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};

/// Selects the archive writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Run the system `tar`.
    #[default]
    Tool,
    /// Build the archive in-process.
    Native,
}

/// One archive to write.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRequest<'a> {
    /// Directory entry paths are relative to.
    pub working_dir: &'a Utf8Path,
    /// Subtree to archive, relative to `working_dir`.
    pub source: &'a Utf8Path,
    /// Output file, relative to `working_dir`.
    pub destination: &'a Utf8Path,
}

/// Writes gzip-compressed tar archives.
pub trait ArchiveBackend {
    /// Write the archive described by `request`, returning the writer's
    /// textual output.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be written.
    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<String>;
}

/// Pick the backend configured by `archive_backend`.
///
/// # Errors
///
/// Returns [`PackagerError::ToolNotFound`] when the tool backend is selected
/// and `tar` cannot be resolved.
pub fn backend_for(config: &PackagingConfig) -> Result<Box<dyn ArchiveBackend>> {
    match config.archive_backend {
        BackendKind::Tool => {
            let tar = resolve_tool("tar", config.tar_path.as_deref())?;
            log::debug!("archiving with {tar}");
            Ok(Box::new(TarToolBackend::new(SystemCommandExecutor::default(), tar)))
        }
        BackendKind::Native => Ok(Box::new(NativeBackend)),
    }
}

/// Archive writer that runs an external `tar`.
#[derive(Debug)]
pub struct TarToolBackend<E = SystemCommandExecutor> {
    executor: E,
    tar: Utf8PathBuf,
}

impl<E: CommandExecutor> TarToolBackend<E> {
    /// Use the `tar` at `tar` through `executor`.
    pub fn new(executor: E, tar: Utf8PathBuf) -> Self {
        Self { executor, tar }
    }

    /// Arguments passed to `tar` for `request`.
    #[must_use]
    pub fn tar_args(request: &ArchiveRequest<'_>) -> Vec<String> {
        vec![
            "--owner=0".to_owned(),
            "--group=0".to_owned(),
            "--create".to_owned(),
            "--gzip".to_owned(),
            "--file".to_owned(),
            request.destination.to_string(),
            request.source.to_string(),
        ]
    }
}

impl<E: CommandExecutor> ArchiveBackend for TarToolBackend<E> {
    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<String> {
        let args = Self::tar_args(request);
        let output = self
            .executor
            .run(self.tar.as_str(), &args, Some(request.working_dir))
            .map_err(|source| PackagerError::ToolInvocation {
                tool: self.tar.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PackagerError::ArchiveTool {
                tool: self.tar.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// In-process archive writer.
///
/// Entries are appended in sorted order with deterministic headers, so the
/// same tree always produces the same bytes. Symbolic links are stored as
/// links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl ArchiveBackend for NativeBackend {
    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<String> {
        let file = fs::File::create(request.working_dir.join(request.destination))?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.mode(tar::HeaderMode::Deterministic);
        builder.follow_symlinks(false);

        let mut listing = Vec::new();
        append_tree(&mut builder, request.working_dir, request.source, &mut listing)?;

        let encoder = builder.into_inner()?;
        encoder.finish()?.sync_all()?;
        Ok(listing.join("\n"))
    }
}

fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    root: &Utf8Path,
    relative: &Utf8Path,
    listing: &mut Vec<String>,
) -> io::Result<()> {
    let full = root.join(relative);
    let metadata = fs::symlink_metadata(&full)?;
    if !metadata.is_dir() {
        builder.append_path_with_name(&full, relative)?;
        listing.push(relative.to_string());
        return Ok(());
    }

    builder.append_dir(relative, &full)?;
    listing.push(relative.to_string());

    let mut children = fs::read_dir(&full)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    for child in children {
        let name = child.into_string().map_err(|name| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non UTF-8 file name {} under {full}", name.to_string_lossy()),
            )
        })?;
        append_tree(builder, root, &relative.join(name), listing)?;
    }
    Ok(())
}
