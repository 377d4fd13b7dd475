//! Executable resolution.
//!
//! Finds tools such as `tar` and `rsync` on `PATH`, honouring an explicit
//! override when the configuration supplies one.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::OsStr;
use std::io;

/// Resolve `name` to an absolute executable path.
///
/// An `override_path` wins when it points at a file. Otherwise each `PATH`
/// entry is searched in order. Relative results are made absolute against
/// the current directory, so callers may run the tool from elsewhere.
///
/// # Errors
///
/// Returns [`PackagerError::ToolNotFound`] when no executable is found, and
/// [`PackagerError::Io`] if the current directory cannot be read.
pub fn resolve_tool(name: &str, override_path: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    resolve_tool_in(name, override_path, std::env::var_os("PATH").as_deref())
}

/// Resolve `name` against an explicit search path value.
///
/// # Errors
///
/// As for [`resolve_tool`].
pub fn resolve_tool_in(
    name: &str,
    override_path: Option<&Utf8Path>,
    search_path: Option<&OsStr>,
) -> Result<Utf8PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(absolute(path)?);
        }
        log::warn!("configured {name} path {path} is not a file; searching PATH");
    }

    let found = search_path
        .into_iter()
        .flat_map(std::env::split_paths)
        .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| PackagerError::ToolNotFound {
            tool: name.to_owned(),
        })?;
    Ok(absolute(&found)?)
}

/// Anchor a relative path at the current directory. Symlinks stay
/// unresolved.
fn absolute(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let joined = std::path::absolute(path)?;
    Utf8PathBuf::from_path_buf(joined).map_err(|joined| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non UTF-8 tool path {}", joined.display()),
        )
    })
}

#[cfg(unix)]
fn is_executable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Utf8Path) -> bool {
    path.is_file()
}
