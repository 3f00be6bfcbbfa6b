//! Local file access through capability-scoped directory handles.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// Errors raised while reading or writing local files.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FileError {
    /// Raised when the path cannot be split into a directory and file name.
    #[error("invalid path {path}: {message}")]
    InvalidPath {
        /// Offending path.
        path: Utf8PathBuf,
        /// Description of the problem.
        message: String,
    },
    /// Raised when an I/O operation fails.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that was accessed.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

/// Reads a UTF-8 file. Relative paths resolve against the working directory.
///
/// # Errors
///
/// Returns [`FileError`] when the file cannot be opened or read.
pub fn read_to_string(path: &Utf8Path) -> Result<String, FileError> {
    let (dir_path, file_name) = split(path)?;
    let dir = open_dir(dir_path)?;
    dir.read_to_string(file_name).map_err(|err| FileError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Writes `contents` to `path` readable only by the owner, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`FileError`] when the directory cannot be created or the file
/// cannot be written.
pub fn write_private(path: &Utf8Path, contents: &str) -> Result<(), FileError> {
    let (dir_path, file_name) = split(path)?;
    Dir::create_ambient_dir_all(dir_path, ambient_authority()).map_err(|err| FileError::Io {
        path: dir_path.to_path_buf(),
        message: err.to_string(),
    })?;
    let dir = open_dir(dir_path)?;
    dir.write(file_name, contents).map_err(|err| FileError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    restrict_to_owner(&dir, file_name).map_err(|err| FileError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(unix)]
fn restrict_to_owner(dir: &Dir, file_name: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = cap_std::fs::Permissions::from_std(std::fs::Permissions::from_mode(0o600));
    dir.set_permissions(file_name, permissions)
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &Dir, _file_name: &str) -> std::io::Result<()> {
    Ok(())
}

fn split(path: &Utf8Path) -> Result<(&Utf8Path, &str), FileError> {
    let file_name = path.file_name().ok_or_else(|| FileError::InvalidPath {
        path: path.to_path_buf(),
        message: String::from("path has no file name"),
    })?;
    let dir_path = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    Ok((dir_path, file_name))
}

fn open_dir(dir_path: &Utf8Path) -> Result<Dir, FileError> {
    Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| FileError::Io {
        path: dir_path.to_path_buf(),
        message: err.to_string(),
    })
}
