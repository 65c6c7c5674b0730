//! Reading and writing archive files on disk under their advisory locks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::legacy::parse_legacy_posts;
use super::line::ParseError;
use super::lock::{read_lock, release_locks, sibling_path, write_lock};
use super::models::Post;
use super::parser::parse_posts;
use super::serializer::serialize_posts;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed archive {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Read a current-format archive under its read lock.
///
/// # Errors
///
/// Returns an error if the file cannot be locked or read, or is malformed.
pub fn read_posts(path: &Path) -> Result<Vec<Post>, StoreError> {
    let text = {
        let _guard = read_lock(path).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?
    };

    let posts = parse_posts(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), posts = posts.len(), "Read archive");
    Ok(posts)
}

/// Read a legacy archive, repairing its post sequence on the way in.
///
/// Legacy files are no longer written by anything, so no lock is taken.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn read_legacy_posts(path: &Path) -> Result<Vec<Post>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let posts = parse_legacy_posts(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), posts = posts.len(), "Read legacy archive");
    Ok(posts)
}

/// Write `posts` to `path` in the current format under the write lock.
///
/// Missing parent directories are created. The text goes to a sibling
/// temporary file that replaces `path` once complete.
///
/// # Errors
///
/// Returns an error if the directory, lock or file cannot be created.
pub fn write_posts(path: &Path, posts: &[Post]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let text = serialize_posts(posts);
    let tmp_path = sibling_path(path, ".tmp");

    let _guard = write_lock(path).map_err(|source| StoreError::Lock {
        path: path.to_path_buf(),
        source,
    })?;
    if let Err(source) = fs::write(&tmp_path, text).and_then(|()| fs::rename(&tmp_path, path)) {
        discard_temp(&tmp_path);
        return Err(StoreError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!(path = %path.display(), posts = posts.len(), "Wrote archive");
    Ok(())
}

fn discard_temp(tmp_path: &Path) {
    match fs::remove_file(tmp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp_path.display(), error = %e, "Failed to remove temporary archive"),
    }
}

/// Release both locks of `path` and delete the archive itself.
///
/// # Errors
///
/// Returns an error if a lock file or the archive cannot be removed.
pub fn force_remove(path: &Path) -> Result<(), StoreError> {
    release_locks(path).map_err(|source| StoreError::Remove {
        path: path.to_path_buf(),
        source,
    })?;
    fs::remove_file(path).map_err(|source| StoreError::Remove {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Force removed archive");
    Ok(())
}
