//! Scoped advisory locks for archive files.
//!
//! Each archive `F` is guarded by two sibling lock files, `F.readlock` and
//! `F.writelock`. Readers hold a shared lock on `F.readlock`. Writers first
//! take `F.writelock` exclusively (one writer at a time) and then
//! `F.readlock` exclusively, which waits out active readers and keeps new
//! ones away until the write is finished. Locks are released when the guard
//! is dropped.
//!
//! These locks only coordinate separate processes. Two guards taken inside the
//! same process on the same archive are not serialized against each other.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, trace};

use crate::constants::{READ_LOCK_SUFFIX, WRITE_LOCK_SUFFIX};

/// Path of the sibling file `archive` + `suffix`.
#[must_use]
pub fn sibling_path(archive: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// One held advisory lock on a lock file.
#[derive(Debug)]
struct HeldLock {
    file: File,
    path: PathBuf,
}

impl HeldLock {
    fn acquire(path: PathBuf, exclusive: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        trace!(path = %path.display(), exclusive, "Acquired archive lock");

        Ok(Self { file, path })
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "Failed to release archive lock");
        } else {
            trace!(path = %self.path.display(), "Released archive lock");
        }
    }
}

/// Held while an archive is being read.
#[derive(Debug)]
pub struct ReadGuard {
    _read: HeldLock,
}

/// Held while an archive is being written.
#[derive(Debug)]
pub struct WriteGuard {
    // Field order is drop order: readers are let back in before the next writer.
    _read: HeldLock,
    _write: HeldLock,
}

/// Block until `archive` may be read.
///
/// # Errors
///
/// Returns an error if the lock file cannot be opened or locked.
pub fn read_lock(archive: &Path) -> io::Result<ReadGuard> {
    Ok(ReadGuard {
        _read: HeldLock::acquire(sibling_path(archive, READ_LOCK_SUFFIX), false)?,
    })
}

/// Block until `archive` may be written.
///
/// # Errors
///
/// Returns an error if either lock file cannot be opened or locked.
pub fn write_lock(archive: &Path) -> io::Result<WriteGuard> {
    let write = HeldLock::acquire(sibling_path(archive, WRITE_LOCK_SUFFIX), true)?;
    let read = HeldLock::acquire(sibling_path(archive, READ_LOCK_SUFFIX), true)?;
    Ok(WriteGuard {
        _read: read,
        _write: write,
    })
}

/// Release both locks of `archive` by removing their lock files.
///
/// Missing lock files are not an error.
///
/// # Errors
///
/// Returns an error if a lock file exists but cannot be removed.
pub fn release_locks(archive: &Path) -> io::Result<()> {
    for suffix in [READ_LOCK_SUFFIX, WRITE_LOCK_SUFFIX] {
        let path = sibling_path(archive, suffix);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed lock file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
