//! OS advisory-lock primitives.
//!
//! Each backend exposes the same operations on an open [`File`]:
//! non-blocking shared/exclusive attempts (`try_lock`, where `Ok(false)` means
//! the lock is held elsewhere), their blocking counterparts (`lock`), and
//! `unlock`.
//!
//! | Target | Backend |
//! |--------|---------|
//! | AIX, Solaris, illumos | `fcntl(F_SETLK/F_SETLKW)` whole-file record locks |
//! | other unix | `flock(2)` |
//! | windows | `LockFileEx` / `UnlockFileEx` |
//!
//! The record-lock backend follows POSIX semantics: locks belong to the
//! process, not the descriptor, and closing *any* descriptor for the inode
//! drops every lock the process holds on it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(any(target_os = "aix", target_os = "solaris", target_os = "illumos"))]
mod fcntl;
#[cfg(any(target_os = "aix", target_os = "solaris", target_os = "illumos"))]
pub(crate) use fcntl::{lock, try_lock, unlock};

#[cfg(all(
    unix,
    not(any(target_os = "aix", target_os = "solaris", target_os = "illumos"))
))]
mod unix;
#[cfg(all(
    unix,
    not(any(target_os = "aix", target_os = "solaris", target_os = "illumos"))
))]
pub(crate) use unix::{lock, try_lock, unlock};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::{lock, try_lock, unlock};

/// Whether exclusive locks need a writable descriptor on this target.
///
/// AIX refuses a write lock through a read-only descriptor. Windows cannot
/// create a file through a read-only open, so it is listed here too.
pub const REQUIRES_WRITABLE_DESCRIPTOR: bool = cfg!(any(target_os = "aix", windows));

/// Default permission bits for a newly created lock file.
pub const DEFAULT_PERMISSIONS: u32 = 0o600;

/// Open `path` for locking, creating it if absent.
///
/// The file's contents are never read or written.
#[cfg(unix)]
pub(crate) fn open(path: &Path, read_write: bool, permissions: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.read(true).mode(permissions);
    if read_write {
        options.write(true).create(true).truncate(false);
    } else {
        // std refuses `create` without write access, so ask for O_CREAT directly.
        options.custom_flags(libc::O_CREAT);
    }
    options.open(path)
}

#[cfg(windows)]
pub(crate) fn open(path: &Path, _read_write: bool, _permissions: u32) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// Errors after which a read-only descriptor should be reopened read-write
/// and the lock attempted again. Some network filesystems reject locks on
/// read-only descriptors with `EIO` or `EBADF`.
#[cfg(unix)]
pub(crate) fn wants_read_write_reopen(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EIO || code == libc::EBADF)
}

#[cfg(windows)]
pub(crate) fn wants_read_write_reopen(_err: &io::Error) -> bool {
    false
}
