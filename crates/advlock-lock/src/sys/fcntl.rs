//! POSIX record-lock backend for targets without BSD `flock(2)` semantics.
//!
//! Locks cover the whole file (`l_start = 0`, `l_len = 0`). They are owned by
//! the process: two descriptors of one process never contend, and closing
//! either one releases the lock for both.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

use crate::state::LockMode;

fn set_lock(file: &File, lock_type: libc::c_short, cmd: libc::c_int) -> io::Result<()> {
    // SAFETY: `libc::flock` is a plain C struct; all-zero is a valid value.
    let mut request: libc::flock = unsafe { std::mem::zeroed() };
    request.l_type = lock_type;
    request.l_whence = libc::SEEK_SET as libc::c_short;
    request.l_start = 0;
    request.l_len = 0;

    loop {
        // SAFETY: valid descriptor and a fully initialised request struct.
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), cmd, &request as *const libc::flock) };
        if rc != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn lock_type(mode: LockMode) -> libc::c_short {
    match mode {
        LockMode::Shared => libc::F_RDLCK as libc::c_short,
        LockMode::Exclusive => libc::F_WRLCK as libc::c_short,
    }
}

fn is_contended(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EACCES || code == libc::EAGAIN)
}

pub(crate) fn try_lock(file: &File, mode: LockMode) -> io::Result<bool> {
    match set_lock(file, lock_type(mode), libc::F_SETLK) {
        Ok(()) => Ok(true),
        Err(err) if is_contended(&err) => Ok(false),
        Err(err) => Err(err),
    }
}

pub(crate) fn lock(file: &File, mode: LockMode) -> io::Result<()> {
    set_lock(file, lock_type(mode), libc::F_SETLKW)
}

pub(crate) fn unlock(file: &File) -> io::Result<()> {
    set_lock(file, libc::F_UNLCK as libc::c_short, libc::F_SETLK)
}
