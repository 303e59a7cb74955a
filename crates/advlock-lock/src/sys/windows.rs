//! `LockFileEx` backend.

use std::fs::File;
use std::io;
use std::os::windows::io::AsRawHandle;

use winapi::shared::minwindef::DWORD;
use winapi::shared::winerror::{ERROR_IO_PENDING, ERROR_LOCK_VIOLATION};
use winapi::um::fileapi::{LockFileEx, UnlockFileEx};
use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, OVERLAPPED};

use crate::state::LockMode;

// Lock the largest possible byte range so the whole file is covered.
const RANGE_LOW: DWORD = DWORD::MAX;
const RANGE_HIGH: DWORD = DWORD::MAX;

fn flags(mode: LockMode) -> DWORD {
    match mode {
        LockMode::Shared => 0,
        LockMode::Exclusive => LOCKFILE_EXCLUSIVE_LOCK,
    }
}

fn lock_file_ex(file: &File, flags: DWORD) -> io::Result<()> {
    // SAFETY: the handle is owned by `file`; OVERLAPPED is zero-initialised
    // and lives for the duration of the synchronous call.
    let rc = unsafe {
        let mut overlapped: OVERLAPPED = std::mem::zeroed();
        LockFileEx(
            file.as_raw_handle().cast(),
            flags,
            0,
            RANGE_LOW,
            RANGE_HIGH,
            &mut overlapped,
        )
    };
    if rc == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn is_contended(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(code) if code == ERROR_LOCK_VIOLATION as i32 || code == ERROR_IO_PENDING as i32
    )
}

pub(crate) fn try_lock(file: &File, mode: LockMode) -> io::Result<bool> {
    match lock_file_ex(file, flags(mode) | LOCKFILE_FAIL_IMMEDIATELY) {
        Ok(()) => Ok(true),
        Err(err) if is_contended(&err) => Ok(false),
        Err(err) => Err(err),
    }
}

pub(crate) fn lock(file: &File, mode: LockMode) -> io::Result<()> {
    lock_file_ex(file, flags(mode))
}

pub(crate) fn unlock(file: &File) -> io::Result<()> {
    // SAFETY: see `lock_file_ex`.
    let rc = unsafe {
        let mut overlapped: OVERLAPPED = std::mem::zeroed();
        UnlockFileEx(
            file.as_raw_handle().cast(),
            0,
            RANGE_LOW,
            RANGE_HIGH,
            &mut overlapped,
        )
    };
    if rc == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
