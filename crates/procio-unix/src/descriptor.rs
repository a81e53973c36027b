use std::os::fd::{BorrowedFd, OwnedFd, RawFd};

use rustix::io::fcntl_dupfd_cloexec;

/// Duplicate a raw descriptor number supplied by a caller into a descriptor we own.
///
/// The duplicate is close-on-exec; the spawn call decides which copies reach the child. Fails
/// with `EBADF` if `fd` is not open in this process.
#[allow(unsafe_code)]
pub fn duplicate_fd(fd: RawFd) -> std::io::Result<OwnedFd> {
    if fd < 0 {
        return Err(rustix::io::Errno::BADF.into());
    }
    // SAFETY: The borrow lives only for the duration of the `fcntl` call, which takes no
    // ownership and reports `EBADF` for a descriptor that is not open.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    Ok(fcntl_dupfd_cloexec(borrowed, 0)?)
}
