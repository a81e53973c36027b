//! Anonymous memory files.
//!
//! A memory file lets us hand a complete, already-known payload to a child process as a plain
//! file descriptor, rather than keeping a pipe open and feeding it from the parent while the child
//! runs. Only Linux (and Android) expose `memfd_create`; elsewhere [`memfd_supported`] is `false`
//! and callers keep using pipes.

/// Returns `true` if anonymous memory files can be created on this platform.
pub const fn memfd_supported() -> bool {
    cfg!(any(target_os = "linux", target_os = "android"))
}

#[derive(Debug, thiserror::Error)]
pub enum MemfdError {
    #[error("Failed to create memory file `{label}`")]
    Create {
        label: String,
        #[source]
        err: std::io::Error,
    },
    #[error("Failed to write {len} bytes to memory file `{label}` at offset {offset}")]
    Write {
        label: String,
        offset: u64,
        len: usize,
        #[source]
        err: std::io::Error,
    },
    #[error("Memory file `{label}` accepted zero bytes at offset {offset}")]
    WriteZero { label: String, offset: u64 },
}

/// Create an anonymous memory file named `label` holding exactly `contents`.
///
/// The payload is written with positional writes, so the file offset is left at zero and a
/// child that inherits the descriptor reads the payload from the start.
///
/// On any failure the partially written file is closed before the error is returned.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn create_memfd(label: &str, contents: &[u8]) -> Result<std::os::fd::OwnedFd, MemfdError> {
    use rustix::fs::{MemfdFlags, ftruncate, memfd_create};
    use tracing::trace;

    let fd = memfd_create(label, MemfdFlags::CLOEXEC).map_err(|errno| MemfdError::Create {
        label: label.to_string(),
        err: errno.into(),
    })?;

    if !contents.is_empty() {
        // Only a hint; the writes below grow the file regardless.
        if let Err(errno) = ftruncate(&fd, contents.len() as u64) {
            trace!("Failed to pre-size memory file `{label}`: {errno}");
        }
    }

    let written = write_all_at(label, contents, |chunk, offset| {
        rustix::io::pwrite(&fd, chunk, offset)
    })?;
    trace!("Wrote {written} bytes to memory file `{label}`");
    Ok(fd)
}

/// Write all of `contents` from offset zero with `write_at`, retrying only when it would block.
///
/// Returns the number of bytes written.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn write_all_at(
    label: &str,
    contents: &[u8],
    mut write_at: impl FnMut(&[u8], u64) -> rustix::io::Result<usize>,
) -> Result<u64, MemfdError> {
    use rustix::io::Errno;

    let mut remaining = contents;
    let mut offset = 0u64;
    while !remaining.is_empty() {
        match write_at(remaining, offset) {
            Ok(0) => {
                return Err(MemfdError::WriteZero {
                    label: label.to_string(),
                    offset,
                });
            }
            Ok(written) => {
                offset += written as u64;
                remaining = &remaining[written..];
            }
            Err(errno) if errno == Errno::AGAIN => {}
            Err(errno) => {
                return Err(MemfdError::Write {
                    label: label.to_string(),
                    offset,
                    len: remaining.len(),
                    err: errno.into(),
                });
            }
        }
    }
    Ok(offset)
}
