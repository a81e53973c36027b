//! Backing stdio slots with anonymous memory files.
//!
//! When a child's input is fully known up front, writing it into a memory file and handing the
//! child the descriptor avoids keeping a pipe open and feeding it while the child runs. The same
//! trick lets a synchronous spawn collect output without draining a pipe concurrently. Both are
//! optimizations: if anything goes wrong, the slot keeps its original spec and is piped.

use std::io;

use tracing::debug;

use crate::{OwnedDescriptor, Slot, StreamSpec};

/// Returns `true` if this platform can create anonymous memory files.
pub(crate) const fn memfd_supported() -> bool {
    #[cfg(unix)]
    {
        procio_unix::memfd_supported()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// An anonymous memory file holding the payload of a stdio slot.
///
/// Only constructed by [`StreamSpec::use_memory_backed_buffer`].
#[cfg(any(target_os = "linux", target_os = "android"))]
#[derive(Debug)]
pub struct MemoryFile(std::os::fd::OwnedFd);

/// An anonymous memory file holding the payload of a stdio slot.
///
/// This platform has no anonymous memory files, so no value of this type can exist.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[derive(Debug)]
pub enum MemoryFile {}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl MemoryFile {
    /// Duplicate the descriptor; both copies share the same file and offset.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self(self.0.try_clone()?))
    }

    /// Read the entire file, from the start.
    pub fn read_back(self) -> io::Result<Vec<u8>> {
        use std::io::{Read, Seek, SeekFrom};

        let mut file = std::fs::File::from(self.0);
        file.seek(SeekFrom::Start(0))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    pub fn into_descriptor(self) -> OwnedDescriptor {
        self.0
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl MemoryFile {
    pub fn try_clone(&self) -> io::Result<Self> {
        match *self {}
    }

    pub fn read_back(self) -> io::Result<Vec<u8>> {
        match self {}
    }

    pub fn into_descriptor(self) -> OwnedDescriptor {
        match self {}
    }
}

impl StreamSpec {
    /// Returns `true` if this slot may be backed by an anonymous memory file.
    ///
    /// In-memory buffers always qualify. A pipe only qualifies for a synchronous spawn, where the
    /// parent reads the child's output after it exits rather than while it runs. A spec that is
    /// already a memory file has nothing left to convert.
    pub fn can_use_memory_backed_buffer(&self, is_sync: bool) -> bool {
        if !memfd_supported() {
            return false;
        }
        match self {
            Self::Buffer(_) => true,
            Self::Pipe => is_sync,
            _ => false,
        }
    }

    /// Replace this spec with an anonymous memory file holding its payload.
    ///
    /// Returns `false`, leaving the spec untouched, if the spec has no payload to move or the file
    /// could not be created and filled.
    pub fn use_memory_backed_buffer(&mut self, slot: Slot) -> bool {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            self.use_memory_file(slot, procio_unix::create_memfd)
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            debug!("Memory files are not supported on this platform; piping {slot}");
            false
        }
    }

    /// Move the payload into the file returned by `create`, given the slot's label and payload.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn use_memory_file(
        &mut self,
        slot: Slot,
        create: impl FnOnce(&str, &[u8]) -> Result<OwnedDescriptor, procio_unix::MemfdError>,
    ) -> bool {
        let contents: &[u8] = match &*self {
            Self::Buffer(bytes) => bytes,
            Self::Pipe => &[],
            _ => return false,
        };
        let len = contents.len();
        match create(slot.memfd_label(), contents) {
            Ok(fd) => {
                debug!("Using a memory file for {slot} ({len} bytes)");
                *self = Self::Memfd(MemoryFile(fd));
                true
            }
            Err(err) => {
                debug!("Falling back to a pipe for {slot}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    use test_case::test_case;

    use super::*;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test_case(1; "one byte")]
    #[test_case(5; "small")]
    #[test_case(4096; "page")]
    #[test_case(65_537; "larger than a pipe buffer")]
    #[test_case(4 * 1024 * 1024; "several megabytes")]
    fn buffer_round_trips_through_memory_file(len: usize) {
        let payload: Arc<[u8]> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut spec = StreamSpec::Buffer(Arc::clone(&payload));
        assert!(spec.can_use_memory_backed_buffer(false));
        assert!(spec.use_memory_backed_buffer(Slot::STDIN));

        let StreamSpec::Memfd(file) = spec else {
            panic!("expected a memory file");
        };
        let contents = file.read_back().unwrap();
        assert_eq!(contents.len(), len);
        assert!(*contents == *payload);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn buffer_is_released_once() {
        let payload: Arc<[u8]> = Arc::from(&b"hello"[..]);
        let mut spec = StreamSpec::Buffer(Arc::clone(&payload));
        assert_eq!(Arc::strong_count(&payload), 2);

        assert!(spec.use_memory_backed_buffer(Slot::STDIN));
        assert_eq!(Arc::strong_count(&payload), 1);

        // A memory file is not converted again, and the buffer is not touched.
        assert!(!spec.can_use_memory_backed_buffer(true));
        assert!(!spec.use_memory_backed_buffer(Slot::STDIN));
        assert!(matches!(spec, StreamSpec::Memfd(_)));
        assert_eq!(Arc::strong_count(&payload), 1);
        drop(spec);
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn pipe_becomes_empty_memory_file() {
        let mut spec = StreamSpec::Pipe;
        assert!(spec.can_use_memory_backed_buffer(true));
        assert!(!spec.can_use_memory_backed_buffer(false));
        assert!(spec.use_memory_backed_buffer(Slot::STDOUT));

        let StreamSpec::Memfd(file) = spec else {
            panic!("expected a memory file");
        };
        assert!(file.read_back().unwrap().is_empty());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn clones_share_contents() {
        use std::io::Write;

        let mut spec = StreamSpec::Pipe;
        assert!(spec.use_memory_backed_buffer(Slot::STDOUT));
        let StreamSpec::Memfd(file) = spec else {
            panic!("expected a memory file");
        };
        let reader = file.try_clone().unwrap();

        // Stand in for a child writing to its stdout.
        let mut writer = std::fs::File::from(file.into_descriptor());
        writer.write_all(b"output").unwrap();
        drop(writer);

        assert_eq!(reader.read_back().unwrap(), b"output");
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn failed_creation_keeps_the_buffer() {
        let payload: Arc<[u8]> = Arc::from(&b"hello"[..]);
        let mut spec = StreamSpec::Buffer(Arc::clone(&payload));

        let converted = spec.use_memory_file(Slot::STDIN, |label, contents| {
            assert_eq!(label, "stdin");
            assert_eq!(contents, b"hello");
            Err(procio_unix::MemfdError::Create {
                label: label.to_string(),
                err: io::Error::from_raw_os_error(24),
            })
        });

        assert!(!converted);
        assert!(matches!(spec, StreamSpec::Buffer(_)));
        assert_eq!(spec.byte_slice(), b"hello");
        assert_eq!(Arc::strong_count(&payload), 2);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn failed_write_keeps_the_pipe() {
        let mut spec = StreamSpec::Pipe;
        let converted = spec.use_memory_file(Slot::STDOUT, |label, _| {
            Err(procio_unix::MemfdError::WriteZero {
                label: label.to_string(),
                offset: 0,
            })
        });
        assert!(!converted);
        assert!(matches!(spec, StreamSpec::Pipe));
    }

    #[test]
    fn ineligible_specs_are_untouched() {
        let mut spec = StreamSpec::Capture(b"partial".to_vec());
        assert!(!spec.can_use_memory_backed_buffer(true));
        assert!(!spec.use_memory_backed_buffer(Slot::STDOUT));
        assert_eq!(spec.byte_slice(), b"partial");

        let mut spec = StreamSpec::Inherit;
        assert!(!spec.can_use_memory_backed_buffer(true));
        assert!(!spec.use_memory_backed_buffer(Slot::STDIN));
        assert!(matches!(spec, StreamSpec::Inherit));
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    #[test]
    fn unsupported_platform_never_uses_memory_files() {
        let mut spec = StreamSpec::Buffer(Arc::from(&b"hello"[..]));
        assert!(!spec.can_use_memory_backed_buffer(true));
        assert!(!spec.can_use_memory_backed_buffer(false));
        assert!(!StreamSpec::Pipe.can_use_memory_backed_buffer(true));
        assert!(!spec.use_memory_backed_buffer(Slot::STDIN));
        assert_eq!(spec.byte_slice(), b"hello");
    }
}
