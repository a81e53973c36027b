use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{MemoryFile, OwnedDescriptor};

/// How a single stdio slot of a child process is backed.
///
/// Variants that carry a descriptor own it: dropping the spec closes it, and projecting the spec
/// moves it into the spawn options.
#[derive(Default)]
pub enum StreamSpec {
    /// Share the parent's descriptor for this slot.
    #[default]
    Inherit,
    /// Redirect to the null device.
    Ignore,
    /// Use an open descriptor supplied by the caller.
    Fd(OwnedDescriptor),
    /// Open a file at spawn time.
    Path(PathBuf),
    /// Create a pipe; the parent keeps the other end.
    Pipe,
    /// Create a pipe and drain the child's end into this buffer.
    Capture(Vec<u8>),
    /// Feed these bytes to the child.
    Buffer(Arc<[u8]>),
    /// Feed a live stream to the child.
    Body(Box<dyn Read + Send>),
    /// Feed the child from an anonymous memory file.
    Memfd(MemoryFile),
}

impl StreamSpec {
    /// Returns `true` if the launcher must create a pipe for this slot.
    pub fn is_piped(&self) -> bool {
        matches!(
            self,
            Self::Pipe | Self::Capture(_) | Self::Buffer(_) | Self::Body(_)
        )
    }

    /// The bytes carried by this spec, if any.
    pub fn byte_slice(&self) -> &[u8] {
        match self {
            Self::Buffer(bytes) => bytes,
            Self::Capture(buffer) => buffer,
            _ => &[],
        }
    }
}

impl fmt::Debug for StreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("Inherit"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Fd(fd) => f.debug_tuple("Fd").field(fd).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Pipe => f.write_str("Pipe"),
            Self::Capture(buffer) => f.debug_tuple("Capture").field(&buffer.len()).finish(),
            Self::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Self::Body(_) => f.write_str("Body(..)"),
            Self::Memfd(file) => f.debug_tuple("Memfd").field(file).finish(),
        }
    }
}
