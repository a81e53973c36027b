//! Projection of a [`StreamSpec`] onto the options a spawn call accepts.
//!
//! Projection never allocates: every descriptor it hands out was created (or duplicated) when the
//! spec was resolved, and pipes are created by the launcher that consumes the result.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{OwnedDescriptor, Slot, StreamSpec};

#[cfg(not(windows))]
mod posix;
#[cfg(windows)]
mod windows;

/// The concrete backing of a single slot, as consumed by a process launcher.
#[derive(Debug)]
pub enum SpawnStdio {
    /// Share the parent's descriptor.
    Inherit,
    /// Connect the slot to the null device.
    Ignore,
    /// Open this file for the slot.
    Path(PathBuf),
    /// Hand this descriptor to the child.
    Descriptor(OwnedDescriptor),
    /// Create a pipe, and service the parent's end as described.
    Pipe(PipeTransfer),
    /// Create a pipe whose parent end supports overlapped I/O.
    #[cfg(windows)]
    OverlappedPipe(PipeTransfer),
}

/// What the parent does with its end of a pipe.
pub enum PipeTransfer {
    /// Read the child's output.
    Read,
    /// Keep the write end, to feed the child's input.
    Write,
    /// Drain the child's output into this buffer.
    Capture(Vec<u8>),
    /// Write these bytes to the child, then close the pipe.
    Buffer(Arc<[u8]>),
    /// Copy this stream to the child, then close the pipe.
    Stream(Box<dyn Read + Send>),
}

impl PipeTransfer {
    /// The transfer for a plain pipe on `slot`.
    fn for_slot(slot: Slot) -> Self {
        if slot.is_input() {
            Self::Write
        } else {
            Self::Read
        }
    }
}

impl fmt::Debug for PipeTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("Read"),
            Self::Write => f.write_str("Write"),
            Self::Capture(buffer) => f.debug_tuple("Capture").field(&buffer.len()).finish(),
            Self::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Per-slot projection options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Use an overlapped pipe, where the platform distinguishes one.
    pub overlapped: bool,
}

impl StreamSpec {
    /// Project this spec for `slot`, consuming it.
    ///
    /// Any descriptor the spec owns moves into the result.
    pub fn project(self, slot: Slot, options: ProjectOptions) -> SpawnStdio {
        #[cfg(not(windows))]
        {
            posix::project(self, slot, options)
        }
        #[cfg(windows)]
        {
            windows::project(self, slot, options)
        }
    }
}
