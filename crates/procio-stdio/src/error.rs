use std::fmt;

use crate::Slot;

/// A stdio value that cannot back the slot it was given for.
#[derive(Debug, thiserror::Error)]
pub enum StdioError {
    #[error(
        "`{keyword}` is not a valid option for {slot}; expected `inherit`, `ignore`, `pipe`, a file descriptor, a path, or a byte buffer"
    )]
    InvalidKeyword { slot: Slot, keyword: String },

    #[error("File descriptor for {slot} must be a non-negative integer, received: {fd}")]
    NegativeDescriptor { slot: Slot, fd: i64 },

    #[error("File descriptor for {slot} must be a valid integer, received: {fd}")]
    DescriptorOutOfRange { slot: Slot, fd: i64 },

    #[error("stdin cannot be used for {slot}")]
    StdinAsOutput { slot: Slot },

    #[error("{stream} cannot be used for stdin")]
    OutputAsStdin { stream: Slot },

    #[error("Byte buffers are immutable and cannot be used for {slot}")]
    ImmutableOutput { slot: Slot },

    #[error("Byte buffer for {slot} is empty")]
    EmptyBuffer { slot: Slot },

    #[error("Streaming {kind} bodies are not yet supported for {slot}")]
    UnsupportedStream {
        slot: Slot,
        kind: UnsupportedStreamKind,
    },

    #[error("File descriptor {fd} cannot be used for {slot} on this platform")]
    UnsupportedDescriptor { slot: Slot, fd: i64 },

    #[error("Failed to duplicate file descriptor {fd} for {slot}")]
    Duplicate {
        slot: Slot,
        fd: i64,
        #[source]
        err: std::io::Error,
    },
}

impl StdioError {
    /// The slot the offending value was given for.
    pub fn slot(&self) -> Slot {
        match self {
            Self::InvalidKeyword { slot, .. }
            | Self::NegativeDescriptor { slot, .. }
            | Self::DescriptorOutOfRange { slot, .. }
            | Self::StdinAsOutput { slot }
            | Self::ImmutableOutput { slot }
            | Self::EmptyBuffer { slot }
            | Self::UnsupportedStream { slot, .. }
            | Self::UnsupportedDescriptor { slot, .. }
            | Self::Duplicate { slot, .. } => *slot,
            Self::OutputAsStdin { .. } => Slot::STDIN,
        }
    }
}

/// The kind of streaming body that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedStreamKind {
    /// A body backed by a file or descriptor on disk.
    File,
    /// A body whose chunks are still being produced.
    Live,
}

impl fmt::Display for UnsupportedStreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file-backed"),
            Self::Live => f.write_str("multi-chunk"),
        }
    }
}
