use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// A caller-supplied description of a single stdio slot, as extracted from the host.
#[derive(Debug)]
pub enum StdioValue {
    /// A keyword, e.g., `inherit` or `pipe`.
    Keyword(String),
    /// A file descriptor number.
    Integer(i64),
    /// An immutable source of bytes.
    Bytes(ByteSource),
    /// A path to open at spawn time.
    Path(PathBuf),
    /// A body that may not be materialized yet.
    Stream(BodySource),
}

impl StdioValue {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::Keyword(keyword.into())
    }

    /// In-memory bytes, copied out of `bytes`.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::Bytes(ByteSource::Memory(Arc::from(bytes.as_ref())))
    }
}

impl From<PathBuf> for StdioValue {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// An immutable byte source.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// Bytes held in memory; the [`Arc`] keeps the host's allocation alive.
    Memory(Arc<[u8]>),
    /// Bytes that already live on disk.
    File(FileSource),
}

/// Where a file-backed byte source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Descriptor(i64),
}

/// A request or response body, which may still be streaming.
pub enum BodySource {
    /// The body is complete and can be read synchronously.
    Buffered(Arc<[u8]>),
    /// The body is read lazily from a file.
    File(FileSource),
    /// The body is produced chunk by chunk.
    Live(Box<dyn Read + Send>),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Self::File(source) => f.debug_tuple("File").field(source).finish(),
            Self::Live(_) => f.write_str("Live(..)"),
        }
    }
}
