use std::path::PathBuf;
use std::str::FromStr;

use procio_stdio::{BodySource, ByteSource, FileSource, StdioValue};

/// A stdio value as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StdioArg {
    /// A bare word, e.g., `inherit`. Unknown words are left for the resolver to reject.
    Keyword(String),
    /// A file descriptor number.
    Descriptor(i64),
    /// `text:<TEXT>`
    Text(String),
    /// `file:<PATH>`
    File(PathBuf),
    /// `path:<PATH>`
    Path(PathBuf),
    /// `body:<PATH>`
    Body(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum StdioArgError {
    #[error("Expected a path after `{0}:`")]
    MissingPath(&'static str),
    #[error("File descriptor `{0}` does not fit in a 64-bit integer")]
    OutOfRange(String),
}

impl FromStr for StdioArg {
    type Err = StdioArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(text) = s.strip_prefix("text:") {
            return Ok(Self::Text(text.to_string()));
        }
        if let Some(path) = s.strip_prefix("file:") {
            return required_path("file", path).map(Self::File);
        }
        if let Some(path) = s.strip_prefix("path:") {
            return required_path("path", path).map(Self::Path);
        }
        if let Some(path) = s.strip_prefix("body:") {
            return required_path("body", path).map(Self::Body);
        }
        if is_integer(s) {
            return s
                .parse()
                .map(Self::Descriptor)
                .map_err(|_| StdioArgError::OutOfRange(s.to_string()));
        }
        Ok(Self::Keyword(s.to_string()))
    }
}

impl StdioArg {
    /// Convert into the value handed to the resolver, opening any streamed body.
    pub(crate) fn into_value(self) -> anyhow::Result<StdioValue> {
        Ok(match self {
            Self::Keyword(keyword) => StdioValue::Keyword(keyword),
            Self::Descriptor(fd) => StdioValue::Integer(fd),
            Self::Text(text) => StdioValue::bytes(text),
            Self::File(path) => StdioValue::Bytes(ByteSource::File(FileSource::Path(path))),
            Self::Path(path) => StdioValue::Path(path),
            Self::Body(path) => {
                let file = fs_err::File::open(path)?;
                StdioValue::Stream(BodySource::Live(Box::new(file)))
            }
        })
    }
}

fn required_path(prefix: &'static str, path: &str) -> Result<PathBuf, StdioArgError> {
    if path.is_empty() {
        Err(StdioArgError::MissingPath(prefix))
    } else {
        Ok(PathBuf::from(path))
    }
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}
