use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::UnsupportedStreamKind;
use crate::{
    BodySource, ByteSource, FileSource, Slot, StdStream, StdioError, StdioSet, StdioValue,
    StreamSpec,
};

/// The spec given to a slot that the caller left unset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DefaultStdio {
    #[default]
    Inherit,
    Ignore,
    Pipe,
}

impl From<DefaultStdio> for StreamSpec {
    fn from(default: DefaultStdio) -> Self {
        match default {
            DefaultStdio::Inherit => Self::Inherit,
            DefaultStdio::Ignore => Self::Ignore,
            DefaultStdio::Pipe => Self::Pipe,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    /// Accept live streaming bodies for stdin, feeding them through a pipe.
    ///
    /// When disabled, live bodies are rejected with [`StdioError::UnsupportedStream`].
    pub streaming_stdin: bool,
    /// Specs for `stdin`, `stdout`, and `stderr` when left unset. Unset extra slots are ignored.
    pub defaults: [DefaultStdio; 3],
}

/// A resolved slot, along with whether the caller asked for an overlapped pipe.
struct Resolved {
    spec: StreamSpec,
    overlapped: bool,
}

impl From<StreamSpec> for Resolved {
    fn from(spec: StreamSpec) -> Self {
        Self {
            spec,
            overlapped: false,
        }
    }
}

/// Validates caller-supplied stdio values against the slots they are given for.
#[derive(Debug, Default, Clone)]
pub struct StdioResolver {
    options: ResolveOptions,
}

impl StdioResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Resolve a single slot.
    pub fn resolve(&self, slot: Slot, value: StdioValue) -> Result<StreamSpec, StdioError> {
        self.resolve_slot(slot, value).map(|resolved| resolved.spec)
    }

    /// Resolve every slot of a spawn request, in order.
    ///
    /// `None` leaves a slot at its default. If any slot fails, every slot resolved so far is
    /// dropped, closing any descriptors it duplicated, and the error is returned.
    pub fn resolve_all(
        &self,
        values: impl IntoIterator<Item = Option<StdioValue>>,
    ) -> Result<StdioSet, StdioError> {
        let mut specs = Vec::with_capacity(3);
        let mut overlapped = Vec::new();

        for (index, value) in values.into_iter().enumerate() {
            let slot = Slot::new(index);
            let Some(value) = value else {
                specs.push(self.default_for(slot));
                continue;
            };
            match self.resolve_slot(slot, value) {
                Ok(resolved) => {
                    if resolved.overlapped {
                        overlapped.push(slot);
                    }
                    specs.push(resolved.spec);
                }
                Err(err) => {
                    debug!(
                        "Failed to resolve {slot}; releasing {} resolved slot(s)",
                        specs.len()
                    );
                    return Err(err);
                }
            }
        }

        while specs.len() < 3 {
            specs.push(self.default_for(Slot::new(specs.len())));
        }

        Ok(StdioSet::from_parts(specs, overlapped))
    }

    fn default_for(&self, slot: Slot) -> StreamSpec {
        self.options
            .defaults
            .get(slot.index())
            .copied()
            .map(StreamSpec::from)
            .unwrap_or(StreamSpec::Ignore)
    }

    fn resolve_slot(&self, slot: Slot, value: StdioValue) -> Result<Resolved, StdioError> {
        trace!("Resolving {slot} from {value:?}");
        match value {
            StdioValue::Keyword(keyword) => resolve_keyword(slot, &keyword),
            StdioValue::Integer(fd) => resolve_descriptor(slot, fd).map(Resolved::from),
            StdioValue::Bytes(source) => resolve_bytes(slot, source).map(Resolved::from),
            StdioValue::Path(path) => Ok(StreamSpec::Path(path).into()),
            StdioValue::Stream(body) => self.resolve_body(slot, body).map(Resolved::from),
        }
    }

    fn resolve_body(&self, slot: Slot, body: BodySource) -> Result<StreamSpec, StdioError> {
        match body {
            BodySource::Buffered(bytes) => resolve_bytes(slot, ByteSource::Memory(bytes)),
            BodySource::File(_) => Err(StdioError::UnsupportedStream {
                slot,
                kind: UnsupportedStreamKind::File,
            }),
            BodySource::Live(reader) => {
                if self.options.streaming_stdin && slot.is_input() {
                    Ok(StreamSpec::Body(reader))
                } else {
                    Err(StdioError::UnsupportedStream {
                        slot,
                        kind: UnsupportedStreamKind::Live,
                    })
                }
            }
        }
    }
}

fn resolve_keyword(slot: Slot, keyword: &str) -> Result<Resolved, StdioError> {
    match keyword {
        "inherit" => Ok(StreamSpec::Inherit.into()),
        "ignore" => Ok(StreamSpec::Ignore.into()),
        "pipe" => Ok(StreamSpec::Pipe.into()),
        "overlapped" => Ok(Resolved {
            spec: StreamSpec::Pipe,
            overlapped: true,
        }),
        _ => Err(StdioError::InvalidKeyword {
            slot,
            keyword: keyword.to_string(),
        }),
    }
}

fn resolve_bytes(slot: Slot, source: ByteSource) -> Result<StreamSpec, StdioError> {
    match source {
        ByteSource::File(FileSource::Path(path)) => Ok(StreamSpec::Path(path)),
        ByteSource::File(FileSource::Descriptor(fd)) => resolve_descriptor(slot, fd),
        ByteSource::Memory(bytes) => resolve_memory(slot, bytes),
    }
}

fn resolve_memory(slot: Slot, bytes: Arc<[u8]>) -> Result<StreamSpec, StdioError> {
    if slot.is_output() {
        return Err(StdioError::ImmutableOutput { slot });
    }
    if bytes.is_empty() {
        return Err(StdioError::EmptyBuffer { slot });
    }
    Ok(StreamSpec::Buffer(bytes))
}

/// Resolve a descriptor number, which may alias one of our own standard streams.
fn resolve_descriptor(slot: Slot, fd: i64) -> Result<StreamSpec, StdioError> {
    if fd < 0 {
        return Err(StdioError::NegativeDescriptor { slot, fd });
    }
    if fd >= i64::from(i32::MAX) {
        return Err(StdioError::DescriptorOutOfRange { slot, fd });
    }

    if let Some(stream) = StdStream::from_raw(fd) {
        match stream {
            StdStream::Stdin if slot.is_output() => {
                return Err(StdioError::StdinAsOutput { slot });
            }
            StdStream::Stdout | StdStream::Stderr if slot.is_input() => {
                return Err(StdioError::OutputAsStdin {
                    stream: stream.slot(),
                });
            }
            _ => {}
        }
        if stream.slot() == slot {
            return Ok(StreamSpec::Inherit);
        }
        return stream
            .duplicate()
            .map(StreamSpec::Fd)
            .map_err(|err| StdioError::Duplicate { slot, fd, err });
    }

    #[cfg(unix)]
    {
        // Checked against `i32::MAX` above.
        #[allow(clippy::cast_possible_truncation)]
        let raw = fd as i32;
        procio_unix::duplicate_fd(raw)
            .map(StreamSpec::Fd)
            .map_err(|err| StdioError::Duplicate { slot, fd, err })
    }
    #[cfg(not(unix))]
    {
        Err(StdioError::UnsupportedDescriptor { slot, fd })
    }
}

#[cfg(test)]
mod tests;
