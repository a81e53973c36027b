//! Resolution of child-process stdio.
//!
//! A spawn request describes each stdio slot with a loosely-typed [`StdioValue`]. The
//! [`StdioResolver`] validates those values into a [`StdioSet`] of [`StreamSpec`]s, which may
//! then swap in-memory payloads for anonymous memory files, and is finally projected into the
//! [`SpawnStdio`] options a process launcher consumes. Descriptors the launcher hands back for
//! piped slots are tracked with [`PollOrFd`].

pub use descriptor::{OwnedDescriptor, RawDescriptor, StdStream};
pub use error::{StdioError, UnsupportedStreamKind};
pub use memfd::MemoryFile;
pub use poll::{PollOrFd, PollRegistration};
pub use projection::{PipeTransfer, ProjectOptions, SpawnStdio};
pub use resolve::{DefaultStdio, ResolveOptions, StdioResolver};
pub use set::{SpawnMode, StdioSet};
pub use slot::Slot;
pub use spec::StreamSpec;
pub use value::{BodySource, ByteSource, FileSource, StdioValue};

mod descriptor;
mod error;
mod memfd;
mod poll;
mod projection;
mod resolve;
mod set;
mod slot;
mod spec;
mod value;
