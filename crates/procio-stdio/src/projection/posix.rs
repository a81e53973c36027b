use crate::{ProjectOptions, Slot, StreamSpec};

use super::{PipeTransfer, SpawnStdio};

/// POSIX spawn calls take a descriptor for every slot, so memory files and caller-supplied
/// descriptors are handed over the same way. There is no overlapped I/O.
pub(super) fn project(spec: StreamSpec, slot: Slot, _options: ProjectOptions) -> SpawnStdio {
    match spec {
        StreamSpec::Inherit => SpawnStdio::Inherit,
        StreamSpec::Ignore => SpawnStdio::Ignore,
        StreamSpec::Path(path) => SpawnStdio::Path(path),
        StreamSpec::Fd(fd) => SpawnStdio::Descriptor(fd),
        StreamSpec::Memfd(file) => SpawnStdio::Descriptor(file.into_descriptor()),
        StreamSpec::Pipe => SpawnStdio::Pipe(PipeTransfer::for_slot(slot)),
        StreamSpec::Capture(buffer) => SpawnStdio::Pipe(PipeTransfer::Capture(buffer)),
        StreamSpec::Buffer(bytes) => SpawnStdio::Pipe(PipeTransfer::Buffer(bytes)),
        StreamSpec::Body(reader) => SpawnStdio::Pipe(PipeTransfer::Stream(reader)),
    }
}
