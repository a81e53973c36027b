use crate::{ProjectOptions, Slot, StreamSpec};

use super::{PipeTransfer, SpawnStdio};

/// Windows distinguishes overlapped pipes, which the caller may ask for per slot. Memory files
/// don't exist on Windows, so a memory file spec can't reach this point.
pub(super) fn project(spec: StreamSpec, slot: Slot, options: ProjectOptions) -> SpawnStdio {
    let pipe = |transfer: PipeTransfer| {
        if options.overlapped {
            SpawnStdio::OverlappedPipe(transfer)
        } else {
            SpawnStdio::Pipe(transfer)
        }
    };
    match spec {
        StreamSpec::Inherit => SpawnStdio::Inherit,
        StreamSpec::Ignore => SpawnStdio::Ignore,
        StreamSpec::Path(path) => SpawnStdio::Path(path),
        StreamSpec::Fd(handle) => SpawnStdio::Descriptor(handle),
        StreamSpec::Memfd(file) => match file {},
        StreamSpec::Pipe => pipe(PipeTransfer::for_slot(slot)),
        StreamSpec::Capture(buffer) => pipe(PipeTransfer::Capture(buffer)),
        StreamSpec::Buffer(bytes) => pipe(PipeTransfer::Buffer(bytes)),
        StreamSpec::Body(reader) => pipe(PipeTransfer::Stream(reader)),
    }
}
