use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use insta::assert_snapshot;
use test_case::test_case;

use crate::{
    BodySource, ByteSource, DefaultStdio, FileSource, ResolveOptions, Slot, StdioError,
    StdioResolver, StdioValue, StreamSpec, UnsupportedStreamKind,
};

fn resolve(slot: Slot, value: StdioValue) -> Result<StreamSpec, StdioError> {
    StdioResolver::default().resolve(slot, value)
}

#[test_case(Slot::STDIN, "inherit")]
#[test_case(Slot::STDOUT, "ignore")]
#[test_case(Slot::STDERR, "pipe")]
#[test_case(Slot::new(3), "overlapped")]
fn keywords(slot: Slot, keyword: &str) {
    let spec = resolve(slot, StdioValue::keyword(keyword)).unwrap();
    match keyword {
        "inherit" => assert!(matches!(spec, StreamSpec::Inherit)),
        "ignore" => assert!(matches!(spec, StreamSpec::Ignore)),
        _ => assert!(matches!(spec, StreamSpec::Pipe)),
    }
}

#[test_case(Slot::STDIN, "bogus")]
#[test_case(Slot::STDOUT, "Inherit")]
#[test_case(Slot::STDERR, "")]
#[test_case(Slot::new(4), "null")]
fn invalid_keywords(slot: Slot, keyword: &str) {
    let err = resolve(slot, StdioValue::keyword(keyword)).unwrap_err();
    assert!(matches!(err, StdioError::InvalidKeyword { .. }));
    assert_eq!(err.slot(), slot);
}

#[test]
fn invalid_keyword_message() {
    let err = resolve(Slot::STDOUT, StdioValue::keyword("bogus")).unwrap_err();
    assert_snapshot!(err, @"`bogus` is not a valid option for stdout; expected `inherit`, `ignore`, `pipe`, a file descriptor, a path, or a byte buffer");
}

#[test_case(Slot::STDIN, 0; "stdin")]
#[test_case(Slot::STDOUT, 1; "stdout")]
#[test_case(Slot::STDERR, 2; "stderr")]
fn own_stream_inherits(slot: Slot, fd: i64) {
    let spec = resolve(slot, StdioValue::Integer(fd)).unwrap();
    assert!(matches!(spec, StreamSpec::Inherit));
}

#[test_case(Slot::STDOUT)]
#[test_case(Slot::STDERR)]
#[test_case(Slot::new(3))]
fn stdin_as_output(slot: Slot) {
    let err = resolve(slot, StdioValue::Integer(0)).unwrap_err();
    assert!(matches!(err, StdioError::StdinAsOutput { slot: s } if s == slot));
}

#[test_case(1)]
#[test_case(2)]
fn output_as_stdin(fd: i64) {
    let err = resolve(Slot::STDIN, StdioValue::Integer(fd)).unwrap_err();
    assert!(matches!(err, StdioError::OutputAsStdin { .. }));
    assert_eq!(err.slot(), Slot::STDIN);
}

#[test]
fn aliasing_messages() {
    let err = resolve(Slot::STDERR, StdioValue::Integer(0)).unwrap_err();
    assert_snapshot!(err, @"stdin cannot be used for stderr");

    let err = resolve(Slot::STDIN, StdioValue::Integer(2)).unwrap_err();
    assert_snapshot!(err, @"stderr cannot be used for stdin");

    let err = resolve(Slot::new(3), StdioValue::Integer(0)).unwrap_err();
    assert_snapshot!(err, @"stdin cannot be used for stdio[3]");
}

#[test]
fn crossed_output_streams_are_duplicated() {
    let spec = resolve(Slot::STDERR, StdioValue::Integer(1)).unwrap();
    assert!(matches!(spec, StreamSpec::Fd(_)));

    let spec = resolve(Slot::new(3), StdioValue::Integer(2)).unwrap();
    assert!(matches!(spec, StreamSpec::Fd(_)));
}

#[test]
fn negative_descriptor() {
    let err = resolve(Slot::STDOUT, StdioValue::Integer(-1)).unwrap_err();
    assert!(matches!(err, StdioError::NegativeDescriptor { fd: -1, .. }));
    assert_snapshot!(err, @"File descriptor for stdout must be a non-negative integer, received: -1");
}

#[test_case(i64::from(i32::MAX))]
#[test_case(i64::MAX)]
fn descriptor_out_of_range(fd: i64) {
    let err = resolve(Slot::STDIN, StdioValue::Integer(fd)).unwrap_err();
    assert!(matches!(err, StdioError::DescriptorOutOfRange { .. }));
}

#[test]
fn descriptor_out_of_range_message() {
    let err = resolve(Slot::STDERR, StdioValue::Integer(4_294_967_296)).unwrap_err();
    assert_snapshot!(err, @"File descriptor for stderr must be a valid integer, received: 4294967296");
}

#[cfg(unix)]
#[test]
fn duplicates_open_descriptor() {
    use std::io::{Seek, SeekFrom, Write};
    use std::os::fd::AsRawFd;

    let mut file = tempfile::tempfile().unwrap();
    let spec = resolve(
        Slot::STDOUT,
        StdioValue::Integer(i64::from(file.as_raw_fd())),
    )
    .unwrap();
    let StreamSpec::Fd(fd) = spec else {
        panic!("expected a descriptor");
    };
    assert_ne!(fd.as_raw_fd(), file.as_raw_fd());

    // The duplicate refers to the same open file.
    let mut duplicate = std::fs::File::from(fd);
    duplicate.write_all(b"shared").unwrap();
    drop(duplicate);

    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "shared");
}

#[cfg(unix)]
#[test]
fn closed_descriptor_fails_to_duplicate() {
    // Far above anything the test process has open.
    let err = resolve(Slot::STDOUT, StdioValue::Integer(1 << 30)).unwrap_err();
    assert!(matches!(err, StdioError::Duplicate { .. }));
    assert_snapshot!(err, @"Failed to duplicate file descriptor 1073741824 for stdout");
}

#[cfg(windows)]
#[test]
fn arbitrary_descriptor_is_unsupported() {
    let err = resolve(Slot::STDOUT, StdioValue::Integer(7)).unwrap_err();
    assert!(matches!(err, StdioError::UnsupportedDescriptor { fd: 7, .. }));
}

#[test]
fn path_is_kept() {
    let spec = resolve(Slot::STDOUT, StdioValue::from(PathBuf::from("out.log"))).unwrap();
    assert!(matches!(spec, StreamSpec::Path(path) if path == PathBuf::from("out.log")));
}

#[test]
fn memory_buffer_on_stdin() {
    let bytes: Arc<[u8]> = Arc::from(&b"hello"[..]);
    let spec = resolve(
        Slot::STDIN,
        StdioValue::Bytes(ByteSource::Memory(Arc::clone(&bytes))),
    )
    .unwrap();
    let StreamSpec::Buffer(held) = spec else {
        panic!("expected a buffer");
    };
    assert!(Arc::ptr_eq(&held, &bytes));
}

#[test_case(Slot::STDOUT)]
#[test_case(Slot::STDERR)]
#[test_case(Slot::new(3))]
fn memory_buffer_on_output(slot: Slot) {
    let err = resolve(slot, StdioValue::bytes("hello")).unwrap_err();
    assert!(matches!(err, StdioError::ImmutableOutput { .. }));
}

#[test_case(Slot::STDIN)]
#[test_case(Slot::STDOUT)]
#[test_case(Slot::STDERR)]
fn empty_buffer(slot: Slot) {
    let err = resolve(slot, StdioValue::bytes("")).unwrap_err();
    if slot.is_input() {
        assert!(matches!(err, StdioError::EmptyBuffer { .. }));
    } else {
        // An output slot is rejected for holding a buffer at all.
        assert!(matches!(err, StdioError::ImmutableOutput { .. }));
    }
}

#[test]
fn buffer_messages() {
    let err = resolve(Slot::STDIN, StdioValue::bytes("")).unwrap_err();
    assert_snapshot!(err, @"Byte buffer for stdin is empty");

    let err = resolve(Slot::STDOUT, StdioValue::bytes("data")).unwrap_err();
    assert_snapshot!(err, @"Byte buffers are immutable and cannot be used for stdout");
}

#[test]
fn file_backed_bytes_on_output() {
    let source = ByteSource::File(FileSource::Path(PathBuf::from("captured.txt")));
    let spec = resolve(Slot::STDERR, StdioValue::Bytes(source)).unwrap();
    assert!(matches!(spec, StreamSpec::Path(_)));
}

#[test]
fn file_backed_bytes_by_descriptor() {
    let source = ByteSource::File(FileSource::Descriptor(0));
    let spec = resolve(Slot::STDIN, StdioValue::Bytes(source)).unwrap();
    assert!(matches!(spec, StreamSpec::Inherit));
}

#[test]
fn buffered_body() {
    let body = BodySource::Buffered(Arc::from(&b"body"[..]));
    let spec = resolve(Slot::STDIN, StdioValue::Stream(body)).unwrap();
    assert_eq!(spec.byte_slice(), b"body");

    let body = BodySource::Buffered(Arc::from(&b""[..]));
    let err = resolve(Slot::STDIN, StdioValue::Stream(body)).unwrap_err();
    assert!(matches!(err, StdioError::EmptyBuffer { .. }));
}

#[test]
fn file_body_is_unsupported() {
    let body = BodySource::File(FileSource::Path(PathBuf::from("input.txt")));
    let err = resolve(Slot::STDIN, StdioValue::Stream(body)).unwrap_err();
    assert!(matches!(
        err,
        StdioError::UnsupportedStream {
            kind: UnsupportedStreamKind::File,
            ..
        }
    ));
    assert_snapshot!(err, @"Streaming file-backed bodies are not yet supported for stdin");
}

#[test]
fn live_body_is_unsupported_by_default() {
    let body = BodySource::Live(Box::new(Cursor::new(b"chunk".to_vec())));
    let err = resolve(Slot::STDIN, StdioValue::Stream(body)).unwrap_err();
    assert_snapshot!(err, @"Streaming multi-chunk bodies are not yet supported for stdin");
}

#[test]
fn live_body_with_streaming_stdin() {
    let resolver = StdioResolver::new(ResolveOptions {
        streaming_stdin: true,
        ..ResolveOptions::default()
    });

    let body = BodySource::Live(Box::new(Cursor::new(b"chunk".to_vec())));
    let spec = resolver.resolve(Slot::STDIN, StdioValue::Stream(body)).unwrap();
    let StreamSpec::Body(mut reader) = spec else {
        panic!("expected a body");
    };
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, b"chunk");

    // Only input can be streamed.
    let body = BodySource::Live(Box::new(Cursor::new(b"chunk".to_vec())));
    let err = resolver
        .resolve(Slot::STDOUT, StdioValue::Stream(body))
        .unwrap_err();
    assert!(matches!(err, StdioError::UnsupportedStream { .. }));
}

#[test]
fn resolve_all_applies_defaults() {
    let resolver = StdioResolver::new(ResolveOptions {
        defaults: [DefaultStdio::Pipe, DefaultStdio::Inherit, DefaultStdio::Ignore],
        ..ResolveOptions::default()
    });

    let set = resolver
        .resolve_all([None, Some(StdioValue::keyword("pipe"))])
        .unwrap();
    assert_eq!(set.len(), 3);
    assert!(matches!(set.get(Slot::STDIN), Some(StreamSpec::Pipe)));
    assert!(matches!(set.get(Slot::STDOUT), Some(StreamSpec::Pipe)));
    assert!(matches!(set.get(Slot::STDERR), Some(StreamSpec::Ignore)));
}

#[test]
fn resolve_all_ignores_unset_extra_slots() {
    let set = StdioResolver::default()
        .resolve_all([None, None, None, None, Some(StdioValue::keyword("pipe"))])
        .unwrap();
    assert_eq!(set.len(), 5);
    assert!(matches!(set.get(Slot::STDIN), Some(StreamSpec::Inherit)));
    assert!(matches!(set.get(Slot::new(3)), Some(StreamSpec::Ignore)));
    assert!(matches!(set.get(Slot::new(4)), Some(StreamSpec::Pipe)));
}

#[test]
fn resolve_all_records_overlapped_slots() {
    let set = StdioResolver::default()
        .resolve_all([
            Some(StdioValue::keyword("overlapped")),
            Some(StdioValue::keyword("pipe")),
            Some(StdioValue::keyword("overlapped")),
        ])
        .unwrap();
    assert!(set.is_overlapped(Slot::STDIN));
    assert!(!set.is_overlapped(Slot::STDOUT));
    assert!(set.is_overlapped(Slot::STDERR));
    assert!(matches!(set.get(Slot::STDERR), Some(StreamSpec::Pipe)));
}

#[test]
fn resolve_all_fails_on_any_slot() {
    let bytes: Arc<[u8]> = Arc::from(&b"input"[..]);
    let err = StdioResolver::default()
        .resolve_all([
            Some(StdioValue::Bytes(ByteSource::Memory(Arc::clone(&bytes)))),
            Some(StdioValue::Integer(2)),
            Some(StdioValue::keyword("sideways")),
        ])
        .unwrap_err();
    assert_eq!(err.slot(), Slot::STDERR);

    // Everything resolved before the failure has been released.
    assert_eq!(Arc::strong_count(&bytes), 1);
}

#[cfg(unix)]
#[test]
fn resolve_all_closes_duplicated_descriptors() {
    use std::os::fd::{AsRawFd, OwnedFd};

    let (reader, writer) = std::io::pipe().unwrap();
    let err = StdioResolver::default()
        .resolve_all([
            None,
            Some(StdioValue::Integer(i64::from(writer.as_raw_fd()))),
            Some(StdioValue::keyword("sideways")),
        ])
        .unwrap_err();
    assert_eq!(err.slot(), Slot::STDERR);
    drop(writer);

    // With every write end closed, the read end reports end of file rather than blocking.
    let reader = OwnedFd::from(reader);
    rustix::io::ioctl_fionbio(&reader, true).unwrap();
    let mut buf = [0; 8];
    assert_eq!(rustix::io::read(&reader, &mut buf[..]), Ok(0));
}

#[test]
fn resolve_all_empty() {
    let set = StdioResolver::default()
        .resolve_all(std::iter::empty())
        .unwrap();
    assert_eq!(set.len(), 3);
    assert!(set.iter().all(|(_, spec)| matches!(spec, StreamSpec::Inherit)));
}
