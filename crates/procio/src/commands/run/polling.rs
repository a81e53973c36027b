//! Running a command on the async runtime, with its output pipes registered for readiness.

use std::io::{self, Read};
use std::os::fd::OwnedFd;

use anyhow::{Context, Result};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncWriteExt, Interest, stdin};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use procio_stdio::{PipeTransfer, PollOrFd, Slot};

use super::{Launch, Outcome, Streams, finish_feed, seed};

type OutputPipe = PollOrFd<AsyncFd<OwnedFd>>;

const CHUNK_SIZE: usize = 64 * 1024;

pub(super) async fn run(launch: Launch) -> Result<Outcome> {
    let program_name = launch.program_name();
    let Launch {
        program,
        arguments,
        set,
        ..
    } = launch;

    let Streams {
        stdin,
        stdout,
        stderr,
    } = Streams::prepare(set)?;

    let mut child = Command::new(&program)
        .args(&arguments)
        .stdin(stdin.stdio)
        .stdout(stdout.stdio)
        .stderr(stderr.stdio)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn `{program_name}`"))?;
    debug!(
        pid = child.id().unwrap_or_default(),
        "Spawned `{program_name}`"
    );

    let feeder = match (stdin.transfer, child.stdin.take()) {
        (Some(transfer), Some(pipe)) => feed(transfer, pipe),
        _ => None,
    };

    let stdout_pipe = child
        .stdout
        .take()
        .map(tokio::process::ChildStdout::into_owned_fd)
        .transpose()?
        .map(|fd| register(Slot::STDOUT, fd));
    let stderr_pipe = child
        .stderr
        .take()
        .map(tokio::process::ChildStderr::into_owned_fd)
        .transpose()?
        .map(|fd| register(Slot::STDERR, fd));

    let (stdout, stderr) = tokio::try_join!(
        collect(Slot::STDOUT, seed(stdout.transfer), stdout_pipe),
        collect(Slot::STDERR, seed(stderr.transfer), stderr_pipe),
    )?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("Failed to wait for `{program_name}`"))?;

    if let Some(feeder) = feeder {
        finish_feed(feeder.await?)?;
    }

    Ok(Outcome {
        status,
        stdout,
        stderr,
    })
}

/// Register the parent's end of an output pipe with the runtime.
///
/// If the pipe can't be registered, it's returned as a bare descriptor and read with blocking I/O.
fn register(slot: Slot, fd: OwnedFd) -> OutputPipe {
    if let Err(err) = rustix::io::ioctl_fionbio(&fd, true) {
        debug!("Failed to make the {slot} pipe non-blocking: {err}");
        return PollOrFd::Fd(fd);
    }
    // SAFETY: The `AsyncFd` owns the descriptor, and only gives it up by being deregistered.
    #[allow(unsafe_code)]
    let registered = unsafe { AsyncFd::register_with_interest(fd, Interest::READABLE) };
    match registered {
        Ok(poll) => PollOrFd::Poll(poll),
        Err(err) => {
            let (fd, err) = err.into_parts();
            debug!("Failed to register the {slot} pipe: {err}");
            PollOrFd::Fd(fd)
        }
    }
}

/// Read an output pipe until the command closes its end.
async fn collect(slot: Slot, mut output: Vec<u8>, pipe: Option<OutputPipe>) -> Result<Vec<u8>> {
    let Some(mut pipe) = pipe else {
        return Ok(output);
    };

    if pipe.poll().is_none() {
        let mut remaining = None;
        pipe.close(&mut remaining, |remaining, fd| *remaining = Some(fd));
        let Some(fd) = remaining else {
            return Ok(output);
        };
        return tokio::task::spawn_blocking(move || {
            rustix::io::ioctl_fionbio(&fd, false)?;
            std::fs::File::from(fd).read_to_end(&mut output)?;
            Ok::<_, io::Error>(output)
        })
        .await?
        .with_context(|| format!("Failed to read {slot}"));
    }

    let mut chunk = vec![0; CHUNK_SIZE];
    loop {
        let result = {
            let Some(poll) = pipe.poll() else {
                break;
            };
            let mut guard = poll
                .readable()
                .await
                .with_context(|| format!("Failed to poll {slot}"))?;
            match guard.try_io(|inner| {
                rustix::io::read(inner.get_ref(), &mut chunk[..]).map_err(io::Error::from)
            }) {
                Ok(result) => result,
                Err(_would_block) => continue,
            }
        };

        match result {
            Ok(0) => pipe.close(slot, |slot, fd| {
                trace!("Closing the {slot} pipe");
                drop(fd);
            }),
            Ok(read) => output.extend_from_slice(&chunk[..read]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) if err.raw_os_error() == Some(rustix::io::Errno::BADF.raw_os_error()) => {
                pipe.invalidate();
                return Err(err).with_context(|| format!("The {slot} pipe was closed unexpectedly"));
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to read {slot}")),
        }
    }

    Ok(output)
}

/// Start writing into the command's stdin on the runtime.
///
/// Returns a handle to await, unless the input is our own stdin, which may never end.
fn feed(transfer: PipeTransfer, mut pipe: ChildStdin) -> Option<JoinHandle<io::Result<()>>> {
    match transfer {
        PipeTransfer::Buffer(bytes) => Some(tokio::spawn(async move {
            pipe.write_all(&bytes).await?;
            pipe.shutdown().await
        })),
        PipeTransfer::Stream(reader) => Some(tokio::spawn(stream(reader, pipe))),
        PipeTransfer::Write => {
            tokio::spawn(async move {
                if let Err(err) = tokio::io::copy(&mut stdin(), &mut pipe).await {
                    debug!("Stopped forwarding stdin: {err}");
                }
            });
            None
        }
        PipeTransfer::Read | PipeTransfer::Capture(_) => {
            debug!("Nothing to write to stdin; closing it");
            None
        }
    }
}

/// Copy a blocking reader into the command's stdin, one chunk at a time.
async fn stream(mut reader: Box<dyn Read + Send>, mut pipe: ChildStdin) -> io::Result<()> {
    loop {
        let (returned, chunk) = tokio::task::spawn_blocking(move || {
            let mut chunk = vec![0; CHUNK_SIZE];
            let read = reader.read(&mut chunk).map(|read| {
                chunk.truncate(read);
                chunk
            });
            (reader, read)
        })
        .await
        .map_err(io::Error::other)?;
        reader = returned;

        let chunk = match chunk {
            Ok(chunk) if chunk.is_empty() => break,
            Ok(chunk) => chunk,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        pipe.write_all(&chunk).await?;
    }
    pipe.shutdown().await
}
