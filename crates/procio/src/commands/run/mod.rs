use std::ffi::OsString;
use std::io::{self, Write};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tracing::{debug, info_span};

use procio_stdio::{
    PipeTransfer, ResolveOptions, Slot, SpawnMode, SpawnStdio, StdioResolver, StdioSet,
};

use crate::cli::RunArgs;
use crate::commands::ExitStatus;
use crate::value::StdioArg;

mod blocking;
#[cfg(unix)]
mod polling;

/// Resolve the requested stdio, run the command, and forward its collected output.
pub(crate) async fn run(args: RunArgs, quiet: bool) -> Result<ExitStatus> {
    let RunArgs {
        stdin,
        stdout,
        stderr,
        streaming_stdin,
        sync,
        max_buffer,
        no_memfd,
        command,
    } = args;

    let Some((program, arguments)) = command.split_first() else {
        bail!("No command provided");
    };
    let program = program.clone();
    let arguments = arguments.to_vec();

    let values = [stdin, stdout, stderr]
        .into_iter()
        .map(|arg| arg.map(StdioArg::into_value).transpose())
        .collect::<Result<Vec<_>>>()?;

    let (set, converted) = info_span!("stdio", sync).in_scope(|| -> Result<_> {
        let resolver = StdioResolver::new(ResolveOptions {
            streaming_stdin,
            ..ResolveOptions::default()
        });
        let mut set = resolver.resolve_all(values)?;

        let mode = SpawnMode {
            is_sync: sync,
            max_buffer,
            memfd: !no_memfd,
        };
        let converted = set.use_memory_backed_buffers(mode);
        Ok((set, converted))
    })?;

    let launch = Launch {
        program,
        arguments,
        set,
        converted,
    };

    #[cfg(unix)]
    let mut outcome = if sync {
        tokio::task::spawn_blocking(move || blocking::run(launch)).await??
    } else {
        polling::run(launch).await?
    };
    #[cfg(not(unix))]
    let mut outcome = {
        if !sync {
            debug!("Polled pipes are only supported on Unix; waiting for the command to exit");
        }
        tokio::task::spawn_blocking(move || blocking::run(launch)).await??
    };

    if let Some(limit) = max_buffer {
        outcome.truncate(limit);
    }
    if !quiet {
        outcome.forward()?;
    }

    Ok(ExitStatus::from(outcome.status))
}

/// A command ready to be spawned.
struct Launch {
    program: OsString,
    arguments: Vec<OsString>,
    set: StdioSet,
    /// Slots that were moved into anonymous memory files.
    converted: Vec<Slot>,
}

impl Launch {
    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// The standard streams of a command, as handed to the process API.
struct Streams {
    stdin: Stream,
    stdout: Stream,
    stderr: Stream,
}

struct Stream {
    stdio: Stdio,
    /// Set if the slot is piped, describing what happens to the parent's end.
    transfer: Option<PipeTransfer>,
}

impl Streams {
    /// Project `set` and open what needs opening.
    fn prepare(set: StdioSet) -> Result<Self> {
        let projected = set.project();
        if projected.len() > 3 {
            bail!(
                "Only stdin, stdout, and stderr can be connected; received {} slots",
                projected.len()
            );
        }

        let mut streams = projected
            .into_iter()
            .enumerate()
            .map(|(index, stdio)| Stream::open(Slot::new(index), stdio));
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (streams.next(), streams.next(), streams.next())
        else {
            bail!("Missing a standard stream");
        };

        Ok(Self {
            stdin: stdin?,
            stdout: stdout?,
            stderr: stderr?,
        })
    }
}

impl Stream {
    fn open(slot: Slot, stdio: SpawnStdio) -> Result<Self> {
        let (stdio, transfer) = match stdio {
            SpawnStdio::Inherit => (Stdio::inherit(), None),
            SpawnStdio::Ignore => (Stdio::null(), None),
            SpawnStdio::Path(path) => {
                let file = if slot.is_input() {
                    fs_err::File::open(&path)
                } else {
                    fs_err::File::create(&path)
                }
                .with_context(|| format!("Failed to open the file for {slot}"))?;
                (Stdio::from(file.into_file()), None)
            }
            SpawnStdio::Descriptor(descriptor) => (Stdio::from(descriptor), None),
            SpawnStdio::Pipe(transfer) => (Stdio::piped(), Some(transfer)),
            #[cfg(windows)]
            SpawnStdio::OverlappedPipe(transfer) => {
                debug!("Using a plain pipe for {slot}");
                (Stdio::piped(), Some(transfer))
            }
        };
        Ok(Self { stdio, transfer })
    }
}

/// Bytes already collected for an output slot, before anything is read from the pipe.
fn seed(transfer: Option<PipeTransfer>) -> Vec<u8> {
    match transfer {
        Some(PipeTransfer::Capture(buffer)) => buffer,
        _ => Vec::new(),
    }
}

/// The result of running a command to completion.
struct Outcome {
    status: std::process::ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Outcome {
    fn truncate(&mut self, limit: usize) {
        for (slot, output) in [
            (Slot::STDOUT, &mut self.stdout),
            (Slot::STDERR, &mut self.stderr),
        ] {
            if output.len() > limit {
                debug!("Truncating {slot} from {} to {limit} bytes", output.len());
                output.truncate(limit);
            }
        }
    }

    /// Write the collected output to our own standard streams.
    fn forward(&self) -> Result<()> {
        if !self.stdout.is_empty() {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&self.stdout)?;
            stdout.flush()?;
        }
        if !self.stderr.is_empty() {
            let mut stderr = io::stderr().lock();
            stderr.write_all(&self.stderr)?;
            stderr.flush()?;
        }
        Ok(())
    }
}

/// Handle the end of a write into the command's stdin.
fn finish_feed(result: io::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Command closed stdin before reading all input");
            Ok(())
        }
        Err(err) => Err(err).context("Failed to write to the command's stdin"),
    }
}
