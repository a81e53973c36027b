use std::io::{self, Write};
use std::process::{ChildStdin, Command};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tracing::debug;

use procio_stdio::{MemoryFile, PipeTransfer, Slot, StreamSpec};

use super::{Launch, Outcome, Streams, finish_feed, seed};

/// Run the command with the standard library's process API, waiting for it to exit.
///
/// Output slots backed by memory files are read back once the command has exited.
pub(super) fn run(launch: Launch) -> Result<Outcome> {
    let program_name = launch.program_name();
    let Launch {
        program,
        arguments,
        set,
        converted,
    } = launch;

    // The child writes through the descriptor we hand over, so keep a second handle on the file.
    let mut memory_outputs: Vec<(Slot, MemoryFile)> = Vec::new();
    for slot in converted.into_iter().filter(|slot| slot.is_output()) {
        if let Some(StreamSpec::Memfd(file)) = set.get(slot) {
            let file = file
                .try_clone()
                .with_context(|| format!("Failed to duplicate the memory file for {slot}"))?;
            memory_outputs.push((slot, file));
        }
    }

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
        .spawn()
        .with_context(|| format!("Failed to spawn `{program_name}`"))?;
    debug!(pid = child.id(), "Spawned `{program_name}`");

    let feeder = match (stdin.transfer, child.stdin.take()) {
        (Some(transfer), Some(pipe)) => feed(transfer, pipe),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for `{program_name}`"))?;

    if let Some(feeder) = feeder {
        let result = feeder
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        finish_feed(result)?;
    }

    let mut outcome = Outcome {
        status: output.status,
        stdout: seed(stdout.transfer),
        stderr: seed(stderr.transfer),
    };
    outcome.stdout.extend_from_slice(&output.stdout);
    outcome.stderr.extend_from_slice(&output.stderr);

    for (slot, file) in memory_outputs {
        let contents = file
            .read_back()
            .with_context(|| format!("Failed to read {slot} back from its memory file"))?;
        debug!("Read {} bytes of {slot} from a memory file", contents.len());
        if slot == Slot::STDOUT {
            outcome.stdout.extend_from_slice(&contents);
        } else {
            outcome.stderr.extend_from_slice(&contents);
        }
    }

    Ok(outcome)
}

/// Start writing into the command's stdin on a separate thread.
///
/// Returns a handle to join, unless the input is our own stdin, which may never end.
fn feed(transfer: PipeTransfer, mut pipe: ChildStdin) -> Option<JoinHandle<io::Result<()>>> {
    match transfer {
        PipeTransfer::Buffer(bytes) => Some(thread::spawn(move || pipe.write_all(&bytes))),
        PipeTransfer::Stream(mut reader) => Some(thread::spawn(move || {
            io::copy(&mut reader, &mut pipe)?;
            Ok(())
        })),
        PipeTransfer::Write => {
            thread::spawn(move || {
                if let Err(err) = io::copy(&mut io::stdin().lock(), &mut pipe) {
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
