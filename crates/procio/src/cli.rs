use std::ffi::OsString;

use clap::{Args, Parser, Subcommand};

use procio_static::EnvVars;

use crate::value::StdioArg;

#[derive(Parser)]
#[command(name = "procio", author, version, about)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Do not forward the command's captured output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    /// Use verbose output.
    ///
    /// Repeat to show a hierarchical trace with timings.
    #[arg(global = true, action = clap::ArgAction::Count, long, short, conflicts_with = "quiet")]
    pub(crate) verbose: u8,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a command, connecting its stdio as described.
    Run(RunArgs),
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct RunArgs {
    /// How to connect the command's standard input.
    ///
    /// Accepts `inherit`, `ignore`, `pipe`, `overlapped`, a file descriptor number, `text:<TEXT>`
    /// to feed a string, `file:<PATH>` to read from a file, `path:<PATH>` to open a path, or
    /// `body:<PATH>` to stream a file (requires `--streaming-stdin`).
    #[arg(long, allow_negative_numbers = true, value_name = "VALUE")]
    pub(crate) stdin: Option<StdioArg>,

    /// How to connect the command's standard output.
    ///
    /// Accepts the same values as `--stdin`. Piped output is collected and written to our own
    /// standard output once the command exits.
    #[arg(long, allow_negative_numbers = true, value_name = "VALUE")]
    pub(crate) stdout: Option<StdioArg>,

    /// How to connect the command's standard error.
    ///
    /// Accepts the same values as `--stdin`. Piped output is collected and written to our own
    /// standard error once the command exits.
    #[arg(long, allow_negative_numbers = true, value_name = "VALUE")]
    pub(crate) stderr: Option<StdioArg>,

    /// Allow `body:` values to be streamed into standard input.
    #[arg(long)]
    pub(crate) streaming_stdin: bool,

    /// Block until the command exits, then read its output.
    ///
    /// Piped output may then be collected through anonymous memory files, where supported.
    #[arg(long)]
    pub(crate) sync: bool,

    /// The maximum number of bytes to collect from each piped output.
    #[arg(long, env = EnvVars::PROCIO_MAX_BUFFER, value_name = "BYTES")]
    pub(crate) max_buffer: Option<usize>,

    /// Never back stdio with anonymous memory files.
    #[arg(long, env = EnvVars::PROCIO_NO_MEMFD, value_parser = clap::builder::BoolishValueParser::new())]
    pub(crate) no_memfd: bool,

    /// The command to run, followed by its arguments.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub(crate) command: Vec<OsString>,
}
