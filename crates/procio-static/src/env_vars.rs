/// Declares all environment variable used throughout `procio` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// Equivalent to the `--no-memfd` command-line argument. If set, buffers handed to a child
    /// process are always fed through a live pipe, never through an anonymous memory file.
    pub const PROCIO_NO_MEMFD: &'static str = "PROCIO_NO_MEMFD";

    /// Equivalent to the `--max-buffer` command-line argument. The maximum number of bytes
    /// collected from each piped output stream of a child process.
    pub const PROCIO_MAX_BUFFER: &'static str = "PROCIO_MAX_BUFFER";

    /// Used to set the log level for `tracing`, e.g., `RUST_LOG=procio=debug`.
    ///
    /// See the [tracing documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#example-syntax)
    /// for more.
    pub const RUST_LOG: &'static str = "RUST_LOG";
}
