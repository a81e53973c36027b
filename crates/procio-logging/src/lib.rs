use std::fmt;

use anstream::ColorChoice;
use anyhow::Context;
use owo_colors::{OwoColorize, Style};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

use procio_static::EnvVars;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Suppress all tracing output by default (overridable by `RUST_LOG`).
    #[default]
    Default,
    /// Show debug messages, prefixed with the spans they were emitted in (overridable by `RUST_LOG`).
    Verbose,
    /// Show messages in a hierarchical span tree, with the uptime and target of each.
    ExtraVerbose,
}

impl Level {
    /// The level for a `-v` flag given `count` times.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Default,
            1 => Self::Verbose,
            _ => Self::ExtraVerbose,
        }
    }
}

/// A single-line log format: the level, then the enclosing spans and their fields, then the
/// message.
///
/// For example: `DEBUG stdio{sync=true}: Using a memory file for stdin (5 bytes)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcioFormat {
    /// Prefix each message with its spans, outermost first.
    pub with_spans: bool,
}

impl ProcioFormat {
    fn for_level(level: Level) -> Self {
        Self {
            with_spans: level != Level::Default,
        }
    }
}

impl<S, N> FormatEvent<S, N> for ProcioFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();
        let level = *event.metadata().level();
        if ansi {
            write!(writer, "{} ", level.style(level_style(level)))?;
        } else {
            write!(writer, "{level} ")?;
        }

        if self.with_spans {
            let mut spans = ctx
                .event_scope()
                .into_iter()
                .flat_map(|scope| scope.from_root())
                .peekable();
            while let Some(span) = spans.next() {
                if ansi {
                    write!(writer, "{}", span.name().bold())?;
                } else {
                    writer.write_str(span.name())?;
                }
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                writer.write_str(if spans.peek().is_some() { ":" } else { ": " })?;
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_style(level: tracing::Level) -> Style {
    match level {
        tracing::Level::TRACE => Style::new().purple(),
        tracing::Level::DEBUG => Style::new().blue(),
        tracing::Level::INFO => Style::new().green(),
        tracing::Level::WARN => Style::new().yellow(),
        tracing::Level::ERROR => Style::new().red().bold(),
    }
}

/// The filter for `level`, unless `RUST_LOG` says otherwise.
///
/// Any verbosity shows `DEBUG` messages from every procio crate, since their targets all start
/// with `procio`.
fn env_filter(level: Level) -> anyhow::Result<EnvFilter> {
    let default_directive: Directive = match level {
        Level::Default => LevelFilter::OFF.into(),
        Level::Verbose | Level::ExtraVerbose => "procio=debug"
            .parse()
            .context("Invalid default log directive")?,
    };
    EnvFilter::builder()
        .with_default_directive(default_directive)
        .with_env_var(EnvVars::RUST_LOG)
        .from_env()
        .context("Invalid `RUST_LOG` directives")
}

/// Install a global `tracing` subscriber writing to stderr for the given [`Level`].
pub fn setup_logging(level: Level) -> anyhow::Result<()> {
    let filter = env_filter(level)?;
    let registry = tracing_subscriber::registry();

    let installed = if level == Level::ExtraVerbose {
        registry
            .with(
                HierarchicalLayer::default()
                    .with_targets(true)
                    .with_timer(Uptime::default())
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .try_init()
    } else {
        // `anstream` resolves `auto` against the terminal and `NO_COLOR`/`CLICOLOR_FORCE`.
        let ansi = !matches!(
            anstream::Stderr::choice(&std::io::stderr()),
            ColorChoice::Never
        );
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr)
                    .event_format(ProcioFormat::for_level(level))
                    .with_filter(filter),
            )
            .try_init()
    };
    installed.context("Failed to install the tracing subscriber")
}
