//! Structured logging initialization for the avatar CLI.
//!
//! Logs always go to stderr so stdout stays parseable in robot mode.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// One JSON object per line, for agents and scripts.
    Json,
    /// Colored multi-field output for an interactive terminal.
    Pretty,
    /// Compact output without ANSI escapes, for pipes and files.
    Plain,
}

impl LogStyle {
    /// Pick a style from the output mode and whether stderr is a terminal.
    pub const fn select(robot_mode: bool, stderr_is_tty: bool) -> Self {
        if robot_mode {
            Self::Json
        } else if stderr_is_tty {
            Self::Pretty
        } else {
            Self::Plain
        }
    }
}

/// Filter directive for the given verbosity flags.
///
/// Covers both the `avatar` binary and the `avatar_cache` library.
/// `quiet` wins over `verbose`.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "avatar=error,avatar_cache=error";
    }
    match verbose {
        0 => "avatar=info,avatar_cache=info",
        1 => "avatar=debug,avatar_cache=debug",
        _ => "avatar=trace,avatar_cache=trace",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the verbosity-derived filter when set, e.g.
/// `RUST_LOG=avatar_cache=trace,image=warn`.
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let style = LogStyle::select(robot_mode, io::stderr().is_terminal());
    // A subscriber installed earlier (tests, embedding apps) keeps priority.
    let _ = try_init(style, verbose, quiet);
}

/// Install the global subscriber with an explicit style.
pub fn try_init(style: LogStyle, verbose: u8, quiet: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));
    let registry = tracing_subscriber::registry().with(filter);
    let base = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);

    match style {
        LogStyle::Json => registry.with(base.json().with_target(true)).try_init(),
        LogStyle::Pretty => registry.with(base.with_target(false)).try_init(),
        LogStyle::Plain => registry
            .with(base.with_ansi(false).with_target(false).compact())
            .try_init(),
    }
}
