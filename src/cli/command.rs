use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use strum_macros::Display;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::commands::CommandsArgs;
use crate::cli::replay::ReplayArgs;
use crate::cli::serve::ServeArgs;
use crate::engine::{DEFAULT_FRAME_INTERVAL, EngineConfig, MalformedWritePolicy, OverlapPolicy};
use crate::table::{TroubleCode, identity_text};

/// Command-line options for the OBD-II adapter emulator.
#[derive(Debug, Parser)]
#[command(
    name = "carmock",
    about = "Emulate an ELM327 OBD-II adapter for testing diagnostic clients."
)]
pub struct Args {
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use carmock::{Args, Command, CommandsArgs};
    ///
    /// let args = Args::new(Command::Commands(CommandsArgs::default()));
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output: None,
            command,
        }
    }

    /// Returns the explicit log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Consumes the arguments, returning the command to run.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the emulated adapter over TCP until Ctrl+C.
    Serve(ServeArgs),
    /// Play command frames through the engine and print the notifications they produce.
    Replay(ReplayArgs),
    /// Print the command table the emulator serves.
    Commands(CommandsArgs),
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum, Display)]
pub enum LogLevel {
    #[strum(to_string = "error")]
    Error,
    #[strum(to_string = "warn")]
    Warn,
    #[strum(to_string = "info")]
    Info,
    #[strum(to_string = "debug")]
    Debug,
    #[strum(to_string = "trace")]
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    Pretty,
    /// One JSON document per line.
    Json,
}

/// Overlap policy as accepted on the command line.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum OverlapArg {
    /// Play overlapping commands one after another.
    #[default]
    Queue,
    /// Refuse commands while a response is still playing.
    Reject,
    /// Play overlapping responses concurrently.
    Interleave,
}

impl OverlapArg {
    fn to_policy(self) -> OverlapPolicy {
        match self {
            Self::Queue => OverlapPolicy::Queue,
            Self::Reject => OverlapPolicy::Reject,
            Self::Interleave => OverlapPolicy::Interleave,
        }
    }
}

/// Emulation settings shared by `serve` and `replay`.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct EmulationArgs {
    /// Delay between consecutive response frames (e.g. `250ms`, `2s`).
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,
    /// What to do with a command that arrives while a response is still playing.
    #[arg(long, value_enum, default_value_t)]
    overlap: OverlapArg,
    /// Diagnostic trouble codes the adapter reports (e.g. `P0301 P0420`).
    #[arg(value_name = "CODE")]
    codes: Vec<TroubleCode>,
}

impl EmulationArgs {
    /// Creates emulation settings for programmatic runs.
    #[must_use]
    pub fn new(codes: Vec<TroubleCode>) -> Self {
        Self {
            codes,
            ..Self::default()
        }
    }

    /// Overrides the frame interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Overrides the overlap policy.
    #[must_use]
    pub fn with_overlap(mut self, overlap: OverlapArg) -> Self {
        self.overlap = overlap;
        self
    }

    pub(crate) fn codes(&self) -> &[TroubleCode] {
        &self.codes
    }

    pub(crate) fn engine_config(&self, malformed_writes: MalformedWritePolicy) -> EngineConfig {
        EngineConfig::builder()
            .frame_interval(self.interval.unwrap_or(DEFAULT_FRAME_INTERVAL))
            .overlap_policy(self.overlap.to_policy())
            .malformed_writes(malformed_writes)
            .identity(identity_text(&self.codes))
            .build()
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serve_parses_codes_and_interval() {
        let args = Args::try_parse_from([
            "carmock",
            "serve",
            "--interval",
            "250ms",
            "P0301",
            "p0420",
        ])
        .expect("valid serve arguments should parse");

        let Command::Serve(serve) = args.into_command() else {
            panic!("expected serve command");
        };
        let config = serve.emulation().engine_config(MalformedWritePolicy::default());
        assert_eq!(Duration::from_millis(250), config.frame_interval());
        assert_eq!(b"P0301,P0420", config.identity());
    }

    #[test]
    fn invalid_trouble_code_fails_parsing() {
        let result = Args::try_parse_from(["carmock", "serve", "Z9999"]);

        let error = result.expect_err("invalid trouble code should fail argument parsing");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn replay_requires_a_frame() {
        let result = Args::try_parse_from(["carmock", "replay"]);

        let error = result.expect_err("replay without frames should fail");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let args = Args::try_parse_from([
            "carmock",
            "commands",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should parse after the subcommand");

        assert_eq!(Some(OutputFormat::Json), args.output_format());
        assert_eq!(Some(LogLevel::Debug), args.log_level());
        assert_matches!(args.into_command(), Command::Commands(_));
    }

    #[test]
    fn overlap_defaults_to_queue() {
        let config = EmulationArgs::default().engine_config(MalformedWritePolicy::default());
        assert_eq!(OverlapPolicy::Queue, config.overlap_policy());
        assert_eq!(DEFAULT_FRAME_INTERVAL, config.frame_interval());
    }
}
