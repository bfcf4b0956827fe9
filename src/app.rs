use std::io;

use anyhow::Result;
use tracing::instrument;

use crate::cli::{Command, LogLevel, OutputFormat};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Runs a CLI command against the real terminal.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = carmock::Args::try_parse_from(["carmock", "commands", "P0301"])?;
/// let mut out = Vec::new();
/// carmock::run(args.into_command(), &mut out, carmock::OutputFormat::Json).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the command's inputs are invalid, the
/// transport fails, or output writing fails.
pub async fn run<W>(command: Command, out: &mut W, output_format: OutputFormat) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, None, output_format).await
}

/// Runs a CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the command's inputs are invalid, the
/// transport fails, or output writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(
        command,
        out,
        &SystemTerminalClient,
        log_level,
        output_format,
    )
    .await
}

/// Runs a CLI command with an injected terminal client and explicit telemetry settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct Headless;
/// impl carmock::TerminalClient for Headless {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = carmock::Args::try_parse_from([
///     "carmock",
///     "--log-level",
///     "warn",
///     "replay",
///     "--interval",
///     "10ms",
///     "--frame",
///     "ATE0\\r",
/// ])?;
/// let log_level = args.log_level();
/// let mut out = Vec::new();
/// carmock::run_with_clients(
///     args.into_command(),
///     &mut out,
///     &Headless,
///     log_level,
///     carmock::OutputFormat::Pretty,
/// ).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the command's inputs are invalid, the
/// transport fails, or output writing fails.
#[instrument(
    skip(command, out, terminal_client),
    level = "info",
    fields(command = %command_name(&command), ?log_level, ?output_format)
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "carmock",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Serve(args) => {
            crate::cli::serve::run(&args, out, output_format, terminal_client).await
        }
        Command::Replay(args) => {
            crate::cli::replay::run(&args, out, output_format, terminal_client).await
        }
        Command::Commands(args) => {
            crate::cli::commands::run(&args, out, output_format, terminal_client)
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Serve(_args) => "serve",
        Command::Replay(_args) => "replay",
        Command::Commands(_args) => "commands",
    }
}
