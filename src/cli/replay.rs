use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_with::serde_as;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::cli::command::{EmulationArgs, OutputFormat};
use crate::cli::write_json_line;
use crate::engine::{MalformedWritePolicy, SequenceId, SessionEngine};
use crate::error::EngineError;
use crate::table::{FrameLiteral, elm327_table};
use crate::terminal::TerminalClient;
use crate::transport::{Notifier, RecordedNotification, RecordingNotifier};
use crate::utils::escape_frame;

use super::ui::{Painter, ReplayStepView, ReplaySummaryView};

/// Arguments for the `replay` command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    emulation: EmulationArgs,
    /// Command frame to send, with `\r`-style escapes (e.g. `ATZ\r`). Repeat for several.
    #[arg(long = "frame", value_name = "FRAME", required = true)]
    frames: Vec<String>,
    /// Read `--frame` values as hexadecimal bytes (e.g. `415445300D`).
    #[arg(long)]
    hex: bool,
}

impl ReplayArgs {
    /// Creates replay arguments for escaped text frames.
    #[must_use]
    pub fn new(emulation: EmulationArgs, frames: Vec<String>) -> Self {
        Self {
            emulation,
            frames,
            hex: false,
        }
    }

    fn parse_frames(&self) -> Result<Vec<FrameLiteral>> {
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                if self.hex {
                    FrameLiteral::from_hex(frame)
                } else {
                    frame.parse()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(frames)
    }
}

/// Notification captured during a replay, relative to the replay start.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReplayNotification {
    offset_ms: u64,
    text: String,
    #[serde_as(as = "serde_with::hex::Hex<serde_with::formats::Uppercase>")]
    bytes: Vec<u8>,
}

impl ReplayNotification {
    fn new(start: Instant, notification: &RecordedNotification) -> Self {
        Self {
            offset_ms: u64::try_from(notification.at().saturating_duration_since(start).as_millis())
                .unwrap_or(u64::MAX),
            text: notification.frame().to_string(),
            bytes: notification.frame().as_bytes().to_vec(),
        }
    }

    pub(crate) fn offset(&self) -> Duration {
        Duration::from_millis(self.offset_ms)
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Outcome of one replayed command frame.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReplayStep {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<SequenceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    notifications: Vec<ReplayNotification>,
}

impl ReplayStep {
    pub(crate) fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn sequence(&self) -> Option<SequenceId> {
        self.sequence
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn notifications(&self) -> &[ReplayNotification] {
        &self.notifications
    }
}

/// Session state after every frame was replayed.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReplaySummary {
    commands: usize,
    notifications: usize,
    pending_value: String,
    identity: String,
}

impl ReplaySummary {
    fn new(engine: &SessionEngine, steps: &[ReplayStep]) -> Self {
        Self {
            commands: steps.len(),
            notifications: steps.iter().map(|step| step.notifications.len()).sum(),
            pending_value: engine.on_subscriber_ready().to_string(),
            identity: escape_frame(engine.on_read_requested()),
        }
    }

    pub(crate) fn commands(&self) -> usize {
        self.commands
    }

    pub(crate) fn notifications(&self) -> usize {
        self.notifications
    }

    pub(crate) fn pending_value(&self) -> &str {
        &self.pending_value
    }

    pub(crate) fn identity(&self) -> &str {
        &self.identity
    }
}

/// Executes the `replay` command.
#[instrument(skip_all, level = "info", fields(frames = args.frames.len()))]
pub(crate) async fn run<W>(
    args: &ReplayArgs,
    out: &mut W,
    output_format: OutputFormat,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let painter = Painter::new(
        output_format == OutputFormat::Pretty && terminal_client.stdout_is_terminal(),
    );
    let frames = args.parse_frames()?;
    let table = Arc::new(elm327_table(args.emulation.codes())?);
    let config = args
        .emulation
        .engine_config(MalformedWritePolicy::Acknowledge);
    let recorder = Arc::new(RecordingNotifier::new());
    let engine = SessionEngine::start(config, table, Arc::clone(&recorder) as Arc<dyn Notifier>);

    let start = Instant::now();
    let mut steps = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let outcome = engine.on_command_received(frame.as_bytes());
        engine.wait_until_idle().await;
        let step = replay_step(frame.as_bytes(), outcome, start, &recorder.take());

        match output_format {
            OutputFormat::Pretty => {
                writeln!(out, "{}", ReplayStepView::new(index + 1, &step, &painter))?;
            }
            OutputFormat::Json => write_json_line(out, &step)?,
        }
        steps.push(step);
    }

    let summary = ReplaySummary::new(&engine, &steps);
    info!(
        commands = summary.commands(),
        notifications = summary.notifications(),
        "replay finished"
    );
    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ReplaySummaryView::new(&summary, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &summary)?,
    }
    Ok(())
}

fn replay_step(
    command: &[u8],
    outcome: Result<SequenceId, EngineError>,
    start: Instant,
    recorded: &[RecordedNotification],
) -> ReplayStep {
    let (sequence, error) = match outcome {
        Ok(sequence) => (Some(sequence), None),
        Err(error) => (None, Some(error.to_string())),
    };
    ReplayStep {
        command: escape_frame(command),
        sequence,
        error,
        notifications: recorded
            .iter()
            .map(|notification| ReplayNotification::new(start, notification))
            .collect(),
    }
}
