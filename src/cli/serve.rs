use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::command::{EmulationArgs, OutputFormat};
use crate::cli::write_json_line;
use crate::engine::{MalformedWritePolicy, SessionEngine};
use crate::error::TransportError;
use crate::protocol::DEFAULT_LOCAL_NAME;
use crate::table::elm327_table;
use crate::terminal::TerminalClient;
use crate::transport::{
    Advertisement, DEFAULT_BIND_ADDRESS, Peripheral, PeripheralAdapter, ServeSummary,
    TcpPeripheral,
};

use super::ui::{Painter, ServeReadyView, ServeSummaryView};

/// Arguments for the `serve` command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    emulation: EmulationArgs,
    /// Address to accept adapter connections on.
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: String,
    /// Local name announced while advertising (at most 8 bytes).
    #[arg(long, default_value = DEFAULT_LOCAL_NAME)]
    local_name: String,
    /// Answer undecodable command writes with an error instead of acknowledging them.
    #[arg(long)]
    nak_malformed: bool,
}

impl ServeArgs {
    /// Creates serve arguments for programmatic runs.
    #[must_use]
    pub fn new(emulation: EmulationArgs, bind: impl Into<String>) -> Self {
        Self {
            emulation,
            bind: bind.into(),
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            nak_malformed: false,
        }
    }

    pub(crate) fn emulation(&self) -> &EmulationArgs {
        &self.emulation
    }

    fn malformed_writes(&self) -> MalformedWritePolicy {
        if self.nak_malformed {
            MalformedWritePolicy::Reject
        } else {
            MalformedWritePolicy::Acknowledge
        }
    }
}

/// Executes the `serve` command until Ctrl+C.
pub(crate) async fn run<W>(
    args: &ServeArgs,
    out: &mut W,
    output_format: OutputFormat,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let result = run_until_cancelled(args, out, output_format, terminal_client, cancel).await;
    interrupt.abort();
    result
}

/// Executes `serve` until `cancel` fires.
pub(crate) async fn run_until_cancelled<W>(
    args: &ServeArgs,
    out: &mut W,
    output_format: OutputFormat,
    terminal_client: &dyn TerminalClient,
    cancel: CancellationToken,
) -> Result<()>
where
    W: io::Write,
{
    let painter = Painter::new(
        output_format == OutputFormat::Pretty && terminal_client.stdout_is_terminal(),
    );
    let advertisement = Advertisement::new(args.local_name.clone())?;
    let emulation = args.emulation();
    let table = Arc::new(elm327_table(emulation.codes())?);
    let config = emulation.engine_config(args.malformed_writes());

    let mut peripheral = TcpPeripheral::bind(&args.bind).await?;
    let address = peripheral.local_addr()?;
    let engine = SessionEngine::start(config, table, peripheral.notifier());
    peripheral.start_advertising(&advertisement).await?;

    let ready = ServeReadyView::new(address, &advertisement, &engine, &painter);
    match output_format {
        OutputFormat::Pretty => writeln!(out, "{ready}")?,
        OutputFormat::Json => write_json_line(out, &ready.record())?,
    }
    out.flush()?;

    let summary = serve_adapter(peripheral, PeripheralAdapter::new(engine), cancel).await?;

    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ServeSummaryView::new(&summary, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &summary)?,
    }
    Ok(())
}

#[instrument(skip_all, level = "info")]
async fn serve_adapter(
    peripheral: TcpPeripheral,
    adapter: PeripheralAdapter,
    cancel: CancellationToken,
) -> Result<ServeSummary, TransportError> {
    let span = tracing::Span::current();
    span.pb_set_message("Serving emulated adapter (Ctrl+C to stop)");
    let summary = Box::new(peripheral).serve(adapter, cancel).await?;
    span.pb_set_finish_message(&format!("{} Stopped", "✓".green()));
    Ok(summary)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => debug!("received Ctrl+C"),
        Err(source) => {
            let error = TransportError::CtrlC { source };
            tracing::warn!(%error, "stopping without a Ctrl+C handler");
        }
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Headless;

    impl TerminalClient for Headless {
        fn stdout_is_terminal(&self) -> bool {
            false
        }

        fn stderr_is_terminal(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn cancelled_serve_reports_ready_and_empty_summary() {
        let args = ServeArgs::new(EmulationArgs::default(), "127.0.0.1:0");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();

        run_until_cancelled(&args, &mut out, OutputFormat::Json, &Headless, cancel)
            .await
            .expect("serve should stop cleanly");

        let output = String::from_utf8(out).expect("output should be UTF-8");
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
            .collect();
        assert_eq!(2, lines.len());
        assert_eq!("CarMock", lines[0]["local_name"]);
        assert_eq!("2s", lines[0]["frame_interval"]);
        assert_eq!("queue", lines[0]["overlap_policy"]);
        assert_eq!(0, lines[1]["connections"]);
        assert_eq!(0, lines[1]["writes"]);
    }

    #[tokio::test]
    async fn long_local_name_is_rejected_before_binding() {
        let mut args = ServeArgs::new(EmulationArgs::default(), "127.0.0.1:0");
        args.local_name = "CarMockLong".into();
        let mut out = Vec::new();

        let result = run_until_cancelled(
            &args,
            &mut out,
            OutputFormat::Json,
            &Headless,
            CancellationToken::new(),
        )
        .await;

        let error = result.expect_err("long local name should fail");
        assert!(error.to_string().contains("exceeds 8 bytes"));
        assert!(out.is_empty());
    }
}
