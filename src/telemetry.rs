use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::ProgressStyle;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing::{Level, Metadata};
use tracing_indicatif::{IndicatifLayer, TickSettings};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::{self, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::TelemetryError;

/// Spans outside this crate never drive the serve spinner.
const PROGRESS_TARGET_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

const SPINNER_TICK: Duration = Duration::from_millis(120);

static TRACING: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Installs the global subscriber for the emulator.
///
/// Logs go to stderr: pretty with a spinner when stderr is an interactive terminal, JSON lines
/// otherwise. `level_override` replaces `RUST_LOG`. Only the first call has any effect.
pub(crate) fn initialise_tracing(
    service_name: &str,
    interactive_terminal: bool,
    level_override: Option<LevelFilter>,
) -> Result<(), &'static TelemetryError> {
    TRACING
        .get_or_init(|| {
            let tracer = install_tracer(service_name);
            let log_filter = log_filter(level_override);
            if interactive_terminal && io::stderr().is_terminal() {
                install_interactive(tracer, log_filter)
            } else {
                install_json(tracer, log_filter)
            }
        })
        .as_ref()
        .copied()
}

fn install_tracer(service_name: &str) -> SdkTracer {
    let provider = SdkTracerProvider::builder().build();
    let tracer = provider.tracer(service_name.to_owned());
    global::set_tracer_provider(provider);
    tracer
}

fn log_filter(level_override: Option<LevelFilter>) -> EnvFilter {
    level_override.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        |level| EnvFilter::default().add_directive(level.into()),
    )
}

fn install_interactive(tracer: SdkTracer, log_filter: EnvFilter) -> Result<(), TelemetryError> {
    let indicatif = IndicatifLayer::new()
        .with_progress_style(spinner_style())
        .with_tick_settings(TickSettings {
            default_tick_interval: Some(SPINNER_TICK),
            ..TickSettings::default()
        });
    let console = fmt::layer()
        .pretty()
        .with_target(false)
        .with_writer(indicatif.get_stderr_writer())
        .with_filter(log_filter);

    tracing_subscriber::registry()
        .with(console)
        .with(indicatif.with_filter(filter::filter_fn(drives_spinner)))
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()?;
    Ok(())
}

fn install_json(tracer: SdkTracer, log_filter: EnvFilter) -> Result<(), TelemetryError> {
    let json = fmt::layer()
        .json()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(log_filter);

    tracing_subscriber::registry()
        .with(json)
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()?;
    Ok(())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green.bold} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_error| ProgressStyle::default_spinner())
}

fn drives_spinner(metadata: &Metadata<'_>) -> bool {
    metadata.is_span()
        && metadata.target().starts_with(PROGRESS_TARGET_PREFIX)
        && *metadata.level() <= Level::INFO
}
