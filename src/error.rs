use std::io;
use std::str::Utf8Error;

use derive_more::From;
use thiserror::Error;

use crate::engine::SequenceId;
use crate::table::{FrameLiteralError, TableError, TroubleCodeError};

/// Errors returned by the session engine for one inbound command frame.
///
/// None of these are fatal: the session keeps its pending value and keeps serving.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum EngineError {
    #[error("command frame is not valid UTF-8 text")]
    Decode(#[from] Utf8Error),
    #[error("unrecognised command `{command}`")]
    UnknownCommand { command: String },
    #[error("command `{command}` rejected while sequence {active} is still playing")]
    Busy { command: String, active: SequenceId },
    #[error("the response sequencer is no longer running")]
    Stopped,
}

/// Errors raised by transport collaborators.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no subscriber is attached")]
    NoSubscriber,
    #[error("advertised local name `{name}` exceeds {max} bytes")]
    LocalNameTooLong { name: String, max: usize },
    #[error("failed to bind `{address}`")]
    Bind { address: String, source: io::Error },
    #[error("transport I/O failed")]
    Io(#[from] io::Error),
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: io::Error },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level emulator errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum EmulatorError {
    #[error(transparent)]
    #[from(EngineError, Box<EngineError>)]
    Engine(Box<EngineError>),
    #[error(transparent)]
    #[from(TableError, Box<TableError>)]
    Table(Box<TableError>),
    #[error(transparent)]
    #[from(TransportError, Box<TransportError>)]
    Transport(Box<TransportError>),
    #[error(transparent)]
    #[from(FrameLiteralError, Box<FrameLiteralError>)]
    FrameLiteral(Box<FrameLiteralError>),
    #[error(transparent)]
    #[from(TroubleCodeError, Box<TroubleCodeError>)]
    TroubleCode(Box<TroubleCodeError>),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn module_errors_convert_into_boxed_emulator_errors() {
        let error = EmulatorError::from(EngineError::Stopped);
        assert_matches!(error, EmulatorError::Engine(inner) if *inner == EngineError::Stopped);

        let error = EmulatorError::from(TableError::DuplicateCommand {
            command: "ATZ\\r".into(),
        });
        assert_eq!(
            "command `ATZ\\r` is defined more than once",
            error.to_string()
        );

        let error = EmulatorError::from(TransportError::NoSubscriber);
        assert_matches!(error, EmulatorError::Transport(_));
    }
}
