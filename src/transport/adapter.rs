use tracing::{debug, instrument, warn};

use crate::engine::{MalformedWritePolicy, SequenceId, SessionEngine};
use crate::error::EngineError;
use crate::table::ResponseFrame;

/// Status a transport returns for an inbound write request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AttStatus {
    /// The write was accepted.
    Success,
    /// The written value was refused.
    ValueNotAllowed,
}

impl AttStatus {
    /// ATT protocol error code carried on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::ValueNotAllowed => 0x13,
        }
    }
}

/// Reply a transport relays for one inbound write, plus the engine's verdict.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WriteReply {
    status: AttStatus,
    outcome: Result<SequenceId, EngineError>,
}

impl WriteReply {
    /// Status to send back over the transport.
    #[must_use]
    pub fn status(&self) -> AttStatus {
        self.status
    }

    /// What the engine did with the command.
    #[must_use]
    pub fn outcome(&self) -> &Result<SequenceId, EngineError> {
        &self.outcome
    }

    /// Consumes the reply, returning the engine's verdict.
    pub fn into_outcome(self) -> Result<SequenceId, EngineError> {
        self.outcome
    }
}

/// Bridges transport callbacks to a [`SessionEngine`].
#[derive(Debug, Clone)]
pub struct PeripheralAdapter {
    engine: SessionEngine,
}

impl PeripheralAdapter {
    #[must_use]
    pub fn new(engine: SessionEngine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Handles one inbound write.
    ///
    /// Writes are acknowledged even when the command is unknown or refused; only undecodable
    /// frames can be answered with an error, and only under [`MalformedWritePolicy::Reject`].
    #[instrument(skip(self, bytes), level = "debug", fields(len = bytes.len()))]
    pub fn on_write_received(&self, bytes: &[u8]) -> WriteReply {
        let outcome = self.engine.on_command_received(bytes);
        let status = match &outcome {
            Err(EngineError::Decode(_))
                if self.engine.config().malformed_writes() == MalformedWritePolicy::Reject =>
            {
                AttStatus::ValueNotAllowed
            }
            _ => AttStatus::Success,
        };

        match &outcome {
            Ok(sequence) => debug!(%sequence, "write accepted"),
            Err(error) => warn!(%error, status = ?status, "write not played"),
        }

        WriteReply { status, outcome }
    }

    /// Handles a read request with the session identity.
    #[must_use]
    pub fn on_read_received(&self) -> Vec<u8> {
        self.engine.on_read_requested().to_vec()
    }

    /// Returns the value to push to a subscriber that became ready for updates.
    #[must_use]
    pub fn on_subscriber_ready_for_update(&self) -> ResponseFrame {
        self.engine.on_subscriber_ready()
    }
}
