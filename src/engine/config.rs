use std::time::Duration;

use bon::Builder;
use strum_macros::Display;

use crate::table::ResponseFrame;

/// Delay between consecutive response frames, matching the reference adapter.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_secs(2);

/// What the engine does with a command that arrives while another sequence is still playing.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display)]
pub enum OverlapPolicy {
    /// Accept the command and play its frames after every earlier sequence has finished.
    #[default]
    #[strum(to_string = "queue")]
    Queue,
    /// Refuse the command with `EngineError::Busy`.
    #[strum(to_string = "reject")]
    Reject,
    /// Start playing immediately; frames of concurrent sequences may interleave.
    #[strum(to_string = "interleave")]
    Interleave,
}

/// How the transport answers a write whose bytes are not a decodable command.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display)]
pub enum MalformedWritePolicy {
    /// Acknowledge the write like a real adapter tolerating garbage input.
    #[default]
    #[strum(to_string = "acknowledge")]
    Acknowledge,
    /// Answer the write with an ATT error.
    #[strum(to_string = "reject")]
    Reject,
}

/// Settings for one emulated adapter session.
///
/// ```
/// use std::time::Duration;
///
/// let config = carmock::EngineConfig::builder()
///     .frame_interval(Duration::from_millis(10))
///     .overlap_policy(carmock::OverlapPolicy::Reject)
///     .identity("P0301")
///     .build();
/// assert_eq!(b"P0301", config.identity());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct EngineConfig {
    #[builder(default = DEFAULT_FRAME_INTERVAL)]
    frame_interval: Duration,
    #[builder(default)]
    overlap_policy: OverlapPolicy,
    #[builder(default)]
    malformed_writes: MalformedWritePolicy,
    #[builder(default = ResponseFrame::power_on_trigger())]
    initial_value: ResponseFrame,
    #[builder(default, into)]
    identity: Vec<u8>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    #[must_use]
    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    #[must_use]
    pub fn malformed_writes(&self) -> MalformedWritePolicy {
        self.malformed_writes
    }

    /// Value served to subscribers before any frame has been emitted.
    #[must_use]
    pub fn initial_value(&self) -> &ResponseFrame {
        &self.initial_value
    }

    /// Static bytes served to read requests.
    #[must_use]
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }
}
