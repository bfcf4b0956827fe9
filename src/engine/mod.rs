mod config;
mod sequencer;
mod session;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use self::sequencer::{BatchKind, Playback, ScheduledBatch, spawn_concurrent, spawn_sequencer};
use crate::error::EngineError;
use crate::table::{CommandTable, ResponseFrame, ResponseSequence};
use crate::transport::Notifier;
use crate::utils::escape_frame;

pub use self::config::{DEFAULT_FRAME_INTERVAL, EngineConfig, MalformedWritePolicy, OverlapPolicy};
pub use self::session::{SequenceId, Session};

/// Table-driven ELM327 session engine.
///
/// Resolves inbound command frames against an injected [`CommandTable`] and plays the
/// matching response frames to a [`Notifier`], one frame per configured interval. Handles are
/// cheap to clone and share one session.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    table: Arc<CommandTable>,
    config: EngineConfig,
    playback: Arc<Playback>,
    batches: mpsc::UnboundedSender<ScheduledBatch>,
    next_sequence: AtomicU64,
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("commands", &self.inner.table.len())
            .field("config", &self.inner.config)
            .field("session", self.session())
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Creates the session and spawns its sequencer on the current tokio runtime.
    ///
    /// ```
    /// # async fn demo(notifier: std::sync::Arc<dyn carmock::Notifier>) -> anyhow::Result<()> {
    /// use std::sync::Arc;
    ///
    /// let table = Arc::new(carmock::elm327_table(&[])?);
    /// let engine = carmock::SessionEngine::start(carmock::EngineConfig::default(), table, notifier);
    /// engine.on_command_received(b"ATE0\r")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn start(
        config: EngineConfig,
        table: Arc<CommandTable>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(Session::new(
            config.identity().to_vec(),
            config.initial_value().clone(),
        ));
        let playback = Arc::new(Playback::new(session, notifier, config.frame_interval()));
        let (batches, receiver) = mpsc::unbounded_channel();
        spawn_sequencer(Arc::clone(&playback), receiver);

        Self {
            inner: Arc::new(EngineInner {
                table,
                config,
                playback,
                batches,
                next_sequence: AtomicU64::new(1),
            }),
        }
    }

    /// Resolves one inbound command frame and schedules its response frames.
    ///
    /// Returns as soon as the frames are scheduled. Unknown commands leave the pending value
    /// untouched; when the table defines a fallback frame it is delivered once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] for non-UTF-8 frames, [`EngineError::UnknownCommand`]
    /// for frames missing from the table, [`EngineError::Busy`] when the overlap policy refuses
    /// the command, and [`EngineError::Stopped`] if the sequencer is gone.
    #[instrument(skip(self, frame), level = "debug", fields(frame = %escape_frame(frame)))]
    pub fn on_command_received(&self, frame: &[u8]) -> Result<SequenceId, EngineError> {
        let command = std::str::from_utf8(frame)
            .inspect_err(|error| warn!(%error, "discarding undecodable command frame"))?;

        let Some(sequence) = self.inner.table.lookup(command.as_bytes()) else {
            let command = command.escape_debug().to_string();
            warn!(%command, "unrecognised command");
            if let Some(fallback) = self.inner.table.fallback() {
                let fallback = ResponseSequence::single(fallback.clone());
                if let Err(error) = self.schedule(&command, fallback, BatchKind::Fallback) {
                    debug!(%error, "fallback frame not scheduled");
                }
            }
            return Err(EngineError::UnknownCommand { command });
        };

        let id = self.schedule(
            &command.escape_debug().to_string(),
            sequence.clone(),
            BatchKind::Response,
        )?;
        info!(sequence = %id, frames = sequence.len(), "scheduled response sequence");
        Ok(id)
    }

    /// Returns the static identity served to read requests.
    #[must_use]
    pub fn on_read_requested(&self) -> &[u8] {
        self.session().identity()
    }

    /// Returns the most recently emitted frame for a subscriber that became ready.
    #[must_use]
    pub fn on_subscriber_ready(&self) -> ResponseFrame {
        self.session().pending_value()
    }

    /// Returns whether any accepted sequence has frames left to play.
    #[must_use]
    pub fn is_sequence_in_flight(&self) -> bool {
        self.session().in_flight() > 0
    }

    /// Waits until every accepted sequence has finished playing.
    pub async fn wait_until_idle(&self) {
        self.session().wait_until_idle().await;
    }

    /// Returns the session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        self.inner.playback.session()
    }

    /// Returns the command table this engine serves.
    #[must_use]
    pub fn table(&self) -> &CommandTable {
        &self.inner.table
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn schedule(
        &self,
        command: &str,
        frames: ResponseSequence,
        kind: BatchKind,
    ) -> Result<SequenceId, EngineError> {
        let id = SequenceId::new(self.inner.next_sequence.fetch_add(1, Ordering::Relaxed));
        let policy = self.inner.config.overlap_policy();
        self.session()
            .try_begin(id, policy)
            .map_err(|active| EngineError::Busy {
                command: command.to_string(),
                active,
            })?;

        let batch = ScheduledBatch { id, frames, kind };
        if policy == OverlapPolicy::Interleave {
            spawn_concurrent(Arc::clone(&self.inner.playback), batch);
            return Ok(id);
        }

        if self.inner.batches.send(batch).is_err() {
            self.session().abandon(id);
            return Err(EngineError::Stopped);
        }
        Ok(id)
    }
}
