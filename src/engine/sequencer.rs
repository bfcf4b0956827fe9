use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, instrument, trace, warn};

use super::session::{SequenceId, Session};
use crate::error::TransportError;
use crate::table::ResponseSequence;
use crate::transport::Notifier;

/// Whether a batch answers a known command or is the table's unknown-command fallback.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum BatchKind {
    Response,
    /// Delivered to the subscriber without replacing the session's pending value.
    Fallback,
}

/// One accepted batch of response frames.
#[derive(Debug, Clone)]
pub(crate) struct ScheduledBatch {
    pub(crate) id: SequenceId,
    pub(crate) frames: ResponseSequence,
    pub(crate) kind: BatchKind,
}

/// Plays batches against a session and a notifier.
pub(crate) struct Playback {
    session: Arc<Session>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl Playback {
    pub(crate) fn new(session: Arc<Session>, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self {
            session,
            notifier,
            interval,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Emits frame `k` of the batch `(k + 1)` intervals after playback starts.
    #[instrument(
        skip(self, batch),
        level = "debug",
        fields(sequence = %batch.id, frames = batch.frames.len(), kind = ?batch.kind)
    )]
    pub(crate) async fn play(&self, batch: ScheduledBatch) {
        let mut deadline = Instant::now();
        for (index, frame) in batch.frames.iter().enumerate() {
            deadline += self.interval;
            sleep_until(deadline).await;

            if batch.kind == BatchKind::Response {
                self.session.record_emission(frame);
            }
            match self.notifier.notify(frame).await {
                Ok(()) => trace!(index, %frame, "delivered response frame"),
                Err(TransportError::NoSubscriber) => {
                    debug!(index, "no subscriber attached; notification dropped");
                }
                Err(error) => warn!(index, %error, "failed to deliver response frame"),
            }
        }
        self.session.finish(batch.id);
    }
}

/// Spawns the task that plays queued batches one after another.
///
/// The task ends once every sender of `batches` is dropped.
pub(crate) fn spawn_sequencer(
    playback: Arc<Playback>,
    mut batches: mpsc::UnboundedReceiver<ScheduledBatch>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(batch) = batches.recv().await {
                playback.play(batch).await;
            }
            debug!("sequencer stopped");
        }
        .instrument(tracing::debug_span!("sequencer")),
    )
}

/// Spawns a detached task playing one batch alongside any others.
pub(crate) fn spawn_concurrent(playback: Arc<Playback>, batch: ScheduledBatch) -> JoinHandle<()> {
    tokio::spawn(async move { playback.play(batch).await })
}
