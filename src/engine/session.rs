use std::collections::VecDeque;

use derive_more::Display;
use serde_with::SerializeDisplay;
use tokio::sync::watch;

use super::config::OverlapPolicy;
use crate::table::ResponseFrame;

/// Identifier assigned to every batch of response frames the engine accepts.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Display, SerializeDisplay)]
#[display("#{_0}")]
pub struct SequenceId(u64);

impl SequenceId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct PlaybackState {
    pending_value: ResponseFrame,
    in_flight: VecDeque<SequenceId>,
    last_completed: Option<SequenceId>,
}

/// Runtime state of one emulated adapter: its identity and the last emitted frame.
///
/// All mutation goes through one watch channel, which serialises updates coming from the
/// inbound path and from playback tasks.
#[derive(Debug)]
pub struct Session {
    identity: Vec<u8>,
    playback: watch::Sender<PlaybackState>,
}

impl Session {
    pub(crate) fn new(identity: Vec<u8>, initial_value: ResponseFrame) -> Self {
        let (playback, _receiver) = watch::channel(PlaybackState {
            pending_value: initial_value,
            in_flight: VecDeque::new(),
            last_completed: None,
        });
        Self { identity, playback }
    }

    /// Static identity served to read requests.
    #[must_use]
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// Most recently emitted response frame.
    #[must_use]
    pub fn pending_value(&self) -> ResponseFrame {
        self.playback.borrow().pending_value.clone()
    }

    /// Number of accepted sequences that have not finished playing.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.playback.borrow().in_flight.len()
    }

    /// The sequence that finished playing most recently.
    #[must_use]
    pub fn last_completed(&self) -> Option<SequenceId> {
        self.playback.borrow().last_completed
    }

    /// Registers a new sequence, or returns the sequence that blocks it under `Reject`.
    pub(crate) fn try_begin(
        &self,
        sequence: SequenceId,
        policy: OverlapPolicy,
    ) -> Result<(), SequenceId> {
        let mut blocked_by = None;
        self.playback.send_if_modified(|state| {
            if policy == OverlapPolicy::Reject
                && let Some(active) = state.in_flight.front()
            {
                blocked_by = Some(*active);
                return false;
            }
            state.in_flight.push_back(sequence);
            true
        });

        match blocked_by {
            Some(active) => Err(active),
            None => Ok(()),
        }
    }

    pub(crate) fn record_emission(&self, frame: &ResponseFrame) {
        self.playback.send_modify(|state| {
            state.pending_value = frame.clone();
        });
    }

    pub(crate) fn finish(&self, sequence: SequenceId) {
        self.playback.send_modify(|state| {
            state.in_flight.retain(|candidate| *candidate != sequence);
            state.last_completed = Some(sequence);
        });
    }

    /// Abandons a sequence that never reached the sequencer.
    pub(crate) fn abandon(&self, sequence: SequenceId) {
        self.playback.send_modify(|state| {
            state.in_flight.retain(|candidate| *candidate != sequence);
        });
    }

    /// Waits until no accepted sequence is left to play.
    pub(crate) async fn wait_until_idle(&self) {
        let mut receiver = self.playback.subscribe();
        if receiver
            .wait_for(|state| state.in_flight.is_empty())
            .await
            .is_err()
        {
            tracing::debug!("playback channel closed while waiting for idle");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn session() -> Session {
        Session::new(b"P0301".to_vec(), ResponseFrame::power_on_trigger())
    }

    #[test]
    fn new_session_serves_initial_value() {
        let session = session();
        assert_eq!(ResponseFrame::power_on_trigger(), session.pending_value());
        assert_eq!(b"P0301", session.identity());
        assert_eq!(0, session.in_flight());
    }

    #[test]
    fn reject_policy_reports_active_sequence() {
        let session = session();
        session
            .try_begin(SequenceId::new(1), OverlapPolicy::Reject)
            .expect("idle session should accept");

        let blocked = session.try_begin(SequenceId::new(2), OverlapPolicy::Reject);
        assert_eq!(Err(SequenceId::new(1)), blocked);
        assert_eq!(1, session.in_flight());
    }

    #[test]
    fn queue_policy_tracks_every_sequence() {
        let session = session();
        for value in 1..=3 {
            session
                .try_begin(SequenceId::new(value), OverlapPolicy::Queue)
                .expect("queue policy should accept");
        }
        assert_eq!(3, session.in_flight());

        session.finish(SequenceId::new(1));
        assert_eq!(2, session.in_flight());
        assert_eq!(Some(SequenceId::new(1)), session.last_completed());
    }

    #[test]
    fn record_emission_replaces_pending_value() {
        let session = session();
        session.record_emission(&ResponseFrame::from("OK\r\r>"));
        assert_eq!(ResponseFrame::from("OK\r\r>"), session.pending_value());
    }

    #[test]
    fn sequence_id_displays_with_hash() {
        assert_eq!("#7", SequenceId::new(7).to_string());
    }
}
