use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use super::Notifier;
use crate::error::TransportError;
use crate::table::ResponseFrame;

/// One notification captured by a [`RecordingNotifier`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordedNotification {
    at: Instant,
    frame: ResponseFrame,
}

impl RecordedNotification {
    /// When the notification was delivered, on the tokio clock.
    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }

    #[must_use]
    pub fn frame(&self) -> &ResponseFrame {
        &self.frame
    }
}

/// In-memory notifier that records every delivered frame.
///
/// Detaching the subscriber makes `notify` fail with [`TransportError::NoSubscriber`],
/// like a peripheral with nobody subscribed.
#[derive(Debug)]
pub struct RecordingNotifier {
    subscribed: AtomicBool,
    dropped: AtomicUsize,
    log: Mutex<Vec<RecordedNotification>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingNotifier {
    /// Creates a notifier with a subscriber attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribed: AtomicBool::new(true),
            dropped: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Attaches or detaches the simulated subscriber.
    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::SeqCst);
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<RecordedNotification> {
        std::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the recorded frames without clearing them.
    #[must_use]
    pub fn frames(&self) -> Vec<ResponseFrame> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|notification| notification.frame.clone())
            .collect()
    }

    /// Number of notifications refused because no subscriber was attached.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, frame: &ResponseFrame) -> Result<(), TransportError> {
        if !self.subscribed.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::NoSubscriber);
        }

        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedNotification {
                at: Instant::now(),
                frame: frame.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn records_frames_in_delivery_order() {
        let notifier = RecordingNotifier::new();
        notifier
            .notify(&ResponseFrame::from("SEAR"))
            .await
            .expect("attached notifier should accept");
        notifier
            .notify(&ResponseFrame::from("CH"))
            .await
            .expect("attached notifier should accept");

        assert_eq!(
            vec![ResponseFrame::from("SEAR"), ResponseFrame::from("CH")],
            notifier.frames()
        );
        assert_eq!(2, notifier.take().len());
        assert!(notifier.frames().is_empty());
    }

    #[tokio::test]
    async fn detached_notifier_refuses_and_counts() {
        let notifier = RecordingNotifier::new();
        notifier.set_subscribed(false);

        let result = notifier.notify(&ResponseFrame::from("OK\r\r>")).await;

        assert_matches!(result, Err(TransportError::NoSubscriber));
        assert_eq!(1, notifier.dropped());
        assert!(notifier.frames().is_empty());
    }
}
