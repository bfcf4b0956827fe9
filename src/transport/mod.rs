mod adapter;
mod recording;
mod tcp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::protocol::{self, DEFAULT_LOCAL_NAME, EndpointId, MAX_LOCAL_NAME_LEN};
use crate::table::ResponseFrame;

pub use self::adapter::{AttStatus, PeripheralAdapter, WriteReply};
pub use self::recording::{RecordedNotification, RecordingNotifier};
pub use self::tcp::{DEFAULT_BIND_ADDRESS, TcpPeripheral};

/// Pushes response frames to whichever remote peer is subscribed.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one frame as an asynchronous update.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoSubscriber`] when nobody is subscribed; the engine treats
    /// that as a no-op.
    async fn notify(&self, frame: &ResponseFrame) -> Result<(), TransportError>;
}

/// A transport that exposes the emulated adapter to remote peers.
#[async_trait]
pub trait Peripheral: Send {
    /// Notifier the engine should deliver response frames through.
    fn notifier(&self) -> Arc<dyn Notifier>;

    /// Starts announcing the adapter service.
    async fn start_advertising(
        &mut self,
        advertisement: &Advertisement,
    ) -> Result<(), TransportError>;

    /// Relays inbound events to `adapter` until `cancel` fires.
    async fn serve(
        self: Box<Self>,
        adapter: PeripheralAdapter,
        cancel: CancellationToken,
    ) -> Result<ServeSummary, TransportError>;
}

/// What a peripheral announces while advertising.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Advertisement {
    local_name: String,
}

impl Default for Advertisement {
    fn default() -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
        }
    }
}

impl Advertisement {
    /// Creates an advertisement for the adapter service.
    ///
    /// # Errors
    ///
    /// Returns an error when `local_name` is longer than the advertisement allows.
    pub fn new(local_name: impl Into<String>) -> Result<Self, TransportError> {
        let local_name = local_name.into();
        if local_name.len() > MAX_LOCAL_NAME_LEN {
            return Err(TransportError::LocalNameTooLong {
                name: local_name,
                max: MAX_LOCAL_NAME_LEN,
            });
        }
        Ok(Self { local_name })
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    #[must_use]
    pub fn service_uuid(&self) -> &'static str {
        protocol::endpoint_metadata(EndpointId::AdapterService).uuid()
    }

    #[must_use]
    pub fn characteristic_uuid(&self) -> &'static str {
        protocol::endpoint_metadata(EndpointId::AdapterCharacteristic).uuid()
    }
}

/// Counters reported when a peripheral stops serving.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct ServeSummary {
    pub(crate) connections: usize,
    pub(crate) refused: usize,
    pub(crate) writes: usize,
    pub(crate) reads: usize,
}

impl ServeSummary {
    /// Subscribers that were accepted.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections
    }

    /// Connections turned away because a subscriber was already attached.
    #[must_use]
    pub fn refused(&self) -> usize {
        self.refused
    }

    /// Command frames relayed to the engine.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Read requests answered with the identity.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn advertisement_rejects_long_local_name() {
        let result = Advertisement::new("CarMock-Long");
        assert_matches!(
            result,
            Err(TransportError::LocalNameTooLong { max: 8, .. })
        );
    }

    #[test]
    fn default_advertisement_uses_adapter_service() {
        let advertisement = Advertisement::default();
        assert_eq!("CarMock", advertisement.local_name());
        assert_eq!(
            "4F9289BC-7CCE-45B4-AD12-4D142BF62C28",
            advertisement.service_uuid()
        );
    }
}
