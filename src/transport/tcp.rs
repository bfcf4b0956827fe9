use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use super::{Advertisement, AttStatus, Notifier, Peripheral, PeripheralAdapter, ServeSummary};
use crate::error::TransportError;
use crate::table::{ResponseFrame, UNKNOWN_COMMAND_FRAME};
use crate::utils::escape_frame;

/// Address ELM327 Wi-Fi adapters conventionally listen on, restricted to loopback.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:35000";

/// ELM327 "print device identifier" command, served from the read path.
const READ_IDENTITY_FRAME: &[u8] = b"AT@2\r";

const MAX_FRAME_LEN: usize = 256;

/// Splits a byte stream into writes ending at the last buffered `\r`.
///
/// Everything a client sent up to its final `\r` is one write, so a burst like
/// `ATZ\rATE0\r\r\r` arrives whole, as it would over a single BLE write. Input that grows
/// past `max_len` without a terminator is emitted as its own frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandFrameCodec {
    max_len: usize,
}

impl CommandFrameCodec {
    pub(crate) fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl Decoder for CommandFrameCodec {
    type Item = Vec<u8>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(position) = src.iter().rposition(|byte| *byte == b'\r') {
            return Ok(Some(src.split_to(position + 1).to_vec()));
        }
        if src.len() >= self.max_len {
            return Ok(Some(src.split_to(self.max_len).to_vec()));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(src.split().to_vec()))
    }
}

/// The single subscriber slot notifications are routed to.
#[derive(Debug, Default)]
struct SubscriberSlot {
    current: Mutex<Option<(u64, mpsc::UnboundedSender<Vec<u8>>)>>,
}

impl SubscriberSlot {
    fn is_attached(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(_, sender)| !sender.is_closed())
    }

    fn attach(&self, connection: u64, sender: mpsc::UnboundedSender<Vec<u8>>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some((connection, sender));
    }

    fn detach(&self, connection: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current
            .as_ref()
            .is_some_and(|(attached, _)| *attached == connection)
        {
            *current = None;
        }
    }
}

#[async_trait]
impl Notifier for SubscriberSlot {
    async fn notify(&self, frame: &ResponseFrame) -> Result<(), TransportError> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((_, sender)) = current.as_ref() else {
            return Err(TransportError::NoSubscriber);
        };
        sender
            .send(frame.as_bytes().to_vec())
            .map_err(|_closed| TransportError::NoSubscriber)
    }
}

#[derive(Debug, Default)]
struct ServeCounters {
    connections: AtomicUsize,
    refused: AtomicUsize,
    writes: AtomicUsize,
    reads: AtomicUsize,
}

impl ServeCounters {
    fn summary(&self) -> ServeSummary {
        ServeSummary {
            connections: self.connections.load(Ordering::SeqCst),
            refused: self.refused.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            reads: self.reads.load(Ordering::SeqCst),
        }
    }
}

/// TCP transport in the style of ELM327 Wi-Fi adapters.
///
/// Serves one subscriber at a time. Each chunk a client sends, up to its last `\r`, is a
/// write; `AT@2\r` is answered from the read path; notifications are written back to the
/// socket. A refused write is answered with `?\r\r>`.
#[derive(Debug)]
pub struct TcpPeripheral {
    listener: TcpListener,
    slot: Arc<SubscriberSlot>,
    advertisement: Option<Advertisement>,
}

impl TcpPeripheral {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn bind(address: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            slot: Arc::new(SubscriberSlot::default()),
            advertisement: None,
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl Peripheral for TcpPeripheral {
    fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.slot) as Arc<dyn Notifier>
    }

    async fn start_advertising(
        &mut self,
        advertisement: &Advertisement,
    ) -> Result<(), TransportError> {
        info!(
            service = advertisement.service_uuid(),
            local_name = advertisement.local_name(),
            address = %self.local_addr()?,
            "advertising adapter"
        );
        self.advertisement = Some(advertisement.clone());
        Ok(())
    }

    #[instrument(skip_all, level = "debug")]
    async fn serve(
        self: Box<Self>,
        adapter: PeripheralAdapter,
        cancel: CancellationToken,
    ) -> Result<ServeSummary, TransportError> {
        let Self {
            listener,
            slot,
            advertisement,
        } = *self;
        if advertisement.is_none() {
            debug!("serving without a prior advertisement");
        }

        let counters = Arc::new(ServeCounters::default());
        let mut next_connection = 1u64;

        loop {
            let (stream, peer) = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        warn!(%error, "failed to accept connection");
                        continue;
                    }
                },
            };

            if slot.is_attached() {
                warn!(%peer, "refusing second subscriber");
                counters.refused.fetch_add(1, Ordering::SeqCst);
                drop(stream);
                continue;
            }

            let connection = next_connection;
            next_connection += 1;
            let (sender, outbound) = mpsc::unbounded_channel();
            slot.attach(connection, sender);
            counters.connections.fetch_add(1, Ordering::SeqCst);
            info!(%peer, connection, "subscriber connected");

            let task = ConnectionTask {
                connection,
                adapter: adapter.clone(),
                slot: Arc::clone(&slot),
                counters: Arc::clone(&counters),
                cancel: cancel.child_token(),
            };
            tokio::spawn(
                task.run(stream, outbound)
                    .instrument(info_span!("connection", %peer, connection)),
            );
        }

        Ok(counters.summary())
    }
}

struct ConnectionTask {
    connection: u64,
    adapter: PeripheralAdapter,
    slot: Arc<SubscriberSlot>,
    counters: Arc<ServeCounters>,
    cancel: CancellationToken,
}

impl ConnectionTask {
    async fn run(self, stream: TcpStream, mut outbound: mpsc::UnboundedReceiver<Vec<u8>>) {
        if let Err(error) = self.exchange(stream, &mut outbound).await {
            warn!(%error, "connection closed with error");
        }
        self.slot.detach(self.connection);
        info!("subscriber disconnected");
    }

    async fn exchange(
        &self,
        stream: TcpStream,
        outbound: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Result<(), TransportError> {
        let (reader, mut writer) = stream.into_split();
        let mut frames = FramedRead::new(reader, CommandFrameCodec::new(MAX_FRAME_LEN));

        let ready = self.adapter.on_subscriber_ready_for_update();
        writer.write_all(ready.as_bytes()).await?;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                inbound = frames.next() => {
                    let Some(frame) = inbound else {
                        return Ok(());
                    };
                    let frame = frame?;
                    if frame == READ_IDENTITY_FRAME {
                        self.counters.reads.fetch_add(1, Ordering::SeqCst);
                        let mut identity = self.adapter.on_read_received();
                        identity.extend_from_slice(b"\r\r>");
                        writer.write_all(&identity).await?;
                        continue;
                    }

                    self.counters.writes.fetch_add(1, Ordering::SeqCst);
                    let reply = self.adapter.on_write_received(&frame);
                    debug!(
                        frame = %escape_frame(&frame),
                        status = reply.status().code(),
                        "write handled"
                    );
                    if reply.status() == AttStatus::ValueNotAllowed {
                        writer.write_all(UNKNOWN_COMMAND_FRAME).await?;
                    }
                }
                Some(payload) = outbound.recv() => {
                    writer.write_all(&payload).await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn decode_all(input: &[u8], max_len: usize) -> Vec<Vec<u8>> {
        let mut codec = CommandFrameCodec::new(max_len);
        let mut buffer = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut buffer).expect("decode should not fail") {
            frames.push(frame);
        }
        if let Some(frame) = codec.decode_eof(&mut buffer).expect("eof should not fail") {
            frames.push(frame);
        }
        frames
    }

    #[rstest]
    #[case(b"ATZ\r".as_slice(), vec![b"ATZ\r".to_vec()])]
    #[case(b"ATE0\r0100\r".as_slice(), vec![b"ATE0\r0100\r".to_vec()])]
    #[case(b"\r\r".as_slice(), vec![b"\r\r".to_vec()])]
    #[case(b"ATZ\rAT".as_slice(), vec![b"ATZ\r".to_vec(), b"AT".to_vec()])]
    #[case(b"0902".as_slice(), vec![b"0902".to_vec()])]
    fn codec_frames_up_to_last_carriage_return(
        #[case] input: &[u8],
        #[case] expected: Vec<Vec<u8>>,
    ) {
        assert_eq!(expected, decode_all(input, MAX_FRAME_LEN));
    }

    #[test]
    fn codec_caps_unterminated_input() {
        let frames = decode_all(b"AAAAAA", 4);
        assert_eq!(vec![b"AAAA".to_vec(), b"AA".to_vec()], frames);
    }

    #[test]
    fn codec_waits_for_terminator() {
        let mut codec = CommandFrameCodec::new(MAX_FRAME_LEN);
        let mut buffer = BytesMut::from(&b"01"[..]);
        assert_eq!(None, codec.decode(&mut buffer).expect("decode should not fail"));
        assert_eq!(2, buffer.len());
    }

    #[tokio::test]
    async fn subscriber_slot_refuses_without_subscriber() {
        let slot = SubscriberSlot::default();
        let result = slot.notify(&ResponseFrame::from("OK\r\r>")).await;
        assert!(matches!(result, Err(TransportError::NoSubscriber)));
    }

    #[tokio::test]
    async fn subscriber_slot_detach_ignores_stale_connection() {
        let slot = SubscriberSlot::default();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        slot.attach(2, sender);
        slot.detach(1);

        slot.notify(&ResponseFrame::from("OK\r\r>"))
            .await
            .expect("attached subscriber should receive");
        assert_eq!(Some(b"OK\r\r>".to_vec()), receiver.recv().await);
        assert!(slot.is_attached());
    }
}
