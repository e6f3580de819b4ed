//! # Session State Machine
//!
//! Owns one control transport and one data transport, serializes control
//! request/response exchanges over the former, and forwards decoded data
//! frames from the latter to a consumer channel. Background tasks own
//! nothing but a transport's inbound receiver; the pending-response slot,
//! connection state, and `iq_started` flag live behind shared locks so the
//! tasks and the foreground `Session` methods agree on them.

use std::sync::{Arc, Mutex as StdMutex};

use bytes::{Buf, Bytes, BytesMut};
use netsdr_protocol::frame::{self, ControlItemCode, Frame, MessageType};
use netsdr_protocol::ProtocolError;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::config::NetSdrConfig;
use crate::error::ClientError;
use crate::transport::{ControlTransport, DataTransport};

/// Body byte requesting the run state in a `ReceiverState` `SetControlItem`.
///
/// The NetSDR interface spec reserves the low byte of the receiver-state
/// body for this; this crate only needs the two values it drives directly.
const RECEIVER_STATE_RUN: u8 = 0x02;
/// Body byte requesting the idle state in a `ReceiverState` `SetControlItem`.
const RECEIVER_STATE_IDLE: u8 = 0x01;

/// Connection lifecycle state. `iq_started` is tracked separately (see
/// [`Session`]) because an explicit [`Session::disconnect`] leaves it
/// untouched while a transport-driven forced disconnect resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A decoded data frame handed to the session's consumer.
///
/// `width` is not part of the wire format — it is copied in from
/// [`NetSdrConfig::sample_width_bits`] so the consumer can decode `body`
/// with [`netsdr_protocol::sample::samples`] without threading config
/// through separately.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub sequence: u16,
    pub item: ControlItemCode,
    pub width: u8,
    pub body: Bytes,
}

impl DataFrame {
    /// Decode this frame's body as packed samples at its recorded width.
    pub fn samples(&self) -> Result<netsdr_protocol::sample::SampleIter<'_>, ProtocolError> {
        netsdr_protocol::sample::samples(self.width, &self.body)
    }
}

/// Reassembles length-delimited frames out of arbitrary byte chunks from a
/// stream-oriented control transport.
///
/// A chunk from `ControlTransport::inbound` may contain less than one frame,
/// exactly one frame, or several — the reassembler buffers until a complete
/// frame is available and yields frames one at a time.
#[derive(Default)]
struct FrameReassembler {
    buf: BytesMut,
}

impl FrameReassembler {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete frame out of the buffer, if one is available.
    fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            if self.buf.len() < frame::HEADER_LEN {
                return None;
            }
            let declared_len = frame::frame_len_from_header([self.buf[0], self.buf[1]]);
            if declared_len < frame::HEADER_LEN {
                // A header that declares a frame shorter than itself cannot
                // be a real frame boundary. Resync by dropping one byte
                // rather than stalling forever on corrupt input.
                tracing::warn!(declared_len, "corrupt frame header; resyncing");
                self.buf.advance(1);
                continue;
            }
            if self.buf.len() < declared_len {
                return None;
            }
            return Some(self.buf.split_to(declared_len).freeze());
        }
    }
}

/// Owns the control and data transports for one NetSDR receiver connection.
pub struct Session {
    control: Box<dyn ControlTransport>,
    data: Box<dyn DataTransport>,
    config: NetSdrConfig,
    state: Arc<StdMutex<SessionState>>,
    iq_started: Arc<StdMutex<bool>>,
    pending: Arc<StdMutex<Option<oneshot::Sender<Frame>>>>,
    request_lock: Arc<AsyncMutex<()>>,
    control_task: Option<JoinHandle<()>>,
    data_task: Option<JoinHandle<()>>,
    data_consumer: mpsc::Sender<DataFrame>,
}

impl Session {
    /// Create a session bound to `control` and `data`. Returns the session
    /// alongside the receiving half of the channel decoded data frames are
    /// pushed to.
    pub fn new(
        control: Box<dyn ControlTransport>,
        data: Box<dyn DataTransport>,
        config: NetSdrConfig,
    ) -> (Self, mpsc::Receiver<DataFrame>) {
        let (data_consumer, data_frames) = mpsc::channel(1024);
        let session = Session {
            control,
            data,
            config,
            state: Arc::new(StdMutex::new(SessionState::Disconnected)),
            iq_started: Arc::new(StdMutex::new(false)),
            pending: Arc::new(StdMutex::new(None)),
            request_lock: Arc::new(AsyncMutex::new(())),
            control_task: None,
            data_task: None,
            data_consumer,
        };
        (session, data_frames)
    }

    pub fn is_connected(&self) -> bool {
        *self.state.lock().unwrap() == SessionState::Connected
    }

    pub fn is_iq_started(&self) -> bool {
        *self.iq_started.lock().unwrap()
    }

    /// Open the control and data transports and run the three-request
    /// handshake. Idempotent: a no-op if already connecting or connected.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Disconnected {
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        if let Err(err) = self.open_transports_and_handshake().await {
            *self.state.lock().unwrap() = SessionState::Disconnected;
            self.abort_tasks();
            return Err(err);
        }

        *self.state.lock().unwrap() = SessionState::Connected;
        Ok(())
    }

    async fn open_transports_and_handshake(&mut self) -> Result<(), ClientError> {
        self.control.connect().await?;
        let control_inbound = self
            .control
            .take_inbound()
            .ok_or_else(|| ClientError::Transport("control inbound already taken".into()))?;
        self.control_task = Some(tokio::spawn(control_receive_loop(
            control_inbound,
            self.pending.clone(),
            self.state.clone(),
            self.iq_started.clone(),
        )));

        let data_inbound = self
            .data
            .take_inbound()
            .ok_or_else(|| ClientError::Transport("data inbound already taken".into()))?;
        self.data_task = Some(tokio::spawn(data_receive_loop(
            data_inbound,
            self.config.sample_width_bits,
            self.data_consumer.clone(),
        )));

        // Reference handshake: probe the three control items the reference
        // client reads immediately after connecting, each awaited in turn.
        self.send_control_request(MessageType::CurrentControlItem, ControlItemCode::ReceiverState, &[])
            .await?;
        self.send_control_request(MessageType::CurrentControlItem, ControlItemCode::RFFilter, &[])
            .await?;
        self.send_control_request(MessageType::CurrentControlItem, ControlItemCode::ADModes, &[])
            .await?;
        Ok(())
    }

    /// Close the control transport and stop background tasks. Always safe,
    /// always idempotent — calling it `k` times issues `k` transport
    /// disconnects regardless of prior state.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&mut self) {
        self.control.disconnect().await;
        self.abort_tasks();
        if let Some(tx) = self.pending.lock().unwrap().take() {
            drop(tx); // waiter observes a closed channel -> ClientError::Cancelled
        }
        *self.state.lock().unwrap() = SessionState::Disconnected;
    }

    fn abort_tasks(&mut self) {
        if let Some(handle) = self.control_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.data_task.take() {
            handle.abort();
        }
    }

    /// Start the I/Q stream. No-op if not connected or already started.
    #[tracing::instrument(skip(self))]
    pub async fn start_iq(&mut self) -> Result<(), ClientError> {
        if !self.is_connected() || self.is_iq_started() {
            return Ok(());
        }
        self.send_control_request(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &[RECEIVER_STATE_RUN],
        )
        .await?;
        self.data.start_listening().await?;
        *self.iq_started.lock().unwrap() = true;
        Ok(())
    }

    /// Stop the I/Q stream. No-op if not connected; otherwise always stops
    /// the data transport, and additionally tells the receiver to idle if
    /// streaming had actually been started.
    #[tracing::instrument(skip(self))]
    pub async fn stop_iq(&mut self) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Ok(());
        }
        self.data.stop_listening().await;
        if self.is_iq_started() {
            self.send_control_request(
                MessageType::SetControlItem,
                ControlItemCode::ReceiverState,
                &[RECEIVER_STATE_IDLE],
            )
            .await?;
        }
        *self.iq_started.lock().unwrap() = false;
        Ok(())
    }

    /// Retune the receiver. No-op if not connected.
    ///
    /// The wire body is `channel` (1 byte) followed by the low 40 bits of
    /// `hz`, little-endian — this crate's choice for an unspecified
    /// parameter layout; see `DESIGN.md`.
    pub async fn change_frequency(&mut self, hz: i64, channel: u8) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Ok(());
        }
        let mut params = Vec::with_capacity(6);
        params.push(channel);
        params.extend_from_slice(&hz.to_le_bytes()[..5]);
        self.send_control_request(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverFrequency,
            &params,
        )
        .await?;
        Ok(())
    }

    /// Send one control request and await its reply, serialized against any
    /// other in-flight request on this session.
    async fn send_control_request(
        &mut self,
        msg_type: MessageType,
        item: ControlItemCode,
        params: &[u8],
    ) -> Result<Frame, ClientError> {
        let lock = self.request_lock.clone();
        let _guard = lock.lock().await;

        let encoded = frame::encode_control(msg_type, item, params)?;
        tracing::debug!(?msg_type, ?item, "sending control request");

        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);

        if let Err(err) = self.control.send(&encoded).await {
            self.pending.lock().unwrap().take();
            return Err(err);
        }

        match tokio::time::timeout(self.config.response_timeout(), rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(ClientError::Cancelled),
            Err(_) => {
                self.pending.lock().unwrap().take();
                tracing::warn!(?msg_type, ?item, "control request timed out");
                Err(ClientError::Timeout)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn control_receive_loop(
    mut inbound: mpsc::Receiver<Bytes>,
    pending: Arc<StdMutex<Option<oneshot::Sender<Frame>>>>,
    state: Arc<StdMutex<SessionState>>,
    iq_started: Arc<StdMutex<bool>>,
) {
    let mut reassembler = FrameReassembler::new();
    loop {
        match inbound.recv().await {
            Some(chunk) => {
                reassembler.push(&chunk);
                while let Some(frame_bytes) = reassembler.next_frame() {
                    match frame::decode(&frame_bytes) {
                        Ok(frame) => {
                            tracing::debug!(msg_type = ?frame.msg_type(), "decoded control frame");
                            match pending.lock().unwrap().take() {
                                Some(tx) => {
                                    let _ = tx.send(frame);
                                }
                                None => {
                                    tracing::warn!(
                                        "control frame arrived with no pending request; dropping"
                                    );
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(%err, "dropping malformed control frame");
                        }
                    }
                }
            }
            None => {
                tracing::error!("control transport closed unexpectedly; disconnecting session");
                *state.lock().unwrap() = SessionState::Disconnected;
                *iq_started.lock().unwrap() = false;
                return;
            }
        }
    }
}

async fn data_receive_loop(
    mut inbound: mpsc::Receiver<Bytes>,
    sample_width: u8,
    consumer: mpsc::Sender<DataFrame>,
) {
    while let Some(datagram) = inbound.recv().await {
        match frame::decode(&datagram) {
            Ok(frame) if frame.msg_type().is_data_type() => {
                let data_frame = DataFrame {
                    sequence: frame.sequence_number(),
                    item: frame.item_code(),
                    width: sample_width,
                    body: frame.body().clone(),
                };
                if consumer.send(data_frame).await.is_err() {
                    tracing::debug!("data frame consumer dropped; ending receive loop");
                    return;
                }
            }
            Ok(_) => tracing::warn!("control-type frame arrived on data transport; dropping"),
            Err(err) => tracing::warn!(%err, "dropping malformed data frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembler_yields_frames_split_across_chunks() {
        let frame = frame::encode_control(
            MessageType::Ack,
            ControlItemCode::ReceiverState,
            &[1, 2, 3],
        )
        .unwrap();
        let mut reassembler = FrameReassembler::new();
        reassembler.push(&frame[..3]);
        assert!(reassembler.next_frame().is_none());
        reassembler.push(&frame[3..]);
        let reassembled = reassembler.next_frame().unwrap();
        assert_eq!(&reassembled[..], &frame[..]);
        assert!(reassembler.next_frame().is_none());
    }

    #[test]
    fn reassembler_yields_two_frames_delivered_in_one_chunk() {
        let a = frame::encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &[1])
            .unwrap();
        let b = frame::encode_control(MessageType::Ack, ControlItemCode::RFFilter, &[2, 2])
            .unwrap();
        let mut combined = Vec::new();
        combined.extend_from_slice(&a);
        combined.extend_from_slice(&b);

        let mut reassembler = FrameReassembler::new();
        reassembler.push(&combined);
        assert_eq!(reassembler.next_frame().unwrap(), a);
        assert_eq!(reassembler.next_frame().unwrap(), b);
        assert!(reassembler.next_frame().is_none());
    }

    /// The control-receive loop is what distinguishes a forced disconnect
    /// (transport closed out from under the session) from a session-driven
    /// `disconnect()`: it resets `iq_started`, which the explicit path does
    /// not. Exercised directly against the loop function since the in-process
    /// testkit transport never models the channel actually closing.
    #[tokio::test]
    async fn control_receive_loop_resets_state_when_transport_closes() {
        let (tx, rx) = mpsc::channel(4);
        let pending = Arc::new(StdMutex::new(None));
        let state = Arc::new(StdMutex::new(SessionState::Connected));
        let iq_started = Arc::new(StdMutex::new(true));

        drop(tx);
        control_receive_loop(rx, pending, state.clone(), iq_started.clone()).await;

        assert_eq!(*state.lock().unwrap(), SessionState::Disconnected);
        assert!(!*iq_started.lock().unwrap());
    }

    #[tokio::test]
    async fn control_receive_loop_resolves_pending_request_on_matching_frame() {
        let (tx, rx) = mpsc::channel(4);
        let pending = Arc::new(StdMutex::new(None));
        let state = Arc::new(StdMutex::new(SessionState::Connected));
        let iq_started = Arc::new(StdMutex::new(false));

        let (reply_tx, reply_rx) = oneshot::channel();
        *pending.lock().unwrap() = Some(reply_tx);

        let loop_handle = tokio::spawn(control_receive_loop(
            rx,
            pending.clone(),
            state.clone(),
            iq_started.clone(),
        ));

        let ack = frame::encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &[9])
            .unwrap();
        tx.send(ack).await.unwrap();

        let frame = reply_rx.await.unwrap();
        assert_eq!(frame.item_code(), ControlItemCode::ReceiverState);

        drop(tx);
        loop_handle.await.unwrap();
    }
}
