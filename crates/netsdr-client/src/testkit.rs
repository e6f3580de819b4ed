//! In-process [`ControlTransport`]/[`DataTransport`] pair used by this
//! crate's own test suite — not a production transport, no sockets, the
//! same way `strata-transport`'s tests drive its sender/receiver state
//! machines by passing `Bytes` directly between in-process channels.
//!
//! The control transport auto-acknowledges: every frame handed to `send` is
//! immediately echoed back as an `Ack` of the same item code and body,
//! enough to drive the session's handshake and request/response bookkeeping
//! without a real peer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use netsdr_protocol::frame::{self, MessageType};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::ClientError;
use crate::transport::{ControlTransport, DataTransport};

/// In-process control transport that auto-acks every sent control frame.
pub struct TestControlTransport {
    connected: bool,
    sent: Arc<AsyncMutex<Vec<Bytes>>>,
    connect_count: Arc<AtomicUsize>,
    disconnect_count: Arc<AtomicUsize>,
    inbound_tx: mpsc::Sender<Bytes>,
    inbound_rx: Option<mpsc::Receiver<Bytes>>,
}

/// Observer/injector handle for a [`TestControlTransport`], kept by the test.
#[derive(Clone)]
pub struct TestControlHandle {
    sent: Arc<AsyncMutex<Vec<Bytes>>>,
    connect_count: Arc<AtomicUsize>,
    disconnect_count: Arc<AtomicUsize>,
    inbound_tx: mpsc::Sender<Bytes>,
}

impl TestControlHandle {
    pub async fn sent_frames(&self) -> Vec<Bytes> {
        self.sent.lock().await.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    /// Push a raw frame onto the transport's inbound channel, as if the peer
    /// sent it unsolicited.
    pub async fn inject(&self, bytes: Bytes) {
        let _ = self.inbound_tx.send(bytes).await;
    }
}

/// Build a connected pair: the transport the session owns, and the handle
/// the test uses to observe/drive it.
pub fn test_control_transport() -> (TestControlTransport, TestControlHandle) {
    let (tx, rx) = mpsc::channel(256);
    let sent = Arc::new(AsyncMutex::new(Vec::new()));
    let connect_count = Arc::new(AtomicUsize::new(0));
    let disconnect_count = Arc::new(AtomicUsize::new(0));
    let transport = TestControlTransport {
        connected: false,
        sent: sent.clone(),
        connect_count: connect_count.clone(),
        disconnect_count: disconnect_count.clone(),
        inbound_tx: tx.clone(),
        inbound_rx: Some(rx),
    };
    let handle = TestControlHandle {
        sent,
        connect_count,
        disconnect_count,
        inbound_tx: tx,
    };
    (transport, handle)
}

#[async_trait]
impl ControlTransport for TestControlTransport {
    async fn connect(&mut self) -> Result<(), ClientError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        let owned = Bytes::copy_from_slice(bytes);
        self.sent.lock().await.push(owned.clone());

        // Auto-ack: decode the outgoing control frame and echo it straight
        // back as an Ack, simulating an always-responsive receiver.
        if let Ok(frame) = frame::decode(&owned) {
            if frame.msg_type().is_control_type() {
                if let Ok(ack) =
                    frame::encode_control(MessageType::Ack, frame.item_code(), frame.body())
                {
                    let _ = self.inbound_tx.send(ack).await;
                }
            }
        }
        Ok(())
    }

    fn take_inbound(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.inbound_rx.take()
    }
}

/// In-process data transport: the test injects datagrams through the
/// returned [`TestDataHandle`]; nothing is delivered until
/// `start_listening` has been called.
pub struct TestDataTransport {
    listening: Arc<AsyncMutex<bool>>,
    start_count: Arc<AtomicUsize>,
    stop_count: Arc<AtomicUsize>,
    inbound_rx: Option<mpsc::Receiver<Bytes>>,
}

#[derive(Clone)]
pub struct TestDataHandle {
    listening: Arc<AsyncMutex<bool>>,
    start_count: Arc<AtomicUsize>,
    stop_count: Arc<AtomicUsize>,
    inbound_tx: mpsc::Sender<Bytes>,
}

impl TestDataHandle {
    pub fn start_calls(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub async fn is_listening(&self) -> bool {
        *self.listening.lock().await
    }

    /// Deliver one datagram, as if it arrived over the socket. Delivered
    /// regardless of `start_listening` state — real UDP sockets receive
    /// whatever the kernel hands them; the session layer decides what to do
    /// with it.
    pub async fn inject_datagram(&self, bytes: Bytes) {
        let _ = self.inbound_tx.send(bytes).await;
    }
}

pub fn test_data_transport() -> (TestDataTransport, TestDataHandle) {
    let (tx, rx) = mpsc::channel(256);
    let listening = Arc::new(AsyncMutex::new(false));
    let start_count = Arc::new(AtomicUsize::new(0));
    let stop_count = Arc::new(AtomicUsize::new(0));
    let transport = TestDataTransport {
        listening: listening.clone(),
        start_count: start_count.clone(),
        stop_count: stop_count.clone(),
        inbound_rx: Some(rx),
    };
    let handle = TestDataHandle {
        listening,
        start_count,
        stop_count,
        inbound_tx: tx,
    };
    (transport, handle)
}

#[async_trait]
impl DataTransport for TestDataTransport {
    async fn start_listening(&mut self) -> Result<(), ClientError> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        *self.listening.lock().await = true;
        Ok(())
    }

    async fn stop_listening(&mut self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        *self.listening.lock().await = false;
    }

    fn take_inbound(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.inbound_rx.take()
    }
}
