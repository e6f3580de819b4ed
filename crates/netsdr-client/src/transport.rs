//! Transport capabilities the session consumes.
//!
//! The session neither opens sockets nor owns a network runtime: it drives
//! whatever implements these two traits. Production code wires a real TCP
//! stream to [`ControlTransport`] and a real UDP socket to [`DataTransport`];
//! the crate's own test suite uses the in-process [`crate::testkit`] pair.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// The reliable, ordered, bidirectional channel control requests travel over.
///
/// Received bytes arrive on `inbound()` as a stream of chunks. A chunk is
/// *not* guaranteed to be exactly one encoded frame — see
/// [`crate::session::FrameReassembler`], which the session uses to cope with
/// split or coalesced reads.
#[async_trait]
pub trait ControlTransport: Send {
    /// Open the channel. Idempotent: calling this while already connected is
    /// a no-op.
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Close the channel. Always safe, always idempotent.
    async fn disconnect(&mut self);

    /// Whether the channel is currently open.
    fn is_connected(&self) -> bool;

    /// Write `bytes` to the channel. Fails if not connected.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError>;

    /// The receiver half of the inbound byte-chunk channel. Takes the
    /// receiver out of the transport; callable once per transport instance.
    fn take_inbound(&mut self) -> Option<mpsc::Receiver<Bytes>>;
}

/// The unreliable datagram channel I/Q sample data arrives over.
#[async_trait]
pub trait DataTransport: Send {
    /// Begin receiving datagrams. No-op if already listening.
    async fn start_listening(&mut self) -> Result<(), ClientError>;

    /// Stop receiving datagrams. Idempotent, safe even if never started.
    async fn stop_listening(&mut self);

    /// Equivalent to `stop_listening` — some transports distinguish a final
    /// teardown from a pausable stop; this crate's traits do not.
    async fn exit(&mut self) {
        self.stop_listening().await;
    }

    /// The receiver half of the inbound datagram channel. Takes the receiver
    /// out of the transport; callable once per transport instance.
    fn take_inbound(&mut self) -> Option<mpsc::Receiver<Bytes>>;
}
