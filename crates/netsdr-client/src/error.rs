use netsdr_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the session client.
///
/// Decode errors from inbound frames are *not* represented here at the
/// session boundary in the common case — they are logged and dropped
/// (§4.1/§4.3 of the design). [`ClientError::Decode`] exists for the rare
/// path where a caller decodes a frame directly and wants the typed error.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation required an open control channel.
    #[error("not connected")]
    NotConnected,

    /// The control transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// No reply arrived within the configured response timeout.
    #[error("control request timed out waiting for a response")]
    Timeout,

    /// The pending response was cancelled by a concurrent `disconnect`.
    #[error("pending control request was cancelled")]
    Cancelled,

    /// A received frame failed to decode.
    #[error("frame decode failed: {0}")]
    Decode(#[from] ProtocolError),
}
