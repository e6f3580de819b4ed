//! # netsdr-protocol
//!
//! Wire format for the NetSDR control/data protocol.
//!
//! A NetSDR frame is a packed 16-bit length/type header followed by a
//! type-dependent sub-header (item code, sequence number, or nothing) and a
//! body. This crate owns the two pieces that do not need a socket to exist:
//!
//! - [`frame`] — header packing/unpacking and the typed [`frame::Frame`] enum.
//! - [`sample`] — a lazy, restartable iterator over packed I/Q samples.
//! - [`error`] — the shared [`error::ProtocolError`] type.
//!
//! Everything here is pure and synchronous; the session state machine that
//! drives actual transports lives in the `netsdr-client` crate.

pub mod error;
pub mod frame;
pub mod sample;

pub use error::ProtocolError;
pub use frame::{ControlItemCode, Frame, MessageType};
pub use sample::samples;
