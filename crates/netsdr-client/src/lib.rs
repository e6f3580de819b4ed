//! # netsdr-client
//!
//! Session-level client for a NetSDR-style receiver: typed configuration,
//! the control/data transport traits a caller implements for its own
//! network stack, and the [`session::Session`] state machine that serializes
//! control request/response exchanges and forwards decoded data frames.
//!
//! This crate does not open a socket itself — see [`transport`] for the
//! traits production code implements, and [`testkit`] for the in-process
//! pair this crate's own tests drive the session with.

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use config::{NetSdrConfig, NetSdrConfigInput};
pub use error::ClientError;
pub use session::{DataFrame, Session};
pub use transport::{ControlTransport, DataTransport};
