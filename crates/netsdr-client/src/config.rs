//! Typed connection configuration.
//!
//! Mirrors the layering used by the bonding control config: an all-`Option`
//! [`NetSdrConfigInput`] can be deserialized from a TOML file with
//! `#[serde(default)]`, and [`NetSdrConfigInput::resolve`] merges it onto
//! documented defaults to produce the [`NetSdrConfig`] the session actually
//! uses. Explicit constructor overrides always win over file values.

use serde::Deserialize;
use std::time::Duration;

/// Default NetSDR control port.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;
/// Default NetSDR I/Q data port.
pub const DEFAULT_DATA_PORT: u16 = 60000;
/// Default control request/response timeout.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;
/// Default sample width, in bits, used by callers of the sample unpacker.
pub const DEFAULT_SAMPLE_WIDTH_BITS: u8 = 16;

/// Resolved connection parameters for a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSdrConfig {
    pub host: String,
    pub control_port: u16,
    pub data_port: u16,
    pub response_timeout_ms: u64,
    pub sample_width_bits: u8,
}

impl NetSdrConfig {
    /// Build a config for `host` using every documented default.
    pub fn new(host: impl Into<String>) -> Self {
        NetSdrConfig {
            host: host.into(),
            control_port: DEFAULT_CONTROL_PORT,
            data_port: DEFAULT_DATA_PORT,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            sample_width_bits: DEFAULT_SAMPLE_WIDTH_BITS,
        }
    }

    /// The control request/response timeout as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// TOML-deserializable overrides layered onto [`NetSdrConfig`]'s defaults.
///
/// Every field is optional so a partial or empty file is valid; a missing
/// file is equivalent to an all-default [`NetSdrConfigInput`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetSdrConfigInput {
    pub host: Option<String>,
    pub control_port: Option<u16>,
    pub data_port: Option<u16>,
    pub response_timeout_ms: Option<u64>,
    pub sample_width_bits: Option<u8>,
}

impl NetSdrConfigInput {
    /// Parse a TOML document into config overrides.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Merge these overrides onto the documented defaults, falling back to
    /// `default_host` if neither the input nor an override supplies a host.
    pub fn resolve(self, default_host: impl Into<String>) -> NetSdrConfig {
        let mut resolved = NetSdrConfig::new(self.host.unwrap_or_else(|| default_host.into()));
        if let Some(port) = self.control_port {
            resolved.control_port = port;
        }
        if let Some(port) = self.data_port {
            resolved.data_port = port;
        }
        if let Some(timeout) = self.response_timeout_ms {
            resolved.response_timeout_ms = timeout;
        }
        if let Some(width) = self.sample_width_bits {
            resolved.sample_width_bits = width;
        }
        resolved
    }
}
