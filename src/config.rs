//! Transport configuration.
//!
//! The host embeds [`TransportConfig`] in its own settings; every field has a
//! default so a partial document deserializes cleanly.
//!
//! ```
//! use udfwire::config::{NullFramePolicy, TransportConfig};
//!
//! let config = TransportConfig::default()
//!     .buffer_size(64 * 1024)
//!     .null_frames(NullFramePolicy::Reject);
//! assert_eq!(config.buffer_size, 64 * 1024);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_PAYLOAD_SIZE};

/// Default feeder drain timeout (5 seconds).
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

/// How the reader treats a null marker (`-5`) on the inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullFramePolicy {
    /// Yield [`Element::Null`](crate::Element::Null).
    #[default]
    Decode,
    /// Fail with a decode error.
    Reject,
}

/// Settings shared by writers and readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Capacity of the buffered writer/reader wrapped around the channel.
    pub buffer_size: usize,
    /// Largest payload length the reader accepts.
    pub max_payload_size: u32,
    /// Treatment of inbound null markers.
    pub null_frames: NullFramePolicy,
    /// How long an exchange waits for its feeder once the worker's output
    /// has ended, before cutting the channel.
    pub drain_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            null_frames: NullFramePolicy::Decode,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    /// Set the I/O buffer capacity.
    ///
    /// Default: 8192
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the maximum accepted payload length.
    ///
    /// Default: 1 GB
    pub fn max_payload_size(mut self, max: u32) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Set the null marker policy.
    pub fn null_frames(mut self, policy: NullFramePolicy) -> Self {
        self.null_frames = policy;
        self
    }

    /// Set the feeder drain timeout in milliseconds.
    ///
    /// Default: 5000
    pub fn drain_timeout_ms(mut self, ms: u64) -> Self {
        self.drain_timeout_ms = ms;
        self
    }

    /// Feeder drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Parse a config from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = TransportConfig::default();
        assert_eq!(config.buffer_size, 8192);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert_eq!(config.null_frames, NullFramePolicy::Decode);
        assert_eq!(config.drain_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chaining() {
        let config = TransportConfig::default()
            .buffer_size(16)
            .max_payload_size(1024)
            .null_frames(NullFramePolicy::Reject)
            .drain_timeout_ms(20);

        assert_eq!(config.drain_timeout(), Duration::from_millis(20));
        assert_eq!(config.buffer_size, 16);
        assert_eq!(config.max_payload_size, 1024);
        assert_eq!(config.null_frames, NullFramePolicy::Reject);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TransportConfig::from_json(r#"{"null_frames": "reject"}"#).unwrap();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.null_frames, NullFramePolicy::Reject);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result = TransportConfig::from_json(r#"{"buffer_size": "big"}"#);
        assert!(matches!(result, Err(crate::BridgeError::Json(_))));
    }
}
