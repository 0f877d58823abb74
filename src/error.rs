//! Error types for udfwire.

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The writer was constructed without an input sequence.
    #[error("Nothing to process: input sequence is missing")]
    MissingInput,

    /// A value could not be mapped onto one of the four element variants.
    #[error("Unsupported element type: {0}")]
    UnsupportedElement(String),

    /// I/O error on the worker channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a frame was complete.
    #[error("Truncated frame: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    /// A frame could not be decoded (bad UTF-8, undefined length marker, ...).
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload length exceeds the configured or encodable maximum.
    #[error("Payload size {length} exceeds maximum {max}")]
    PayloadTooLarge { length: u64, max: u64 },

    /// `next()` was called on an exhausted reader.
    #[error("No more elements")]
    NoMoreElements,

    /// JSON serialization/deserialization error (descriptors and config).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The worker closed its output while input was still being fed and
    /// stopped reading; the exchange cut the feeder off.
    #[error("Worker ended its output after {received} elements without consuming the input")]
    InputNotConsumed { received: usize },

    /// The writer side of an exchange panicked.
    #[error("Worker feeder thread panicked")]
    WorkerPanicked,
}

impl BridgeError {
    /// True if the channel itself failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Io(_))
    }

    /// True if the inbound stream could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            BridgeError::Truncated { .. }
                | BridgeError::Decode(_)
                | BridgeError::PayloadTooLarge { .. }
        )
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
