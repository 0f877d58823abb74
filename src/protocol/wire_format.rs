//! Wire format encoding and decoding.
//!
//! Every frame starts with a 4-byte length prefix:
//! ```text
//! ┌──────────────┬──────────────────────┐
//! │ Length       │ Payload              │
//! │ 4 bytes      │ Length bytes         │
//! │ int32 BE     │ (only if Length > 0) │
//! └──────────────┴──────────────────────┘
//! ```
//!
//! Negative lengths are reserved markers and never carry a payload:
//! `-1` ends the stream, `-5` encodes a null element. All other negative
//! values are undefined in this protocol version.

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// End-of-stream marker. Appears exactly once, as the last frame.
pub const END_OF_DATA_SECTION: i32 = -1;

/// Null element marker.
pub const NULL: i32 = -5;

/// Default capacity of the buffered writer/reader (8 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default maximum payload size accepted by readers (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Absolute maximum payload size (max i32).
pub const ABSOLUTE_MAX_PAYLOAD_SIZE: u32 = i32::MAX as u32;

/// Classified length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A payload of the given length follows (may be 0).
    Payload(u32),
    /// Null element, no payload.
    Null,
    /// End of stream, no payload.
    EndOfStream,
    /// Negative value with no meaning in this protocol version.
    Undefined(i32),
}

impl Marker {
    /// Classify a raw length value.
    pub fn from_length(length: i32) -> Self {
        match length {
            n if n >= 0 => Marker::Payload(n as u32),
            END_OF_DATA_SECTION => Marker::EndOfStream,
            NULL => Marker::Null,
            n => Marker::Undefined(n),
        }
    }

    /// Raw length value written on the wire.
    pub fn length(&self) -> i32 {
        match *self {
            Marker::Payload(n) => n as i32,
            Marker::Null => NULL,
            Marker::EndOfStream => END_OF_DATA_SECTION,
            Marker::Undefined(n) => n,
        }
    }

    /// Encode the length prefix (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use udfwire::protocol::Marker;
    ///
    /// assert_eq!(Marker::EndOfStream.encode(), [0xFF, 0xFF, 0xFF, 0xFF]);
    /// assert_eq!(Marker::Payload(3).encode(), [0, 0, 0, 3]);
    /// ```
    #[inline]
    pub fn encode(&self) -> [u8; LENGTH_PREFIX_SIZE] {
        self.length().to_be_bytes()
    }

    /// Decode a length prefix from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        Some(Self::from_length(i32::from_be_bytes([
            buf[0], buf[1], buf[2], buf[3],
        ])))
    }

    /// Check if this marker terminates the stream.
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, Marker::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_markers() {
        assert_eq!(Marker::from_length(-1), Marker::EndOfStream);
        assert_eq!(Marker::from_length(-5), Marker::Null);
        assert_eq!(Marker::from_length(-2), Marker::Undefined(-2));
        assert_eq!(Marker::from_length(i32::MIN), Marker::Undefined(i32::MIN));
    }

    #[test]
    fn test_zero_is_a_payload_length() {
        assert_eq!(Marker::from_length(0), Marker::Payload(0));
    }

    #[test]
    fn test_big_endian_byte_order() {
        assert_eq!(Marker::Payload(0x01020304).encode(), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(Marker::Null.encode(), [0xFF, 0xFF, 0xFF, 0xFB]);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        assert!(Marker::decode(&[0, 0, 0]).is_none());
    }

    #[test]
    fn test_decode_matches_encode() {
        for marker in [Marker::Payload(42), Marker::Null, Marker::EndOfStream] {
            assert_eq!(Marker::decode(&marker.encode()), Some(marker));
        }
    }

    #[test]
    fn test_is_end() {
        assert!(Marker::EndOfStream.is_end());
        assert!(!Marker::Null.is_end());
    }
}
