//! Frame type and element encoding.
//!
//! An [`Element`] maps onto one or more frames: `Null`, `Bytes` and `Text`
//! take one frame each, a `Pair` takes the frames of its key followed by the
//! frames of its value, with nothing marking the pair itself.
//!
//! # Example
//!
//! ```
//! use udfwire::protocol::encode_stream;
//! use udfwire::Element;
//!
//! let bytes = encode_stream(vec![Element::text("a")]).unwrap();
//! assert_eq!(&bytes[..], &[0, 0, 0, 1, b'a', 0xFF, 0xFF, 0xFF, 0xFF]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Marker, ABSOLUTE_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE};
use crate::element::Element;
use crate::error::{BridgeError, Result};

/// A single decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Length-prefixed payload (possibly empty).
    Data(Bytes),
    /// Null marker.
    Null,
    /// End-of-stream marker.
    End,
}

impl Frame {
    /// Length prefix for this frame.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PayloadTooLarge`] if the payload does not fit in a
    /// signed 32-bit length.
    pub fn marker(&self) -> Result<Marker> {
        match self {
            Frame::Data(payload) => payload_length(payload.len()).map(Marker::Payload),
            Frame::Null => Ok(Marker::Null),
            Frame::End => Ok(Marker::EndOfStream),
        }
    }

    /// Encoded size (prefix + payload).
    #[inline]
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::Data(payload) => LENGTH_PREFIX_SIZE + payload.len(),
            _ => LENGTH_PREFIX_SIZE,
        }
    }

    /// Append the encoded frame to `buf`.
    ///
    /// Nothing is written if the length prefix cannot be encoded.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_slice(&self.marker()?.encode());
        if let Frame::Data(payload) = self {
            buf.put_slice(payload);
        }
        Ok(())
    }
}

/// Check that a payload fits in a signed 32-bit length prefix.
#[inline]
pub fn payload_length(len: usize) -> Result<u32> {
    if len > ABSOLUTE_MAX_PAYLOAD_SIZE as usize {
        return Err(BridgeError::PayloadTooLarge {
            length: len as u64,
            max: ABSOLUTE_MAX_PAYLOAD_SIZE as u64,
        });
    }
    Ok(len as u32)
}

/// Append the frames for `element` to `buf`.
///
/// Returns the number of frames written.
pub fn encode_element<B: BufMut>(element: &Element, buf: &mut B) -> Result<usize> {
    match element {
        Element::Null => {
            buf.put_i32(Marker::Null.length());
            Ok(1)
        }
        Element::Bytes(b) => {
            put_payload(b, buf)?;
            Ok(1)
        }
        Element::Text(s) => {
            put_payload(s.as_bytes(), buf)?;
            Ok(1)
        }
        Element::Pair(key, value) => Ok(encode_element(key, buf)? + encode_element(value, buf)?),
    }
}

fn put_payload<B: BufMut>(payload: &[u8], buf: &mut B) -> Result<()> {
    let len = payload_length(payload.len())?;
    buf.put_i32(len as i32);
    buf.put_slice(payload);
    Ok(())
}

/// Encode a complete stream, terminator included, into one buffer.
pub fn encode_stream<I>(elements: I) -> Result<Bytes>
where
    I: IntoIterator<Item = Element>,
{
    let mut buf = BytesMut::new();
    for element in elements {
        encode_element(&element, &mut buf)?;
    }
    Frame::End.encode_into(&mut buf)?;
    Ok(buf.freeze())
}
