//! Raw decoder - pass-through for binary payloads.
//!
//! Zero-copy: the payload `Bytes` becomes the element as-is.

use bytes::Bytes;

use super::PayloadDecoder;
use crate::element::Element;
use crate::error::Result;

/// Decoder that yields [`Element::Bytes`] without transformation.
pub struct RawDecoder;

impl PayloadDecoder for RawDecoder {
    #[inline]
    fn decode(payload: Bytes) -> Result<Element> {
        Ok(Element::Bytes(payload))
    }
}
