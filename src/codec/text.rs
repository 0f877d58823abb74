//! Text decoder - UTF-8 payloads.

use bytes::Bytes;

use super::PayloadDecoder;
use crate::element::Element;
use crate::error::{BridgeError, Result};

/// Decoder that yields [`Element::Text`], rejecting invalid UTF-8.
pub struct TextDecoder;

impl PayloadDecoder for TextDecoder {
    fn decode(payload: Bytes) -> Result<Element> {
        String::from_utf8(payload.to_vec())
            .map(Element::Text)
            .map_err(|e| BridgeError::Decode(format!("invalid UTF-8 payload: {}", e.utf8_error())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_multibyte() {
        let element = TextDecoder::decode(Bytes::from("zażółć")).unwrap();
        assert_eq!(element, Element::text("zażółć"));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(TextDecoder::decode(Bytes::new()).unwrap(), Element::text(""));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let err = TextDecoder::decode(Bytes::from_static(&[0x66, 0xFF])).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("invalid UTF-8"));
    }
}
