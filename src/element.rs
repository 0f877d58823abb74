//! The element model carried by the protocol.
//!
//! [`Element`] is the closed set of payload shapes. Host records cross the
//! boundary through [`IntoElement`] (write side) and [`FromElement`] (read
//! side); values that have no element form are rejected with
//! [`BridgeError::UnsupportedElement`] when the writer encodes them.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// A single protocol payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// No payload. Encoded as the null marker.
    Null,
    /// Opaque bytes, copied verbatim.
    Bytes(Bytes),
    /// UTF-8 text. The frame length is the encoded byte length.
    Text(String),
    /// Two elements written back-to-back with no wrapping marker.
    Pair(Box<Element>, Box<Element>),
}

impl Element {
    /// Build a text element.
    pub fn text(s: impl Into<String>) -> Self {
        Element::Text(s.into())
    }

    /// Build a bytes element.
    pub fn bytes(b: impl Into<Bytes>) -> Self {
        Element::Bytes(b.into())
    }

    /// Build a pair element.
    pub fn pair(key: Element, value: Element) -> Self {
        Element::Pair(Box::new(key), Box::new(value))
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Null => "null",
            Element::Bytes(_) => "bytes",
            Element::Text(_) => "text",
            Element::Pair(_, _) => "pair",
        }
    }

    /// Number of frames this element occupies on the wire.
    pub fn frame_count(&self) -> usize {
        match self {
            Element::Pair(k, v) => k.frame_count() + v.frame_count(),
            _ => 1,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Element::Null)
    }

    /// Borrow the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the byte payload, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Element::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::Text(s)
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::Text(s.to_string())
    }
}

impl From<Bytes> for Element {
    fn from(b: Bytes) -> Self {
        Element::Bytes(b)
    }
}

impl From<Vec<u8>> for Element {
    fn from(b: Vec<u8>) -> Self {
        Element::Bytes(Bytes::from(b))
    }
}

/// Conversion of a host value into an [`Element`].
///
/// Fallible so that values outside the four shapes can be refused at encode
/// time instead of being coerced.
pub trait IntoElement {
    fn into_element(self) -> Result<Element>;
}

impl IntoElement for Element {
    #[inline]
    fn into_element(self) -> Result<Element> {
        Ok(self)
    }
}

impl IntoElement for String {
    fn into_element(self) -> Result<Element> {
        Ok(Element::Text(self))
    }
}

impl IntoElement for &str {
    fn into_element(self) -> Result<Element> {
        Ok(Element::Text(self.to_string()))
    }
}

impl IntoElement for Bytes {
    fn into_element(self) -> Result<Element> {
        Ok(Element::Bytes(self))
    }
}

impl IntoElement for Vec<u8> {
    fn into_element(self) -> Result<Element> {
        Ok(Element::Bytes(Bytes::from(self)))
    }
}

impl IntoElement for &[u8] {
    fn into_element(self) -> Result<Element> {
        Ok(Element::Bytes(Bytes::copy_from_slice(self)))
    }
}

impl<T: IntoElement> IntoElement for Option<T> {
    fn into_element(self) -> Result<Element> {
        match self {
            Some(value) => value.into_element(),
            None => Ok(Element::Null),
        }
    }
}

impl<K: IntoElement, V: IntoElement> IntoElement for (K, V) {
    fn into_element(self) -> Result<Element> {
        Ok(Element::pair(self.0.into_element()?, self.1.into_element()?))
    }
}

/// JSON values map onto elements only where the shape is unambiguous:
/// `null`, strings, and two-element arrays (as pairs).
impl IntoElement for Value {
    fn into_element(self) -> Result<Element> {
        match self {
            Value::Null => Ok(Element::Null),
            Value::String(s) => Ok(Element::Text(s)),
            Value::Array(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(k), Some(v)) => Ok(Element::pair(k.into_element()?, v.into_element()?)),
                    _ => Err(BridgeError::UnsupportedElement("array".to_string())),
                }
            }
            Value::Array(items) => Err(BridgeError::UnsupportedElement(format!(
                "array of length {}",
                items.len()
            ))),
            Value::Bool(_) => Err(BridgeError::UnsupportedElement("boolean".to_string())),
            Value::Number(_) => Err(BridgeError::UnsupportedElement("number".to_string())),
            Value::Object(_) => Err(BridgeError::UnsupportedElement("object".to_string())),
        }
    }
}

/// Conversion of a decoded [`Element`] into a host value.
pub trait FromElement: Sized {
    fn from_element(element: Element) -> Result<Self>;
}

impl FromElement for Element {
    #[inline]
    fn from_element(element: Element) -> Result<Self> {
        Ok(element)
    }
}

impl FromElement for String {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::Text(s) => Ok(s),
            Element::Bytes(b) => String::from_utf8(b.to_vec())
                .map_err(|e| BridgeError::Decode(format!("invalid UTF-8 payload: {}", e))),
            other => Err(BridgeError::Decode(format!(
                "expected text, got {}",
                other.kind()
            ))),
        }
    }
}

impl FromElement for Bytes {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::Bytes(b) => Ok(b),
            Element::Text(s) => Ok(Bytes::from(s)),
            other => Err(BridgeError::Decode(format!(
                "expected bytes, got {}",
                other.kind()
            ))),
        }
    }
}

impl FromElement for Vec<u8> {
    fn from_element(element: Element) -> Result<Self> {
        Bytes::from_element(element).map(|b| b.to_vec())
    }
}

impl<T: FromElement> FromElement for Option<T> {
    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::Null => Ok(None),
            other => T::from_element(other).map(Some),
        }
    }
}
