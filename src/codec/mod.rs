//! Codec module - payload decoding for inbound frames.
//!
//! The wire carries no type tag, so the reader must be told how to interpret
//! a payload frame:
//!
//! - [`TextDecoder`] - UTF-8 text, the worker's output format (default)
//! - [`RawDecoder`] - opaque bytes, for byte-exact exchanges
//!
//! # Design
//!
//! Decoders are zero-sized marker types picked at compile time through the
//! reader's type parameter, not trait objects.
//!
//! # Example
//!
//! ```
//! use udfwire::codec::{PayloadDecoder, RawDecoder, TextDecoder};
//! use udfwire::Element;
//! use bytes::Bytes;
//!
//! let payload = Bytes::from_static(b"hello");
//! assert_eq!(TextDecoder::decode(payload.clone()).unwrap(), Element::text("hello"));
//! assert_eq!(RawDecoder::decode(payload).unwrap(), Element::bytes(&b"hello"[..]));
//! ```

mod raw;
mod text;

pub use raw::RawDecoder;
pub use text::TextDecoder;

use bytes::Bytes;

use crate::element::Element;
use crate::error::Result;

/// Turns a payload frame into an [`Element`].
pub trait PayloadDecoder {
    fn decode(payload: Bytes) -> Result<Element>;
}
