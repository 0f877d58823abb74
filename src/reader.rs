//! Blocking frame reader: worker → host.
//!
//! [`FrameReader`] is a forward-only pull iterator. It reads at most one
//! frame per produced element and holds at most one decoded element of
//! look-ahead:
//!
//! ```text
//!            has_next() ok            next()
//!   Idle ───────────────────► Buffered ──────► Idle
//!     │  end marker / error
//!     └────────────────────► Done (terminal)
//! ```
//!
//! Payload frames are decoded by the `D` type parameter, UTF-8 text by
//! default. Null markers become [`Element::Null`] unless the config rejects
//! them. A stream that ends before its end-of-stream marker, an undefined
//! negative length, or an undecodable payload is reported once as an error,
//! after which the reader stays done.
//!
//! # Example
//!
//! ```
//! use udfwire::FrameReader;
//!
//! let wire: &[u8] = &[0, 0, 0, 2, b'h', b'i', 0xFF, 0xFF, 0xFF, 0xFF];
//! let mut reader = FrameReader::new(wire);
//!
//! assert!(reader.has_next().unwrap());
//! assert_eq!(reader.next_element().unwrap().as_text(), Some("hi"));
//! assert!(!reader.has_next().unwrap());
//! ```

use std::io::{BufReader, ErrorKind, Read};
use std::iter::FusedIterator;
use std::marker::PhantomData;

use bytes::Bytes;

use crate::codec::{PayloadDecoder, TextDecoder};
use crate::config::{NullFramePolicy, TransportConfig};
use crate::element::{Element, FromElement};
use crate::error::{BridgeError, Result};
use crate::protocol::{Marker, LENGTH_PREFIX_SIZE};

/// Look-ahead state.
#[derive(Debug)]
enum State {
    /// Nothing buffered, stream not finished.
    Idle,
    /// One decoded element waiting to be taken.
    Buffered(Element),
    /// End-of-stream seen or a terminal error reported.
    Done,
}

/// Lazy decoder over an inbound byte stream.
pub struct FrameReader<R: Read, D = TextDecoder> {
    input: BufReader<R>,
    state: State,
    max_payload_size: u32,
    null_frames: NullFramePolicy,
    frames_read: u64,
    _decoder: PhantomData<D>,
}

impl<R: Read> FrameReader<R, TextDecoder> {
    /// Create a text reader with default settings.
    pub fn new(input: R) -> Self {
        Self::with_config(input, &TransportConfig::default())
    }

    /// Create a text reader with the given config.
    pub fn with_config(input: R, config: &TransportConfig) -> Self {
        Self::with_decoder(input, config)
    }
}

impl<R: Read, D: PayloadDecoder> FrameReader<R, D> {
    /// Create a reader with an explicit payload decoder.
    ///
    /// Pick the decoder with a turbofish:
    /// `FrameReader::<_, RawDecoder>::with_decoder(stream, &config)`.
    pub fn with_decoder(input: R, config: &TransportConfig) -> Self {
        Self {
            input: BufReader::with_capacity(config.buffer_size, input),
            state: State::Idle,
            max_payload_size: config.max_payload_size,
            null_frames: config.null_frames,
            frames_read: 0,
            _decoder: PhantomData,
        }
    }

    /// Check whether another element is available, reading one frame if
    /// nothing is buffered.
    ///
    /// Idempotent: while an element is buffered no further bytes are read.
    /// Returns `Ok(false)` forever once the stream is done.
    ///
    /// # Errors
    ///
    /// A decode or transport error, reported once; the reader is done
    /// afterwards.
    pub fn has_next(&mut self) -> Result<bool> {
        match self.state {
            State::Buffered(_) => Ok(true),
            State::Done => Ok(false),
            State::Idle => match self.read_element() {
                Ok(Some(element)) => {
                    self.state = State::Buffered(element);
                    Ok(true)
                }
                Ok(None) => {
                    tracing::debug!(frames = self.frames_read, "End of stream");
                    self.state = State::Done;
                    Ok(false)
                }
                Err(e) => {
                    tracing::warn!(frames = self.frames_read, "Reader terminated: {}", e);
                    self.state = State::Done;
                    Err(e)
                }
            },
        }
    }

    /// Take the next element.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NoMoreElements`] once the stream is exhausted, or the
    /// error surfaced by the implicit [`has_next`](Self::has_next).
    pub fn next_element(&mut self) -> Result<Element> {
        if !self.has_next()? {
            return Err(BridgeError::NoMoreElements);
        }
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Buffered(element) => Ok(element),
            other => {
                self.state = other;
                Err(BridgeError::NoMoreElements)
            }
        }
    }

    /// Borrow the next element without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Element>> {
        if !self.has_next()? {
            return Ok(None);
        }
        match &self.state {
            State::Buffered(element) => Ok(Some(element)),
            _ => Ok(None),
        }
    }

    /// Check if the reader reached its terminal state.
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Frames consumed from the stream so far, end marker included.
    #[inline]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Regroup the stream as key/value pairs, key first.
    pub fn pairs(self) -> Pairs<R, D> {
        Pairs { reader: self }
    }

    /// Convert every element through [`FromElement`].
    pub fn decode_as<T: FromElement>(self) -> impl Iterator<Item = Result<T>> {
        self.map(|item| item.and_then(T::from_element))
    }

    /// Read one frame. `Ok(None)` means end of stream.
    fn read_element(&mut self) -> Result<Option<Element>> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.read_exact_counted(&mut prefix)?;
        self.frames_read += 1;

        let marker = Marker::from_length(i32::from_be_bytes(prefix));
        tracing::trace!(length = marker.length(), "Read frame");

        match marker {
            Marker::EndOfStream => Ok(None),
            Marker::Null => match self.null_frames {
                NullFramePolicy::Decode => Ok(Some(Element::Null)),
                NullFramePolicy::Reject => {
                    Err(BridgeError::Decode("null marker not accepted".to_string()))
                }
            },
            Marker::Undefined(n) => Err(BridgeError::Decode(format!(
                "undefined length marker {}",
                n
            ))),
            Marker::Payload(len) => {
                if len > self.max_payload_size {
                    return Err(BridgeError::PayloadTooLarge {
                        length: len as u64,
                        max: self.max_payload_size as u64,
                    });
                }
                let payload = self.read_payload(len as usize)?;
                D::decode(payload).map(Some)
            }
        }
    }

    /// Read exactly `len` bytes without trusting `len` for the allocation.
    fn read_payload(&mut self, len: usize) -> Result<Bytes> {
        let mut payload = Vec::new();
        (&mut self.input)
            .take(len as u64)
            .read_to_end(&mut payload)?;

        if payload.len() < len {
            return Err(BridgeError::Truncated {
                expected: len,
                received: payload.len(),
            });
        }
        Ok(Bytes::from(payload))
    }

    fn read_exact_counted(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.input.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(BridgeError::Truncated {
                        expected: buf.len(),
                        received: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BridgeError::Io(e)),
            }
        }
        Ok(())
    }
}

impl<R: Read, D: PayloadDecoder> Iterator for FrameReader<R, D> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_element()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Read, D: PayloadDecoder> FusedIterator for FrameReader<R, D> {}

/// Key/value view over a [`FrameReader`].
///
/// Arity is not on the wire; both sides must agree that the stream holds
/// pairs. An odd number of elements ends in a decode error.
pub struct Pairs<R: Read, D = TextDecoder> {
    reader: FrameReader<R, D>,
}

impl<R: Read, D: PayloadDecoder> Iterator for Pairs<R, D> {
    type Item = Result<(Element, Element)>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.reader.next()? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };
        match self.reader.next() {
            Some(Ok(value)) => Some(Ok((key, value))),
            Some(Err(e)) => Some(Err(e)),
            None => Some(Err(BridgeError::Decode(format!(
                "stream ended after a {} key with no value",
                key.kind()
            )))),
        }
    }
}

impl<R: Read, D: PayloadDecoder> FusedIterator for Pairs<R, D> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawDecoder;
    use std::io::{self, Cursor};

    const END: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut v = (payload.len() as i32).to_be_bytes().to_vec();
        v.extend_from_slice(payload);
        v
    }

    fn stream(frames: &[&[u8]]) -> Vec<u8> {
        let mut v: Vec<u8> = frames.iter().flat_map(|f| frame(f)).collect();
        v.extend_from_slice(&END);
        v
    }

    /// Reader that counts how many bytes were pulled from it.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        pulled: usize,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.pulled += n;
            Ok(n)
        }
    }

    #[test]
    fn test_reads_text_in_order() {
        let wire = stream(&[b"a", b"b", b"c"]);
        let items: Vec<String> = FrameReader::new(&wire[..])
            .decode_as::<String>()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let wire = stream(&[b"one", b"two"]);
        let config = TransportConfig::default().buffer_size(1);
        let mut reader = FrameReader::with_config(
            CountingReader {
                inner: Cursor::new(wire),
                pulled: 0,
            },
            &config,
        );

        assert!(reader.has_next().unwrap());
        let pulled = reader.input.get_ref().pulled;
        assert!(reader.has_next().unwrap());
        assert!(reader.has_next().unwrap());
        assert_eq!(reader.input.get_ref().pulled, pulled);
        assert_eq!(reader.next_element().unwrap(), Element::text("one"));
    }

    #[test]
    fn test_terminal_after_end() {
        let wire = END.to_vec();
        let mut reader = FrameReader::new(&wire[..]);

        assert!(!reader.has_next().unwrap());
        assert!(reader.is_done());
        assert!(!reader.has_next().unwrap());
        assert!(matches!(reader.next_element(), Err(BridgeError::NoMoreElements)));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_frames_after_end_are_not_decoded() {
        let mut wire = stream(&[b"x"]);
        wire.extend(frame(b"ghost"));
        let items: Vec<_> = FrameReader::new(&wire[..]).collect();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_null_marker_decodes_to_null() {
        let mut wire = vec![0xFF, 0xFF, 0xFF, 0xFB];
        wire.extend(stream(&[b"x"]));

        let items: Vec<Element> = FrameReader::new(&wire[..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec![Element::Null, Element::text("x")]);
    }

    #[test]
    fn test_null_marker_rejected_by_policy() {
        let mut wire = vec![0xFF, 0xFF, 0xFF, 0xFB];
        wire.extend_from_slice(&END);
        let config = TransportConfig::default().null_frames(NullFramePolicy::Reject);
        let mut reader = FrameReader::with_config(&wire[..], &config);

        let err = reader.has_next().unwrap_err();
        assert!(err.is_decode());
        assert!(reader.is_done());
    }

    #[test]
    fn test_zero_length_is_empty_text() {
        let wire = stream(&[b""]);
        let items: Vec<Element> = FrameReader::new(&wire[..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec![Element::text("")]);
    }

    #[test]
    fn test_truncated_payload() {
        let mut wire = 10i32.to_be_bytes().to_vec();
        wire.extend_from_slice(b"abc");
        let mut reader = FrameReader::new(&wire[..]);

        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::Truncated { expected: 10, received: 3 }));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_end_marker_is_truncation() {
        let wire = frame(b"ok");
        let mut reader = FrameReader::new(&wire[..]);

        assert_eq!(reader.next().unwrap().unwrap(), Element::text("ok"));
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::Truncated { expected: 4, received: 0 }));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_partial_length_prefix() {
        let wire = [0u8, 0];
        let err = FrameReader::new(&wire[..]).has_next().unwrap_err();
        assert!(matches!(err, BridgeError::Truncated { expected: 4, received: 2 }));
    }

    #[test]
    fn test_undefined_marker() {
        let wire = (-3i32).to_be_bytes();
        let err = FrameReader::new(&wire[..]).has_next().unwrap_err();
        assert!(err.to_string().contains("undefined length marker -3"));
    }

    #[test]
    fn test_payload_limit() {
        let wire = stream(&[b"too long"]);
        let config = TransportConfig::default().max_payload_size(4);
        let mut reader = FrameReader::with_config(&wire[..], &config);
        assert!(matches!(
            reader.has_next(),
            Err(BridgeError::PayloadTooLarge { length: 8, max: 4 })
        ));
    }

    #[test]
    fn test_invalid_utf8_with_text_decoder() {
        let wire = stream(&[&[0xC3, 0x28]]);
        let err = FrameReader::new(&wire[..]).next().unwrap().unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_raw_decoder_keeps_bytes() {
        let wire = stream(&[&[0x01, 0x02, 0x03], &[0xFF]]);
        let reader =
            FrameReader::<_, RawDecoder>::with_decoder(&wire[..], &TransportConfig::default());
        let items: Vec<Vec<u8>> = reader.decode_as().collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![vec![1, 2, 3], vec![0xFF]]);
    }

    #[test]
    fn test_io_error_is_transport_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut reader = FrameReader::new(Broken);
        assert!(reader.has_next().unwrap_err().is_transport());
        assert!(!reader.has_next().unwrap());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let wire = stream(&[b"p"]);
        let mut reader = FrameReader::new(&wire[..]);

        assert_eq!(reader.peek().unwrap(), Some(&Element::text("p")));
        assert_eq!(reader.next_element().unwrap(), Element::text("p"));
        assert_eq!(reader.peek().unwrap(), None);
    }

    #[test]
    fn test_pairs_key_then_value() {
        let wire = stream(&[b"id", b"42", b"name", b"x"]);
        let pairs: Vec<_> = FrameReader::new(&wire[..])
            .pairs()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            pairs,
            vec![
                (Element::text("id"), Element::text("42")),
                (Element::text("name"), Element::text("x")),
            ]
        );
    }

    #[test]
    fn test_pairs_dangling_key() {
        let wire = stream(&[b"id", b"42", b"orphan"]);
        let mut pairs = FrameReader::new(&wire[..]).pairs();

        assert!(pairs.next().unwrap().is_ok());
        let err = pairs.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("no value"));
        assert!(pairs.next().is_none());
    }

    #[test]
    fn test_frames_read_counts_end_marker() {
        let wire = stream(&[b"a", b"b"]);
        let mut reader = FrameReader::new(&wire[..]);
        while reader.next().is_some() {}
        assert_eq!(reader.frames_read(), 3);
    }
}
