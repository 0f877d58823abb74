//! Async counterparts of [`FrameWriter`](crate::FrameWriter) and
//! [`FrameReader`](crate::FrameReader) for hosts running on tokio.
//!
//! Framing, sentinels and error semantics are identical; only the I/O is
//! non-blocking. Use `tokio::net::TcpStream::into_split()` (or
//! `UnixStream::into_split()`) to drive both halves from separate tasks.
//!
//! # Example
//!
//! ```
//! use udfwire::stream::{AsyncFrameReader, AsyncFrameWriter};
//! use udfwire::{Element, UdfDescriptor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> udfwire::Result<()> {
//! let mut wire = Vec::new();
//! AsyncFrameWriter::new(&mut wire, UdfDescriptor::named("id"), Some(vec!["a", "b"]))?
//!     .send()
//!     .await?;
//!
//! let mut reader = AsyncFrameReader::new(&wire[..]);
//! assert_eq!(reader.next_element().await?, Some(Element::text("a")));
//! assert_eq!(reader.next_element().await?, Some(Element::text("b")));
//! assert_eq!(reader.next_element().await?, None);
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

use crate::codec::{PayloadDecoder, TextDecoder};
use crate::config::{NullFramePolicy, TransportConfig};
use crate::element::{Element, IntoElement};
use crate::error::{BridgeError, Result};
use crate::protocol::{encode_element, Frame, FrameBuffer};
use crate::udf::UdfDescriptor;
use crate::writer::SendSummary;

/// Async encoder for a finite input sequence.
pub struct AsyncFrameWriter<W: AsyncWrite + Unpin, I> {
    output: BufWriter<W>,
    udf: UdfDescriptor,
    input: I,
    scratch: BytesMut,
}

impl<W, I, T> AsyncFrameWriter<W, I>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = T>,
    T: IntoElement,
{
    /// Create a writer with the default 8 KB buffer.
    ///
    /// # Errors
    ///
    /// [`BridgeError::MissingInput`] if `input` is `None`.
    pub fn new(output: W, udf: UdfDescriptor, input: Option<I>) -> Result<Self> {
        Self::with_config(output, udf, input, &TransportConfig::default())
    }

    /// Create a writer with a custom buffer size.
    pub fn with_config(
        output: W,
        udf: UdfDescriptor,
        input: Option<I>,
        config: &TransportConfig,
    ) -> Result<Self> {
        let input = input.ok_or(BridgeError::MissingInput)?;
        Ok(Self {
            output: BufWriter::with_capacity(config.buffer_size, output),
            udf,
            input,
            scratch: BytesMut::new(),
        })
    }

    /// Write every element, the end-of-stream marker, then flush.
    pub async fn send(self) -> Result<SendSummary> {
        let Self {
            mut output,
            udf,
            input,
            mut scratch,
        } = self;
        let mut summary = SendSummary::default();

        for value in input {
            let element = value.into_element().map_err(|e| {
                tracing::warn!(udf = %udf.name, "Aborting send: {}", e);
                e
            })?;
            scratch.clear();
            summary.frames += encode_element(&element, &mut scratch)?;
            output.write_all(&scratch).await?;
            summary.bytes += scratch.len();
            summary.elements += 1;
        }

        scratch.clear();
        Frame::End.encode_into(&mut scratch)?;
        output.write_all(&scratch).await?;
        output.flush().await?;
        summary.frames += 1;
        summary.bytes += scratch.len();

        tracing::debug!(
            udf = %udf.name,
            elements = summary.elements,
            frames = summary.frames,
            "Input sent"
        );

        Ok(summary)
    }
}

/// Async pull decoder over an inbound byte stream.
pub struct AsyncFrameReader<R: AsyncRead + Unpin, D = TextDecoder> {
    input: R,
    buffer: FrameBuffer,
    chunk: Vec<u8>,
    null_frames: NullFramePolicy,
    done: bool,
    _decoder: PhantomData<D>,
}

impl<R: AsyncRead + Unpin> AsyncFrameReader<R, TextDecoder> {
    /// Create a text reader with default settings.
    pub fn new(input: R) -> Self {
        Self::with_decoder(input, &TransportConfig::default())
    }

    /// Create a text reader with the given config.
    pub fn with_config(input: R, config: &TransportConfig) -> Self {
        Self::with_decoder(input, config)
    }
}

impl<R: AsyncRead + Unpin, D: PayloadDecoder> AsyncFrameReader<R, D> {
    /// Create a reader with an explicit payload decoder.
    pub fn with_decoder(input: R, config: &TransportConfig) -> Self {
        Self {
            input,
            buffer: FrameBuffer::with_capacity_and_max_payload(
                config.buffer_size,
                config.max_payload_size,
            ),
            chunk: vec![0u8; config.buffer_size.max(1)],
            null_frames: config.null_frames,
            done: false,
            _decoder: PhantomData,
        }
    }

    /// Next element, or `None` once the end-of-stream marker is seen.
    ///
    /// Elements that arrived ahead of a bad frame are yielded before its
    /// error. Errors are terminal: the following call returns `Ok(None)`.
    pub async fn next_element(&mut self) -> Result<Option<Element>> {
        if self.done {
            return Ok(None);
        }
        match self.poll_element().await {
            Ok(Some(element)) => Ok(Some(element)),
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Reader terminated: {}", e);
                self.finish();
                Err(e)
            }
        }
    }

    /// Drain the stream into a vector.
    pub async fn collect(mut self) -> Result<Vec<Element>> {
        let mut out = Vec::new();
        while let Some(element) = self.next_element().await? {
            out.push(element);
        }
        Ok(out)
    }

    /// Check if the reader reached its terminal state.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn finish(&mut self) {
        self.done = true;
        self.buffer.clear();
    }

    async fn poll_element(&mut self) -> Result<Option<Element>> {
        loop {
            if let Some(frame) = self.buffer.try_extract_one()? {
                return match frame {
                    Frame::Data(payload) => D::decode(payload).map(Some),
                    Frame::Null => match self.null_frames {
                        NullFramePolicy::Decode => Ok(Some(Element::Null)),
                        NullFramePolicy::Reject => {
                            Err(BridgeError::Decode("null marker not accepted".to_string()))
                        }
                    },
                    Frame::End => Ok(None),
                };
            }

            let n = self.input.read(&mut self.chunk).await?;
            if n == 0 {
                return Err(self.buffer.truncation());
            }
            self.buffer.extend(&self.chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawDecoder;
    use crate::protocol::encode_stream;
    use tokio::io::duplex;

    fn udf() -> UdfDescriptor {
        UdfDescriptor::named("async")
    }

    #[tokio::test]
    async fn test_writer_matches_blocking_encoding() {
        let input = vec![
            Element::text("a"),
            Element::Null,
            Element::pair(Element::text("id"), Element::bytes(vec![1u8, 2])),
        ];

        let mut wire = Vec::new();
        let summary = AsyncFrameWriter::new(&mut wire, udf(), Some(input.clone()))
            .unwrap()
            .send()
            .await
            .unwrap();

        assert_eq!(&wire[..], &encode_stream(input).unwrap()[..]);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.bytes, wire.len());
    }

    #[tokio::test]
    async fn test_missing_input() {
        let result = AsyncFrameWriter::new(Vec::new(), udf(), None::<Vec<Element>>);
        assert!(matches!(result, Err(BridgeError::MissingInput)));
    }

    #[tokio::test]
    async fn test_duplex_round_trip() {
        let (client, server) = duplex(64);
        let words: Vec<String> = (0..200).map(|i| format!("word-{}", i)).collect();
        let expected: Vec<Element> = words.iter().map(|w| Element::text(w.as_str())).collect();

        let writer = tokio::spawn(async move {
            AsyncFrameWriter::new(client, udf(), Some(words))
                .unwrap()
                .send()
                .await
        });

        let received = AsyncFrameReader::new(server).collect().await.unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let wire = [0u8, 0, 0, 6, b'a', b'b'];
        let mut reader = AsyncFrameReader::new(&wire[..]);

        let err = reader.next_element().await.unwrap_err();
        assert!(matches!(err, BridgeError::Truncated { expected: 6, received: 2 }));
        assert!(reader.is_done());
        assert_eq!(reader.next_element().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_elements_before_bad_frame_come_first() {
        let mut wire = vec![0u8, 0, 0, 1, b'a'];
        wire.extend_from_slice(&(-3i32).to_be_bytes());
        let mut reader = AsyncFrameReader::new(&wire[..]);

        assert_eq!(reader.next_element().await.unwrap(), Some(Element::text("a")));
        let err = reader.next_element().await.unwrap_err();
        assert!(err.to_string().contains("undefined length marker -3"));
        assert_eq!(reader.next_element().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_elements_before_oversized_frame_come_first() {
        let mut wire = vec![0u8, 0, 0, 2, b'o', b'k'];
        wire.extend_from_slice(&1000i32.to_be_bytes());
        let config = TransportConfig::default().max_payload_size(100);
        let mut reader = AsyncFrameReader::with_config(&wire[..], &config);

        assert_eq!(reader.next_element().await.unwrap(), Some(Element::text("ok")));
        assert!(matches!(
            reader.next_element().await,
            Err(BridgeError::PayloadTooLarge { length: 1000, max: 100 })
        ));
        assert!(reader.is_done());
    }

    #[tokio::test]
    async fn test_empty_stream_is_immediately_done() {
        let wire = [0xFFu8, 0xFF, 0xFF, 0xFF];
        let mut reader = AsyncFrameReader::new(&wire[..]);
        assert_eq!(reader.next_element().await.unwrap(), None);
        assert!(reader.is_done());
    }

    #[tokio::test]
    async fn test_null_marker_policy() {
        let wire = encode_stream(vec![Element::Null]).unwrap();

        let items = AsyncFrameReader::new(&wire[..]).collect().await.unwrap();
        assert_eq!(items, vec![Element::Null]);

        let config = TransportConfig::default().null_frames(NullFramePolicy::Reject);
        let err = AsyncFrameReader::with_config(&wire[..], &config)
            .collect()
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_raw_decoder() {
        let wire = encode_stream(vec![Element::bytes(vec![0u8, 0xFF, 7])]).unwrap();
        let items =
            AsyncFrameReader::<_, RawDecoder>::with_decoder(&wire[..], &TransportConfig::default())
                .collect()
                .await
                .unwrap();
        assert_eq!(items, vec![Element::bytes(vec![0u8, 0xFF, 7])]);
    }
}
