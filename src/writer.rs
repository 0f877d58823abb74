//! Blocking frame writer: host → worker.
//!
//! A [`FrameWriter`] is built once per invocation around the outbound half
//! of the worker channel, sends its whole input followed by the
//! end-of-stream marker, and is then dropped. It never closes the channel;
//! pass `&mut stream` to keep ownership with the caller.
//!
//! ```text
//! input ─► IntoElement ─► write() ─► BufWriter (8 KB) ─► channel
//!                                        └─ END_OF_DATA_SECTION, flush
//! ```
//!
//! # Example
//!
//! ```
//! use udfwire::{FrameWriter, UdfDescriptor};
//!
//! let mut out = Vec::new();
//! let writer = FrameWriter::new(&mut out, UdfDescriptor::named("id"), Some(vec!["a"])).unwrap();
//! writer.send().unwrap();
//!
//! assert_eq!(out, vec![0, 0, 0, 1, b'a', 0xFF, 0xFF, 0xFF, 0xFF]);
//! ```

use std::io::{BufWriter, Write};

use bytes::BytesMut;

use crate::config::TransportConfig;
use crate::element::{Element, IntoElement};
use crate::error::{BridgeError, Result};
use crate::protocol::{encode_element, Frame};
use crate::udf::UdfDescriptor;

/// Counters reported by [`FrameWriter::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    /// Input elements written.
    pub elements: usize,
    /// Frames written, terminator included.
    pub frames: usize,
    /// Bytes written, terminator included.
    pub bytes: usize,
}

/// Encodes a finite input sequence onto an outbound byte stream.
pub struct FrameWriter<W: Write, I> {
    output: BufWriter<W>,
    udf: UdfDescriptor,
    input: Option<I>,
    scratch: BytesMut,
    summary: SendSummary,
}

impl<W, I, T> FrameWriter<W, I>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: IntoElement,
{
    /// Create a writer with the default 8 KB buffer.
    ///
    /// # Errors
    ///
    /// [`BridgeError::MissingInput`] if `input` is `None`. No I/O happens.
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
            input: Some(input),
            scratch: BytesMut::new(),
            summary: SendSummary::default(),
        })
    }

    /// The descriptor this writer was built with.
    pub fn udf(&self) -> &UdfDescriptor {
        &self.udf
    }

    /// Write every input element in order, then the end-of-stream marker,
    /// then flush.
    ///
    /// Blocks while the channel applies backpressure. On error the stream
    /// is left mid-frame and must not be used further.
    pub fn send(mut self) -> Result<SendSummary> {
        let input = self.input.take().ok_or(BridgeError::MissingInput)?;

        for value in input {
            let element = value.into_element().map_err(|e| {
                tracing::warn!(udf = %self.udf.name, "Aborting send: {}", e);
                e
            })?;
            self.write(&element)?;
            self.summary.elements += 1;
        }

        self.scratch.clear();
        Frame::End.encode_into(&mut self.scratch)?;
        self.flush_scratch(1)?;
        self.output.flush()?;

        tracing::debug!(
            udf = %self.udf.name,
            elements = self.summary.elements,
            frames = self.summary.frames,
            bytes = self.summary.bytes,
            "Input sent"
        );

        Ok(self.summary)
    }

    /// Write the frames for one element.
    ///
    /// Pairs recurse into key then value with no wrapping marker.
    /// Returns the number of frames written.
    ///
    /// The element is encoded in full before any of it is written, so an
    /// oversized payload fails without touching the stream.
    pub fn write(&mut self, element: &Element) -> Result<usize> {
        self.scratch.clear();
        let frames = encode_element(element, &mut self.scratch)?;
        self.flush_scratch(frames)?;
        Ok(frames)
    }

    fn flush_scratch(&mut self, frames: usize) -> Result<()> {
        self.output.write_all(&self.scratch)?;
        self.summary.frames += frames;
        self.summary.bytes += self.scratch.len();
        tracing::trace!(frames, bytes = self.scratch.len(), "Wrote frames");
        Ok(())
    }
}
