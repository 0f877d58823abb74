//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForLength`: Need at least 4 bytes
//! - `WaitingForPayload`: Length parsed, need N more payload bytes
//! - `Finished`: End-of-stream seen, nothing more is extracted
//!
//! # Example
//!
//! ```
//! use udfwire::protocol::{Frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(&[0, 0, 0, 2, b'h']).unwrap().is_empty());
//! let frames = buffer.push(&[b'i', 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
//!
//! assert_eq!(frames.len(), 2);
//! assert_eq!(frames[1], Frame::End);
//! assert!(buffer.is_finished());
//! ```

use bytes::BytesMut;

use super::wire_format::{Marker, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE};
use super::Frame;
use crate::error::{BridgeError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete length prefix.
    WaitingForLength,
    /// Length parsed, waiting for payload bytes.
    WaitingForPayload { remaining: usize },
    /// End-of-stream extracted.
    Finished,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 1GB.
    pub fn new() -> Self {
        Self::with_capacity_and_max_payload(64 * 1024, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self::with_capacity_and_max_payload(64 * 1024, max_payload_size)
    }

    /// Create a new frame buffer with custom capacity and max payload.
    pub fn with_capacity_and_max_payload(capacity: usize, max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForLength,
            max_payload_size,
        }
    }

    /// Append data without parsing it.
    ///
    /// Pair with [`try_extract_one`](Self::try_extract_one) to get every
    /// complete frame ahead of a bad one before its error.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// If data is fragmented, partial data is buffered internally for the
    /// next push. Bytes arriving after the end-of-stream frame are kept but
    /// never parsed.
    ///
    /// # Errors
    ///
    /// Returns error if a length prefix is undefined or exceeds
    /// `max_payload_size`. Frames extracted earlier in the same call are
    /// dropped with it.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.extend(data);

        let mut frames = Vec::new();

        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed or the stream is finished
    /// - `Err(...)` on protocol violation
    pub fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::Finished => Ok(None),

            State::WaitingForLength => {
                let marker = match Marker::decode(&self.buffer) {
                    Some(marker) => marker,
                    None => return Ok(None),
                };

                let frame = match marker {
                    Marker::EndOfStream => {
                        self.state = State::Finished;
                        Some(Frame::End)
                    }
                    Marker::Null => Some(Frame::Null),
                    Marker::Undefined(n) => {
                        return Err(BridgeError::Decode(format!(
                            "undefined length marker {}",
                            n
                        )));
                    }
                    Marker::Payload(len) => {
                        if len > self.max_payload_size {
                            return Err(BridgeError::PayloadTooLarge {
                                length: len as u64,
                                max: self.max_payload_size as u64,
                            });
                        }
                        self.state = State::WaitingForPayload {
                            remaining: len as usize,
                        };
                        None
                    }
                };

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                match frame {
                    Some(frame) => Ok(Some(frame)),
                    None => self.try_extract_one(),
                }
            }

            State::WaitingForPayload { remaining } => {
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForLength;

                Ok(Some(Frame::Data(payload)))
            }
        }
    }

    /// Bytes still needed to complete the frame in progress.
    ///
    /// Zero when no frame is in progress.
    pub fn pending_bytes(&self) -> usize {
        match self.state {
            State::WaitingForLength if !self.buffer.is_empty() => {
                LENGTH_PREFIX_SIZE.saturating_sub(self.buffer.len())
            }
            State::WaitingForPayload { remaining } => remaining.saturating_sub(self.buffer.len()),
            _ => 0,
        }
    }

    /// Error describing the frame cut off by an early end of input.
    pub fn truncation(&self) -> BridgeError {
        match self.state {
            State::WaitingForPayload { remaining } => BridgeError::Truncated {
                expected: remaining,
                received: self.buffer.len(),
            },
            _ => BridgeError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                received: self.buffer.len().min(LENGTH_PREFIX_SIZE),
            },
        }
    }

    /// Check if the end-of-stream frame has been extracted.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForPayload { .. } => "WaitingForPayload",
            State::Finished => "Finished",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
