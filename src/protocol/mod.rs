//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary protocol shared by both directions:
//! - 4-byte signed big-endian length prefix with reserved markers
//! - Element-to-frame encoding
//! - Frame buffer for accumulating partial reads

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{encode_element, encode_stream, payload_length, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Marker, ABSOLUTE_MAX_PAYLOAD_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_PAYLOAD_SIZE,
    END_OF_DATA_SECTION, LENGTH_PREFIX_SIZE, NULL,
};
