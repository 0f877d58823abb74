//! Transport module - sockets to the worker process.
//!
//! Provides abstraction over:
//! - TCP loopback sockets (all platforms)
//! - Unix Domain Sockets (Linux/macOS)
//!
//! Spawning the worker and deciding when to tear the channel down belong to
//! the caller; this module only establishes and splits the byte stream.

mod socket;

#[cfg(unix)]
pub use socket::generate_socket_path;
pub use socket::{ChannelReader, ChannelWriter, WorkerChannel, WorkerListener};
