//! # udfwire
//!
//! Transport bridge between a data-processing host and a user-defined
//! function running in an external worker process.
//!
//! Records cross the process boundary as length-prefixed frames on a socket.
//! The host writes its input with a [`FrameWriter`] and lazily pulls the
//! worker's output with a [`FrameReader`]; the worker itself lives in another
//! runtime and only its wire behavior matters here.
//!
//! ## Wire format
//!
//! ```text
//! stream     := frame* end_frame
//! frame      := LENGTH:int32(BE) payload?   -- LENGTH >= 0: LENGTH payload bytes
//! null_frame := LENGTH:int32(BE) = -5
//! end_frame  := LENGTH:int32(BE) = -1       -- exactly once, last
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use udfwire::transport::WorkerListener;
//! use udfwire::{Exchange, TransportConfig, UdfDescriptor};
//!
//! let listener = WorkerListener::bind_tcp("127.0.0.1:0")?;
//! // ... launch the worker, pointing it at listener.local_addr() ...
//! let channel = listener.accept()?;
//!
//! let output = Exchange::new(TransportConfig::default()).run(
//!     &channel,
//!     &UdfDescriptor::named("upper"),
//!     Some(vec!["a", "b", "c"]),
//! )?;
//! for element in output.elements {
//!     println!("{:?}", element.as_text());
//! }
//! # Ok::<(), udfwire::BridgeError>(())
//! ```

pub mod codec;
pub mod config;
pub mod element;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod stream;
pub mod transport;
pub mod udf;
pub mod writer;

mod exchange;

pub use config::{NullFramePolicy, TransportConfig};
pub use element::{Element, FromElement, IntoElement};
pub use error::{BridgeError, Result};
pub use exchange::{Exchange, ExchangeOutput};
pub use reader::{FrameReader, Pairs};
pub use udf::UdfDescriptor;
pub use writer::{FrameWriter, SendSummary};
