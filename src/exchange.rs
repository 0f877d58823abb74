//! One full host ↔ worker exchange over a [`WorkerChannel`].
//!
//! The input is fed on a dedicated scoped thread while the calling thread
//! drains the worker's output. Running the two halves concurrently avoids
//! the deadlock where the host blocks on a full send buffer while the
//! worker blocks on a full reply buffer.
//!
//! Once the worker's output ends, the feeder gets
//! [`TransportConfig::drain_timeout`] to finish. A worker that stopped
//! reading without closing its socket is cut off after that.
//!
//! ```text
//!             ┌─ feeder thread ── FrameWriter ──► ChannelWriter ─┐
//! Exchange ───┤                                                  ├─ worker
//!             └─ caller thread ◄─ FrameReader ◄── ChannelReader ─┘
//! ```

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use crate::config::TransportConfig;
use crate::element::{Element, IntoElement};
use crate::error::{BridgeError, Result};
use crate::reader::FrameReader;
use crate::transport::WorkerChannel;
use crate::udf::UdfDescriptor;
use crate::writer::{FrameWriter, SendSummary};

/// Outcome of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutput {
    /// Elements produced by the worker, in stream order.
    pub elements: Vec<Element>,
    /// What the feeder wrote.
    pub sent: SendSummary,
}

/// Drives a writer and a reader over one channel.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    config: TransportConfig,
}

impl Exchange {
    /// Create an exchange with the given transport settings.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Transport settings used for both halves.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send `input` to the worker and collect everything it returns.
    ///
    /// The channel is borrowed, never closed on success. If either side
    /// fails the socket is shut down so the other side cannot hang on a
    /// worker that stopped making progress; the feeder's error is then
    /// reported in preference to the reader's.
    ///
    /// # Errors
    ///
    /// [`BridgeError::MissingInput`] before any I/O if `input` is `None`,
    /// [`BridgeError::InputNotConsumed`] if the feeder is still blocked a
    /// drain timeout after the worker's output ended, otherwise the first
    /// transport, encode or decode failure.
    pub fn run<I, T>(
        &self,
        channel: &WorkerChannel,
        udf: &UdfDescriptor,
        input: Option<I>,
    ) -> Result<ExchangeOutput>
    where
        I: IntoIterator<Item = T> + Send,
        T: IntoElement,
    {
        let input = input.ok_or(BridgeError::MissingInput)?;
        let (reader_half, mut writer_half) = channel.split()?;
        let config = &self.config;

        tracing::debug!(udf = %udf.name, peer = %channel.describe(), "Starting exchange");

        thread::scope(|scope| {
            let (done_tx, done_rx) = mpsc::channel();
            let feeder = scope.spawn(move || {
                let result =
                    FrameWriter::with_config(&mut writer_half, udf.clone(), Some(input), config)
                        .and_then(FrameWriter::send);
                if result.is_err() {
                    let _ = writer_half.abort();
                }
                let _ = done_tx.send(result);
            });

            let mut elements = Vec::new();
            let mut read_error = None;
            for item in FrameReader::with_config(reader_half, config) {
                match item {
                    Ok(element) => elements.push(element),
                    Err(e) => {
                        // The feeder may be blocked on a worker that stopped reading.
                        let _ = channel.shutdown();
                        read_error = Some(e);
                        break;
                    }
                }
            }

            let mut cut_off = false;
            let outcome = match read_error {
                // Channel already shut down; the feeder cannot stay blocked.
                Some(_) => done_rx.recv().ok(),
                None => match done_rx.recv_timeout(config.drain_timeout()) {
                    Ok(result) => Some(result),
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::warn!(
                            udf = %udf.name,
                            received = elements.len(),
                            "Worker output ended with input still pending, closing channel"
                        );
                        let _ = channel.shutdown();
                        cut_off = true;
                        done_rx.recv().ok()
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                },
            };
            feeder.join().map_err(|_| BridgeError::WorkerPanicked)?;

            let sent = match outcome {
                Some(Ok(sent)) => sent,
                Some(Err(_)) if cut_off => {
                    return Err(BridgeError::InputNotConsumed {
                        received: elements.len(),
                    })
                }
                Some(Err(e)) => return Err(e),
                None => return Err(BridgeError::WorkerPanicked),
            };
            if let Some(e) = read_error {
                return Err(e);
            }

            tracing::debug!(
                udf = %udf.name,
                sent = sent.elements,
                received = elements.len(),
                "Exchange complete"
            );

            Ok(ExchangeOutput { elements, sent })
        })
    }
}
