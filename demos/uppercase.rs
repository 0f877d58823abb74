//! Uppercase Worker - one full exchange over TCP loopback.
//!
//! This example demonstrates:
//! - Binding a listener the worker connects back to
//! - A worker that decodes frames and answers each one as it arrives
//! - Driving both directions at once with `Exchange`
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=udfwire=debug cargo run --example uppercase
//! ```

use std::thread;

use udfwire::transport::{WorkerChannel, WorkerListener};
use udfwire::{Element, Exchange, FrameReader, FrameWriter, TransportConfig, UdfDescriptor};

/// Stand-in for the external worker process.
fn run_worker(addr: std::net::SocketAddr) -> udfwire::Result<()> {
    let channel = WorkerChannel::connect_tcp(addr)?;
    let (reader, writer) = channel.split()?;

    // Upper-case text, keep nulls as nulls.
    let output = FrameReader::new(reader).map(|item| {
        item.map(|element| match element.as_text() {
            Some(text) => Element::text(text.to_uppercase()),
            None => element,
        })
    });

    let results: Vec<Element> = output.collect::<udfwire::Result<_>>()?;
    FrameWriter::new(writer, UdfDescriptor::named("uppercase"), Some(results))?.send()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let listener = WorkerListener::bind_tcp("127.0.0.1:0")?;
    let addr = listener
        .local_addr()
        .ok_or("listener has no TCP address")?;

    let worker = thread::spawn(move || run_worker(addr));
    let channel = listener.accept()?;

    let exchange = Exchange::new(TransportConfig::default().buffer_size(16 * 1024));
    let input = vec![
        Element::text("hello"),
        Element::Null,
        Element::text("wire"),
    ];
    let output = exchange.run(&channel, &UdfDescriptor::named("uppercase"), Some(input))?;

    worker.join().map_err(|_| "worker thread panicked")??;

    println!(
        "sent {} elements in {} bytes",
        output.sent.elements, output.sent.bytes
    );
    for element in &output.elements {
        match element.as_text() {
            Some(text) => println!("  {}", text),
            None => println!("  <{}>", element.kind()),
        }
    }

    Ok(())
}
