use std::{thread, time::Duration};

use anyhow::{Context, Result};
use pipelink_client::{EndpointLocator, PipeTransport, TransportConfig, DEFAULT_ENDPOINT_PREFIX};

/// Connects to the first reachable endpoint, sends one frame and polls for a reply
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== pipelink Basic Example ===");

    let config = TransportConfig::from_env();
    println!("Busy wait budget: {:?}", config.busy_timeout);

    let locator = EndpointLocator::new(DEFAULT_ENDPOINT_PREFIX);
    let candidates = locator.candidates();
    println!("Trying {} candidate endpoints...", candidates.len());

    let mut transport = PipeTransport::new(config);
    let endpoint = match transport.open_first(&candidates) {
        Ok(endpoint) => endpoint,
        Err(e) if e.is_not_found() => {
            println!("No endpoint is listening. Start a host process first.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to open any endpoint"),
    };
    println!("✓ Connected to {endpoint}");

    let payload = std::env::args().nth(1).unwrap_or_else(|| "hello".to_string());
    transport
        .write_frame(payload.as_bytes())
        .context("Failed to send frame")?;
    println!("Sent {} bytes", payload.len());

    let mut buf = vec![0u8; 64 * 1024];
    for _ in 0..50 {
        let read = transport.read_frame(&mut buf).context("Failed to read frame")?;
        if read > 0 {
            println!("Received {read} bytes: {:02x?}", &buf[..read.min(32)]);
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    transport.close();
    println!("✓ Closed");
    Ok(())
}
