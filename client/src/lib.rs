//! pipelink client
//!
//! A minimal client transport over local IPC endpoints (Unix domain sockets on
//! Unix-like systems, named pipes on Windows). It moves opaque byte frames and
//! leaves framing, encoding and protocol to the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pipelink_client::{PipeTransport, TransportConfig};
//!
//! let config = TransportConfig::new().with_busy_timeout(Duration::from_secs(10));
//! let mut transport = PipeTransport::new(config);
//! transport.open("/run/user/1000/discord-ipc-0")?;
//!
//! transport.write_frame(&[0x01, 0x02, 0x03])?;
//!
//! let mut buf = [0u8; 4096];
//! let read = transport.read_frame(&mut buf)?;
//! println!("received {read} bytes");
//!
//! transport.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod transport;

pub use transport::*;
// Re-export important types from pipelink-common for convenience
pub use pipelink_common::{
    EndpointLocator, OpenError, ReadError, TransportConfig, WriteError, DEFAULT_ENDPOINT_PREFIX,
};
