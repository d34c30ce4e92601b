//! pipelink common library
//!
//! Building blocks shared by the pipelink transport:
//!
//! - Platform-specific client channels (Unix domain sockets, Windows named pipes)
//! - Typed error outcomes for open, read and write
//! - Transport configuration with environment overrides
//! - Candidate endpoint enumeration for numbered endpoint families
//!
//! Nothing here interprets the bytes that travel over a channel.

/// Transport configuration
pub mod config;

/// Typed outcomes for open, read and write
pub mod error;

/// Candidate endpoint names
pub mod location;

/// Platform-specific socket implementations
pub mod platform_socket;

// Re-export commonly used types for convenience
pub use config::{TransportConfig, DEFAULT_ENDPOINT_PREFIX};
pub use error::{OpenError, ReadError, WriteError};
pub use location::EndpointLocator;
pub use platform_socket::PlatformSocket;
