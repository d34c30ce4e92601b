use std::{
    io::{self, Read},
    time::Instant,
};

use pipelink_common::{
    config::TransportConfig,
    error::{OpenError, ReadError, WriteError},
    platform_socket::PlatformSocket,
};

/// Client end of a local pipe carrying caller-defined frames.
///
/// Owns at most one OS channel. Reads never wait for data, writes go out in a
/// single call, and any fatal I/O error closes the channel so that
/// [`is_connected`](Self::is_connected) reflects reality without an explicit
/// [`close`](Self::close).
#[derive(Debug, Default)]
pub struct PipeTransport {
    config:   TransportConfig,
    socket:   Option<PlatformSocket>,
    is_open:  bool,
    endpoint: Option<String>,
}

impl PipeTransport {
    /// Creates a closed transport with the given configuration
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            socket: None,
            is_open: false,
            endpoint: None,
        }
    }

    /// Creates a closed transport with default configuration
    pub fn with_defaults() -> Self {
        Self::new(TransportConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Name of the connected endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().filter(|_| self.is_connected())
    }

    /// Connect to an existing endpoint.
    ///
    /// Any current connection is closed first. A busy endpoint is waited on
    /// and retried until `busy_timeout` runs out, after which
    /// [`OpenError::Busy`] is returned. Not-found errors return immediately.
    /// On any error the transport is left closed.
    pub fn open(&mut self, endpoint: &str) -> Result<(), OpenError> {
        self.close();
        let deadline = Instant::now() + self.config.busy_timeout;
        self.open_until(endpoint, deadline)
    }

    /// Try each candidate in order and stay on the first that connects.
    ///
    /// Returns the name that connected, or the error of the last candidate.
    /// An empty candidate list yields [`OpenError::EndpointNotFound`].
    ///
    /// All candidates share one `busy_timeout` budget. Once it is spent, each
    /// remaining candidate still gets a single connect attempt, so a stale
    /// endpoint early in the list cannot hide a live one behind it.
    pub fn open_first<I, S>(&mut self, candidates: I) -> Result<String, OpenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.close();
        let deadline = Instant::now() + self.config.busy_timeout;
        let mut last_error = OpenError::EndpointNotFound;

        for candidate in candidates {
            let candidate = candidate.as_ref();
            match self.open_until(candidate, deadline) {
                Ok(()) => return Ok(candidate.to_string()),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", candidate, e);
                    last_error = e;
                }
            }
        }

        tracing::warn!("No candidate endpoint accepted a connection: {}", last_error);
        Err(last_error)
    }

    /// Connect loop behind `open` and `open_first`; the transport must be closed
    fn open_until(&mut self, endpoint: &str, deadline: Instant) -> Result<(), OpenError> {
        let mut attempts: u32 = 0;

        let socket = loop {
            attempts += 1;
            match PlatformSocket::connect(endpoint) {
                Ok(socket) => break socket,
                Err(OpenError::Busy) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        tracing::warn!(
                            "Endpoint {} still busy after {} attempt(s), giving up",
                            endpoint,
                            attempts
                        );
                        return Err(OpenError::Busy);
                    }

                    tracing::debug!(
                        "Endpoint {} busy (attempt {}), waiting up to {:?}",
                        endpoint,
                        attempts,
                        remaining
                    );
                    PlatformSocket::wait_for_endpoint(
                        endpoint,
                        remaining,
                        self.config.effective_poll_interval(),
                    )?;
                }
                Err(e) => {
                    tracing::debug!("Failed to open {}: {}", endpoint, e);
                    return Err(e);
                }
            }
        };

        self.socket = Some(socket);
        self.is_open = true;
        self.endpoint = Some(endpoint.to_string());
        tracing::info!("Connected to {} after {} attempt(s)", endpoint, attempts);
        Ok(())
    }

    /// Whether a live channel is held
    pub fn is_connected(&self) -> bool {
        self.is_open && self.socket.is_some()
    }

    /// Read whatever is already waiting on the channel, up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` when nothing has arrived yet; callers are expected to
    /// poll. An empty `buf` returns `Ok(0)` without touching the channel.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let available = match self.live_socket() {
            Some(socket) => socket.bytes_available(),
            None => return Err(ReadError::NotConnected),
        };

        let available = match available {
            Ok(0) => return Ok(0),
            Ok(n) => n,
            Err(e) => {
                self.fail("peek", &e);
                return Err(ReadError::BrokenPipe(e));
            }
        };

        let want = available.min(buf.len());
        let result = match self.live_socket_mut() {
            Some(socket) => socket.read(&mut buf[..want]),
            None => return Err(ReadError::NotConnected),
        };

        match result {
            Ok(read) => {
                tracing::trace!("Read {} of {} available bytes", read, available);
                Ok(read)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) => {
                self.fail("read", &e);
                Err(ReadError::ReadFailed(e))
            }
        }
    }

    /// Write the whole buffer in a single OS call.
    ///
    /// An empty buffer succeeds even when not connected. A short write is an
    /// error but leaves the connection open; the unsent tail is not retried.
    pub fn write_frame(&mut self, buf: &[u8]) -> Result<(), WriteError> {
        if buf.is_empty() {
            return Ok(());
        }

        let result = match self.live_socket_mut() {
            Some(socket) => socket.write_once(buf),
            None => return Err(WriteError::NotConnected),
        };

        match result {
            Ok(written) if written == buf.len() => {
                tracing::trace!("Wrote {} bytes", written);
                Ok(())
            }
            Ok(written) => {
                tracing::warn!("Short write: {} of {} bytes", written, buf.len());
                Err(WriteError::ShortWrite {
                    written,
                    expected: buf.len(),
                })
            }
            Err(e) => {
                self.fail("write", &e);
                Err(WriteError::Failed(e))
            }
        }
    }

    /// Release the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.as_deref() {
            tracing::info!("Closing connection to {}", endpoint);
        }
        self.reset();
    }

    fn live_socket(&self) -> Option<&PlatformSocket> {
        self.socket.as_ref().filter(|_| self.is_open)
    }

    fn live_socket_mut(&mut self) -> Option<&mut PlatformSocket> {
        if self.is_open {
            self.socket.as_mut()
        } else {
            None
        }
    }

    /// Fatal I/O on the channel: drop it so the state says closed
    fn fail(&mut self, operation: &str, err: &io::Error) {
        tracing::warn!(
            "{} on {} failed, closing: {}",
            operation,
            self.endpoint.as_deref().unwrap_or("<unknown>"),
            err
        );
        self.reset();
    }

    fn reset(&mut self) {
        self.socket = None;
        self.is_open = false;
        self.endpoint = None;
    }
}

impl Drop for PipeTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            self.close();
        }
    }
}
