#[cfg(windows)]
use std::ffi::CString;
#[cfg(windows)]
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
#[cfg(unix)]
use std::os::unix::{io::AsRawFd, net::UnixStream};
#[cfg(windows)]
use std::os::windows::io::AsRawHandle;
#[cfg(windows)]
use std::ptr;
use std::time::Duration;

// Platform-specific imports
#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::socket::{
        connect as nix_connect, recv, socket, AddressFamily, MsgFlags, SockFlag, SockType,
        UnixAddr,
    },
};
use tracing;
#[cfg(windows)]
use windows_sys::Win32::{Foundation::*, System::Pipes::*};

use crate::error::OpenError;

/// Cross-platform client end of a local duplex byte channel
#[derive(Debug)]
pub enum PlatformSocket {
    #[cfg(unix)]
    /// Unix domain socket
    Unix(UnixStream),
    #[cfg(windows)]
    /// Windows named pipe opened as a file
    NamedPipe(File),
}

/// Reject names the OS could never resolve before making any call
fn validate_endpoint(endpoint: &str) -> Result<(), OpenError> {
    if endpoint.is_empty() || endpoint.contains('\0') {
        return Err(OpenError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}

#[cfg(unix)]
fn classify_connect_error(endpoint: &str, err: &io::Error) -> OpenError {
    match err.raw_os_error() {
        Some(libc::ENOENT) => {
            // connect(2) reports a missing directory and a missing socket the same way
            match std::path::Path::new(endpoint).parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                    OpenError::PathNotFound
                }
                _ => OpenError::EndpointNotFound,
            }
        }
        Some(libc::ENOTDIR) => OpenError::PathNotFound,
        Some(code)
            if code == libc::ECONNREFUSED || code == libc::EAGAIN || code == libc::EWOULDBLOCK =>
        {
            OpenError::Busy
        }
        _ => OpenError::from_io(err),
    }
}

#[cfg(windows)]
fn classify_connect_error(_endpoint: &str, err: &io::Error) -> OpenError {
    match err.raw_os_error().map(|code| code as u32) {
        Some(ERROR_FILE_NOT_FOUND) => OpenError::EndpointNotFound,
        Some(ERROR_PATH_NOT_FOUND) => OpenError::PathNotFound,
        Some(ERROR_PIPE_BUSY) => OpenError::Busy,
        _ => OpenError::from_io(err),
    }
}

/// Bytes queued on a Unix socket, as reported by FIONREAD
#[cfg(unix)]
fn queued_bytes(stream: &UnixStream) -> io::Result<usize> {
    let mut available: libc::c_int = 0;
    // SAFETY: ioctl with FIONREAD writes a single c_int through the pointer.
    // The fd is owned by `stream` and stays open for the duration of the call.
    let rc = unsafe {
        libc::ioctl(
            stream.as_raw_fd(),
            libc::FIONREAD,
            &mut available as *mut libc::c_int,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(available.max(0) as usize)
}

/// Connect without ever sleeping inside connect(2).
///
/// A blocking connect to a listener whose accept backlog is full parks the
/// caller with no timeout. Non-blocking, the same condition comes back as
/// EAGAIN and the caller's busy-wait loop stays in charge of the clock.
/// The returned stream is switched back to blocking mode.
#[cfg(unix)]
fn connect_unix_nonblocking(endpoint: &str) -> io::Result<UnixStream> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    let flags = SockFlag::SOCK_CLOEXEC;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let flags = SockFlag::empty();

    let fd = socket(AddressFamily::Unix, SockType::Stream, flags, None).map_err(io::Error::from)?;
    let stream = UnixStream::from(fd);
    stream.set_nonblocking(true)?;

    let addr = UnixAddr::new(endpoint).map_err(io::Error::from)?;
    match nix_connect(stream.as_raw_fd(), &addr) {
        Ok(()) => {}
        // Unix sockets never finish asynchronously; treat it like a full backlog
        Err(Errno::EINPROGRESS) => return Err(io::Error::from(Errno::EAGAIN)),
        Err(errno) => return Err(io::Error::from(errno)),
    }

    stream.set_nonblocking(false)?;
    Ok(stream)
}

impl PlatformSocket {
    /// Make a single connection attempt to an existing endpoint.
    ///
    /// The endpoint is used verbatim: a filesystem socket path on Unix, a full
    /// `\\.\pipe\...` path on Windows. Failures are classified but never retried here.
    pub fn connect(endpoint: &str) -> Result<Self, OpenError> {
        validate_endpoint(endpoint)?;

        #[cfg(unix)]
        {
            tracing::debug!("Attempting to connect to Unix socket: {}", endpoint);
            match connect_unix_nonblocking(endpoint) {
                Ok(stream) => {
                    tracing::debug!("Connected to Unix socket {}", endpoint);
                    Ok(PlatformSocket::Unix(stream))
                }
                Err(e) => {
                    let classified = classify_connect_error(endpoint, &e);
                    tracing::debug!(
                        "Connection to {} failed: {} (kind: {:?}) -> {:?}",
                        endpoint,
                        e,
                        e.kind(),
                        classified
                    );
                    Err(classified)
                }
            }
        }

        #[cfg(windows)]
        {
            tracing::debug!("Attempting to connect to Windows named pipe: {}", endpoint);
            match OpenOptions::new().read(true).write(true).open(endpoint) {
                Ok(file) => {
                    tracing::debug!("Connected to named pipe {}", endpoint);
                    Ok(PlatformSocket::NamedPipe(file))
                }
                Err(e) => {
                    let classified = classify_connect_error(endpoint, &e);
                    tracing::debug!(
                        "Connection to {} failed: {} -> {:?}",
                        endpoint,
                        e,
                        classified
                    );
                    Err(classified)
                }
            }
        }
    }

    /// Block for at most one wait cycle while a busy endpoint frees up.
    ///
    /// On Windows this is `WaitNamedPipeA` bounded by `timeout`. Unix sockets
    /// have no such primitive, so the caller sleeps `min(poll_interval, timeout)`
    /// and lets the next connect attempt decide.
    pub fn wait_for_endpoint(
        endpoint: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), OpenError> {
        validate_endpoint(endpoint)?;

        #[cfg(unix)]
        {
            std::thread::sleep(poll_interval.min(timeout));
            Ok(())
        }

        #[cfg(windows)]
        {
            let _ = poll_interval;
            let name = CString::new(endpoint)
                .map_err(|_| OpenError::InvalidEndpoint(endpoint.to_string()))?;
            // Zero would mean "use the server default", which is unbounded from our side
            let millis = timeout.as_millis().clamp(1, u32::MAX as u128 - 1) as u32;

            // SAFETY: WaitNamedPipeA only reads the NUL-terminated name, which
            // outlives the call.
            let ok = unsafe { WaitNamedPipeA(name.as_ptr() as *const u8, millis) };
            if ok != 0 {
                return Ok(());
            }

            // SAFETY: GetLastError() is always safe to call
            let error = unsafe { GetLastError() };
            tracing::debug!("WaitNamedPipeA on {} failed with error: {}", endpoint, error);
            match error {
                ERROR_FILE_NOT_FOUND => Err(OpenError::EndpointNotFound),
                ERROR_PATH_NOT_FOUND => Err(OpenError::PathNotFound),
                _ => Err(OpenError::Busy),
            }
        }
    }

    /// Number of bytes that can be read right now without blocking.
    ///
    /// Never consumes data. An error means the channel is unusable; on Unix an
    /// orderly shutdown by the peer is reported as `BrokenPipe` rather than as
    /// zero bytes.
    pub fn bytes_available(&self) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            PlatformSocket::Unix(stream) => {
                let available = queued_bytes(stream)?;
                if available > 0 {
                    return Ok(available);
                }

                // FIONREAD says 0 both when idle and after the peer hung up
                let mut probe = [0u8; 1];
                match recv(
                    stream.as_raw_fd(),
                    &mut probe,
                    MsgFlags::MSG_PEEK | MsgFlags::MSG_DONTWAIT,
                ) {
                    Ok(0) => Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "peer closed the connection",
                    )),
                    Ok(_) => queued_bytes(stream).map(|n| n.max(1)),
                    Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(0),
                    Err(errno) => Err(io::Error::from(errno)),
                }
            }
            #[cfg(windows)]
            PlatformSocket::NamedPipe(file) => {
                let mut available = 0u32;
                // SAFETY: PeekNamedPipe is called with a handle owned by `file`,
                // no data buffer (size 0) and a valid pointer for the available count.
                let result = unsafe {
                    PeekNamedPipe(
                        file.as_raw_handle() as HANDLE,
                        ptr::null_mut(),
                        0,
                        ptr::null_mut(),
                        &mut available,
                        ptr::null_mut(),
                    )
                };

                if result == 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(available as usize)
                }
            }
        }
    }

    /// Issue exactly one OS write call and report how many bytes it took
    pub fn write_once(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            PlatformSocket::Unix(stream) => loop {
                // MSG_NOSIGNAL turns a dead peer into EPIPE instead of SIGPIPE
                match nix::sys::socket::send(stream.as_raw_fd(), buf, MsgFlags::MSG_NOSIGNAL) {
                    Ok(written) => return Ok(written),
                    Err(Errno::EINTR) => continue,
                    Err(errno) => return Err(io::Error::from(errno)),
                }
            },
            #[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
            PlatformSocket::Unix(stream) => stream.write(buf),
            #[cfg(windows)]
            PlatformSocket::NamedPipe(file) => file.write(buf),
        }
    }
}

impl Read for PlatformSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            PlatformSocket::Unix(stream) => stream.read(buf),
            #[cfg(windows)]
            PlatformSocket::NamedPipe(file) => file.read(buf),
        }
    }
}

impl Write for PlatformSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_once(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            #[cfg(unix)]
            PlatformSocket::Unix(stream) => stream.flush(),
            #[cfg(windows)]
            PlatformSocket::NamedPipe(file) => file.flush(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixListener;

    use super::*;

    #[test]
    fn test_empty_endpoint_rejected() {
        let err = PlatformSocket::connect("").unwrap_err();
        assert!(matches!(err, OpenError::InvalidEndpoint(_)));

        let err = PlatformSocket::connect("bad\0name").unwrap_err();
        assert!(matches!(err, OpenError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_missing_socket_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sock");
        let err = PlatformSocket::connect(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err, OpenError::EndpointNotFound);
    }

    #[test]
    fn test_missing_directory_is_path_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("absent.sock");
        let err = PlatformSocket::connect(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err, OpenError::PathNotFound);
    }

    #[test]
    fn test_relative_missing_name_is_not_found() {
        let err = PlatformSocket::connect("pipelink-definitely-missing").unwrap_err();
        assert_eq!(err, OpenError::EndpointNotFound);
    }

    #[test]
    fn test_stale_socket_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        drop(UnixListener::bind(&path).unwrap());

        let err = PlatformSocket::connect(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err, OpenError::Busy);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_full_backlog_is_busy_not_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.sock");
        let listener = UnixListener::bind(&path).unwrap();
        // SAFETY: re-listen on a socket we own; only the backlog changes
        assert_eq!(unsafe { libc::listen(listener.as_raw_fd(), 0) }, 0);

        // Never accepted, so it occupies the only backlog slot
        let _queued = PlatformSocket::connect(path.to_str().unwrap()).unwrap();

        let started = std::time::Instant::now();
        let err = PlatformSocket::connect(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err, OpenError::Busy);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_bytes_available_tracks_peer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let socket = PlatformSocket::connect(path.to_str().unwrap()).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        assert_eq!(socket.bytes_available().unwrap(), 0);

        peer.write_all(b"hello").unwrap();
        assert_eq!(socket.bytes_available().unwrap(), 5);

        drop(peer);
        let mut socket = socket;
        let mut buf = [0u8; 5];
        socket.read_exact(&mut buf).unwrap();
        let err = socket.bytes_available().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_wait_for_endpoint_is_bounded() {
        let started = std::time::Instant::now();
        PlatformSocket::wait_for_endpoint(
            "/tmp/unused.sock",
            Duration::from_millis(20),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
