use std::time::Duration;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by listen, dial and the socket states behind them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported network: {network}")]
    Unsupported { network: String },

    #[error("cannot resolve {address}: {reason}")]
    Resolve { address: String, reason: String },

    #[error("socket() failed: {}", errno_to_str(*.errno))]
    Create { errno: i32 },

    #[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
    SetOption { errno: i32, option: &'static str },

    #[error("getsockopt({option}) failed: {}", errno_to_str(*.errno))]
    GetOption { errno: i32, option: &'static str },

    #[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
    Bind { errno: i32, addr: String },

    #[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
    Listen { errno: i32, backlog: i32 },

    #[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
    Connect { errno: i32, addr: String },

    #[error("accept() failed: {}", errno_to_str(*.errno))]
    Accept { errno: i32 },

    /// The remote address never showed up on a dialed socket.
    /// The socket was closed before this was returned.
    #[error("reuse failed: no remote address after {waited:?} ({polls} polls)")]
    ReuseFailed { waited: Duration, polls: u32 },
}

/// Error category, for callers that only care which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unsupported,
    Resolve,
    OsRejected,
    Create,
    Bind,
    Listen,
    Connect,
    Accept,
    ReuseFailed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Resolve { .. } => ErrorKind::Resolve,
            Error::SetOption { .. } | Error::GetOption { .. } => ErrorKind::OsRejected,
            Error::Create { .. } => ErrorKind::Create,
            Error::Bind { .. } => ErrorKind::Bind,
            Error::Listen { .. } => ErrorKind::Listen,
            Error::Connect { .. } => ErrorKind::Connect,
            Error::Accept { .. } => ErrorKind::Accept,
            Error::ReuseFailed { .. } => ErrorKind::ReuseFailed,
        }
    }

    /// The OS error code carried by this error, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Create { errno }
            | Error::SetOption { errno, .. }
            | Error::GetOption { errno, .. }
            | Error::Bind { errno, .. }
            | Error::Listen { errno, .. }
            | Error::Connect { errno, .. }
            | Error::Accept { errno } => Some(*errno),
            Error::Unsupported { .. } | Error::Resolve { .. } | Error::ReuseFailed { .. } => None,
        }
    }
}

/// Errors from the socket option controller.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The handle is neither a stream nor a datagram socket, or its type
    /// does not match the requested network.
    #[error("unsupported socket type {sock_type}")]
    Unsupported { sock_type: i32 },

    #[error("setsockopt({option}) rejected: {}", errno_to_str(*.errno))]
    OsRejected { errno: i32, option: &'static str },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Unsupported { sock_type } => Error::Unsupported {
                network: format!("socket type {}", sock_type),
            },
            ConfigError::OsRejected { errno, option } => Error::SetOption { errno, option },
        }
    }
}

/// Read and write failures on a connected socket.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("read() failed: {}", errno_to_str(*.errno))]
    Read { errno: i32 },

    #[error("write() failed: {}", errno_to_str(*.errno))]
    Write { errno: i32 },
}

/// Returns current errno value.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Returns current errno value.
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "dragonfly"))]
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__error() }
}

/// Returns current errno value.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
#[inline]
pub fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINPROGRESS => "operation in progress".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOPROTOOPT => "protocol option not available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Unsupported { .. } => std::io::ErrorKind::Unsupported,
            Error::Resolve { .. } => std::io::ErrorKind::InvalidInput,
            Error::ReuseFailed { .. } => std::io::ErrorKind::TimedOut,
            other => other.errno().map_or(std::io::ErrorKind::Other, errno_to_kind),
        };
        std::io::Error::new(kind, err)
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        let kind = match &err {
            IoError::Read { errno } | IoError::Write { errno } => errno_to_kind(*errno),
        };
        std::io::Error::new(kind, err)
    }
}
