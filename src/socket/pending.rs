use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd};

use crate::addr::{self, Side};
use crate::error::Error;
use crate::network::Network;
use super::raw::so_error;
use super::stream::Connection;

/// A socket whose connect() returned success.
///
/// Not yet a `Connection`: on some platforms a reuse-configured dial
/// reports success before the kernel attaches the peer address.
/// `remote_addr()` tells whether it is there yet; the dial poller
/// turns the attempt into a `Connection` once it is.
pub struct ConnectAttempt {
    fd: OwnedFd,
    network: Network,
}

impl ConnectAttempt {
    pub(crate) fn from_fd(fd: OwnedFd, network: Network) -> Self {
        Self { fd, network }
    }

    #[inline]
    pub fn as_raw_fd(&self) -> libc::c_int {
        self.fd.as_raw_fd()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Reads and clears the socket error status.
    ///
    /// Returns `None` if no error is pending.
    pub fn take_error(&self) -> Result<Option<std::io::Error>, Error> {
        match so_error(self.as_raw_fd())? {
            0 => Ok(None),
            e => Ok(Some(std::io::Error::from_raw_os_error(e))),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        addr::local_addr(self.as_raw_fd())
    }

    /// The peer address, if the kernel has populated it.
    ///
    /// Errors while asking count as "not yet".
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        match addr::query(self.as_raw_fd(), Side::Peer) {
            Ok(addr) => addr,
            Err(e) => {
                log::trace!("getpeername on fd {} failed: {}", self.as_raw_fd(), e);
                None
            }
        }
    }

    /// Completes the attempt with the remote address that was observed.
    pub(crate) fn finish(self, remote: SocketAddr) -> Connection {
        Connection::from_fd(self.fd, self.network, remote)
    }
}

impl std::fmt::Debug for ConnectAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectAttempt")
            .field("fd", &self.fd.as_raw_fd())
            .field("network", &self.network)
            .finish()
    }
}

impl AsRawFd for ConnectAttempt {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for ConnectAttempt {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl IntoRawFd for ConnectAttempt {
    fn into_raw_fd(self) -> std::os::fd::RawFd {
        self.fd.into_raw_fd()
    }
}
