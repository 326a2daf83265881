use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use crate::addr::{self, FromSockAddr};
use crate::error::{Error, errno};
use crate::network::Network;
use super::bound::BoundSocket;
use super::stream::Connection;
use super::{Stream, set_nonblocking_fd};

/// A listening socket ready to accept connections.
///
/// Only exists for Stream sockets. Datagram sockets cannot listen.
pub struct Listener {
    fd: OwnedFd,
    network: Network,
}

impl Listener {
    pub(crate) fn from_fd(fd: OwnedFd, network: Network) -> Self {
        Self { fd, network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        addr::local_addr(self.fd.as_raw_fd())
    }

    /// Accepts an incoming connection.
    ///
    /// Blocks unless the listener was made non-blocking, in which case an
    /// empty queue surfaces as `Error::Accept` with `EAGAIN`.
    /// The returned connection carries the client's address.
    pub fn accept(&self) -> Result<Connection, Error> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let fd = loop {
            let fd = unsafe {
                libc::accept4(
                    self.fd.as_raw_fd(),
                    &mut storage as *mut _ as *mut libc::sockaddr,
                    &mut len,
                    libc::SOCK_CLOEXEC,
                )
            };
            if fd != -1 {
                break fd;
            }
            match errno() {
                libc::EINTR => continue,
                e => return Err(Error::Accept { errno: e }),
            }
        };

        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        let remote = unsafe {
            SocketAddr::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
        }
        .ok_or(Error::GetOption { errno: libc::EAFNOSUPPORT, option: "SO_PEERNAME" })?;

        Ok(Connection::from_fd(fd, self.network, remote))
    }

    /// Sets or clears `O_NONBLOCK` on the listener.
    ///
    /// Accepted connections do not inherit it.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
        set_nonblocking_fd(self.fd.as_raw_fd(), nonblocking)
    }
}

impl BoundSocket<Stream> {
    /// Transitions to a listening socket.
    ///
    /// `backlog`: maximum pending connections queue size.
    pub fn listen(self, network: Network, backlog: i32) -> Result<Listener, Error> {
        let result = unsafe {
            libc::listen(self.as_raw_fd(), backlog)
        };

        if result == -1 {
            return Err(Error::Listen { errno: errno(), backlog });
        }

        Ok(Listener::from_fd(self.into_fd(), network))
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("fd", &self.fd.as_raw_fd())
            .field("network", &self.network)
            .finish()
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for Listener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl IntoRawFd for Listener {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}
