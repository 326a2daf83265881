use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd};

use crate::addr::{self, Family};
use crate::error::Error;
use crate::network::Network;
use super::pending::ConnectAttempt;
use super::raw;
use super::{Datagram, SockType};
use super::datagram::PacketConn;

/// A socket that has been bound to an address.
///
/// For Stream sockets: `.listen()` to become a Listener, or `.connect()`
/// to dial out from the bound address.
/// For Datagram sockets: `.into_packet_conn()`, or `.connect()`.
pub struct BoundSocket<T: SockType> {
	fd: OwnedFd,
	family: Family,
	_marker: PhantomData<T>,
}

impl<T: SockType> BoundSocket<T> {
	pub(crate) fn from_parts(fd: OwnedFd, family: Family) -> Self {
		Self {
			fd,
			family,
			_marker: PhantomData,
		}
	}

	#[inline]
	pub fn family(&self) -> Family {
		self.family
	}

	/// The address the socket ended up bound to (resolves port 0).
	pub fn local_addr(&self) -> Result<SocketAddr, Error> {
		addr::local_addr(self.fd.as_raw_fd())
	}

	/// Connects from the bound address.
	pub fn connect(self, network: Network, addr: &SocketAddr) -> Result<ConnectAttempt, Error> {
		debug_assert_eq!(network.kind(), T::KIND);
		raw::connect_blocking(self.fd, network, addr)
	}

	/// Connects from the bound address with a handshake bound.
	pub fn connect_timeout(
		self,
		network: Network,
		addr: &SocketAddr,
		timeout: std::time::Duration,
	) -> Result<ConnectAttempt, Error> {
		debug_assert_eq!(network.kind(), T::KIND);
		raw::connect_within(self.fd, network, addr, timeout)
	}

	/// Extracts the owned file descriptor, consuming self.
	pub(crate) fn into_fd(self) -> OwnedFd {
		self.fd
	}
}

impl BoundSocket<Datagram> {
	/// Finishes a datagram listen: the bound socket is ready for send_to/recv_from.
	pub fn into_packet_conn(self, network: Network) -> PacketConn {
		PacketConn::from_fd(self.into_fd(), network)
	}
}

impl<T: SockType> std::fmt::Debug for BoundSocket<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BoundSocket")
			.field("fd", &self.fd.as_raw_fd())
			.field("family", &self.family)
			.field("kind", &T::KIND)
			.finish()
	}
}

impl<T: SockType> AsRawFd for BoundSocket<T> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl<T: SockType> AsFd for BoundSocket<T> {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl<T: SockType> IntoRawFd for BoundSocket<T> {
	fn into_raw_fd(self) -> std::os::fd::RawFd {
		self.fd.into_raw_fd()
	}
}
