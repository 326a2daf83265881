use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};

use crate::addr::{self, FromSockAddr, ToSockAddr};
use crate::error::{Error, IoError, errno};
use crate::network::Network;
use super::set_nonblocking_fd;

/// A bound, unconnected datagram socket.
///
/// Each send names a destination, each recv reports the source.
pub struct PacketConn {
	fd: OwnedFd,
	network: Network,
}

impl PacketConn {
	pub(crate) fn from_fd(fd: OwnedFd, network: Network) -> Self {
		Self { fd, network }
	}

	pub fn network(&self) -> Network {
		self.network
	}

	pub fn local_addr(&self) -> Result<SocketAddr, Error> {
		addr::local_addr(self.fd.as_raw_fd())
	}

	/// Sends data to a specific address.
	///
	/// Returns the number of bytes sent.
	pub fn send_to(&self, buf: &[u8], addr: &SocketAddr) -> std::io::Result<usize> {
		let n = addr.with_raw(|ptr, len| unsafe {
			libc::sendto(
				self.fd.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				0,
				ptr,
				len,
			)
		});

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	/// Receives one datagram, returning bytes read and the sender.
	pub fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

		let n = unsafe {
			libc::recvfrom(
				self.fd.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
				&mut storage as *mut _ as *mut libc::sockaddr,
				&mut len,
			)
		};

		if n == -1 {
			return Err(IoError::Read { errno: errno() }.into());
		}

		let from = unsafe {
			SocketAddr::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
		};
		match from {
			Some(from) => Ok((n as usize, from)),
			None => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid source address")),
		}
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
		set_nonblocking_fd(self.fd.as_raw_fd(), nonblocking)
	}
}

impl std::fmt::Debug for PacketConn {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PacketConn")
			.field("fd", &self.fd.as_raw_fd())
			.field("network", &self.network)
			.finish()
	}
}

impl AsRawFd for PacketConn {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl AsFd for PacketConn {
	fn as_fd(&self) -> BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl IntoRawFd for PacketConn {
	fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}
