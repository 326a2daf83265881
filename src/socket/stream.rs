use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd, RawFd};

use crate::addr;
use crate::error::{Error, IoError, errno};
use crate::network::Network;
use super::set_nonblocking_fd;

/// An established connection, dialed or accepted.
///
/// A `Connection` always knows its remote address: it is captured when the
/// connection is created, so it can never be observed as absent.
/// For `udp*` networks this is a connected datagram socket.
pub struct Connection {
	fd: OwnedFd,
	network: Network,
	remote: SocketAddr,
}

impl Connection {
	pub(crate) fn from_fd(fd: OwnedFd, network: Network, remote: SocketAddr) -> Self {
		Self { fd, network, remote }
	}

	/// Returns the raw file descriptor.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	pub fn network(&self) -> Network {
		self.network
	}

	pub fn remote_addr(&self) -> SocketAddr {
		self.remote
	}

	pub fn local_addr(&self) -> Result<SocketAddr, Error> {
		addr::local_addr(self.as_raw_fd())
	}

	pub fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::read(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
			)
		};

		if n == -1 {
			Err(IoError::Read { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::write(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
			)
		};

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
		set_nonblocking_fd(self.as_raw_fd(), nonblocking)
	}

	pub fn shutdown(&self, how: Shutdown) -> Result<(), Error> {
		let how = match how {
			Shutdown::Read => libc::SHUT_RD,
			Shutdown::Write => libc::SHUT_WR,
			Shutdown::ReadWrite => libc::SHUT_RDWR,
		};

		let result = unsafe { libc::shutdown(self.as_raw_fd(), how) };

		if result == -1 {
			Err(Error::SetOption { errno: errno(), option: "shutdown" })
		} else {
			Ok(())
		}
	}
}

/// Which halves of a connection `shutdown` closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
	Read,   // SHUT_RD
	Write,  // SHUT_WR
	ReadWrite,   // SHUT_RDWR
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("fd", &self.as_raw_fd())
			.field("network", &self.network)
			.field("remote", &self.remote)
			.finish()
	}
}

impl std::io::Read for Connection {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		Connection::read(self, buf)
	}
}

impl std::io::Write for Connection {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Connection::write(self, buf)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())  // no userspace buffering
	}
}

impl AsRawFd for Connection {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl AsFd for Connection {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl IntoRawFd for Connection {
	fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}
