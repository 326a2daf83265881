mod listener;
mod raw;
mod stream;
mod datagram;
mod options;
mod bound;
mod builder;
mod pending;

pub use self::listener::Listener;
pub use self::raw::RawSocket;
pub use self::stream::{Connection, Shutdown};
pub use self::bound::BoundSocket;
pub use self::datagram::PacketConn;
pub use self::options::{configure, configure_with, Capabilities,
						set_reuse_addr, set_reuse_port, reuse_addr, reuse_port};
pub use self::pending::ConnectAttempt;
pub use self::builder::{ListenConfig, Dialer};

use crate::network::Kind;

/// Trait for socket type markers.
///
/// Each type implementing this trait represents a socket type
/// that can be passed to the `socket()` syscall.
///
/// - `Stream`: reliable, ordered byte stream (TCP)
/// - `Datagram`: unreliable, unordered packets (UDP)
pub trait SockType {
	const KIND: Kind;

	/// Returns the libc constant for this socket type.
	fn raw() -> libc::c_int;
}

/// Stream socket marker.
pub struct Stream;

/// Datagram socket marker.
pub struct Datagram;

impl SockType for Stream {
	const KIND: Kind = Kind::Stream;

	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_STREAM
	}
}

impl SockType for Datagram {
	const KIND: Kind = Kind::Datagram;

	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_DGRAM
	}
}

/// Sets or clears O_NONBLOCK on a descriptor.
pub(crate) fn set_nonblocking_fd(fd: libc::c_int, nonblocking: bool) -> crate::Result<()> {
	use crate::error::{Error, errno};

	let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
	if flags == -1 {
		return Err(Error::GetOption { errno: errno(), option: "F_GETFL" });
	}

	let new_flags = if nonblocking {
		flags | libc::O_NONBLOCK
	} else {
		flags & !libc::O_NONBLOCK
	};

	let result = unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) };
	if result == -1 {
		return Err(Error::SetOption { errno: errno(), option: "O_NONBLOCK" });
	}
	Ok(())
}
