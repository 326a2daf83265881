use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::{Duration, Instant};

use crate::addr::{Family, ToSockAddr};
use crate::error::{ConfigError, Error, errno};
use crate::network::Network;
use super::bound::BoundSocket;
use super::options::{self, Capabilities};
use super::pending::ConnectAttempt;
use super::{SockType, set_nonblocking_fd};

/// A socket that has been created but not yet bound or connected.
///
/// This is the only state in which reuse options can be applied.
/// `bind()` and `connect()` consume it, so configuration cannot happen late.
pub struct RawSocket<T: SockType> {
	fd: OwnedFd,
	family: Family,
	_marker: PhantomData<T>,
}

impl<T: SockType> RawSocket<T> {
	/// Creates a new socket with `SOCK_CLOEXEC`.
	pub fn new(family: Family) -> Result<Self, Error> {
		let fd = unsafe {
			libc::socket(family.raw(), T::raw() | libc::SOCK_CLOEXEC, 0)
		};
		if fd == -1 {
			return Err(Error::Create { errno: errno() });
		}
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };

		Ok(Self {
			fd,
			family,
			_marker: PhantomData,
		})
	}

	#[inline]
	pub fn family(&self) -> Family {
		self.family
	}

	/// Runs the socket option controller on this socket.
	pub fn configure(&self, network: Network, caps: Capabilities) -> Result<(), ConfigError> {
		options::configure_with(self, network, caps)
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
		set_nonblocking_fd(self.as_raw_fd(), nonblocking)
	}

	/// Binds the socket to an address.
	///
	/// Consumes self, returns BoundSocket.
	pub fn bind(self, addr: &SocketAddr) -> Result<BoundSocket<T>, Error> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		});

		if result == -1 {
			return Err(Error::Bind {
				errno: errno(),
				addr: addr.to_string(),
			});
		}
		Ok(BoundSocket::from_parts(self.fd, self.family))
	}

	/// Connects to a remote address, blocking until the handshake completes.
	///
	/// For datagram sockets this only fixes the default destination.
	pub fn connect(self, network: Network, addr: &SocketAddr) -> Result<ConnectAttempt, Error> {
		debug_assert_eq!(network.kind(), T::KIND);
		connect_blocking(self.fd, network, addr)
	}

	/// Connects with an upper bound on the handshake.
	///
	/// The socket goes non-blocking for the connect, is waited on with
	/// `poll(2)`, and is switched back to blocking before returning.
	pub fn connect_timeout(
		self,
		network: Network,
		addr: &SocketAddr,
		timeout: Duration,
	) -> Result<ConnectAttempt, Error> {
		debug_assert_eq!(network.kind(), T::KIND);
		connect_within(self.fd, network, addr, timeout)
	}
}

pub(crate) fn connect_blocking(fd: OwnedFd, network: Network, addr: &SocketAddr) -> Result<ConnectAttempt, Error> {
	connect_fd(&fd, addr)?;
	Ok(ConnectAttempt::from_fd(fd, network))
}

pub(crate) fn connect_within(
	fd: OwnedFd,
	network: Network,
	addr: &SocketAddr,
	timeout: Duration,
) -> Result<ConnectAttempt, Error> {
	set_nonblocking_fd(fd.as_raw_fd(), true)?;

	let result = addr.with_raw(|ptr, len| unsafe {
		libc::connect(fd.as_raw_fd(), ptr, len)
	});

	let attempt = ConnectAttempt::from_fd(fd, network);
	if result == -1 {
		let e = errno();
		if e != libc::EINPROGRESS {
			return Err(Error::Connect { errno: e, addr: addr.to_string() });
		}
		wait_writable(&attempt, addr, timeout)?;
		match so_error(attempt.as_raw_fd())? {
			0 => {}
			e => return Err(Error::Connect { errno: e, addr: addr.to_string() }),
		}
	}

	set_nonblocking_fd(attempt.as_raw_fd(), false)?;
	Ok(attempt)
}

fn connect_fd(fd: &OwnedFd, addr: &SocketAddr) -> Result<(), Error> {
	loop {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(fd.as_raw_fd(), ptr, len)
		});
		if result == 0 {
			return Ok(());
		}
		match errno() {
			// The handshake finished while a retried call was interrupted.
			libc::EISCONN => return Ok(()),
			// A blocking connect interrupted by a signal keeps going in the
			// kernel; calling again reports its progress.
			libc::EINTR => continue,
			libc::EALREADY | libc::EINPROGRESS => {
				return wait_blocking_connect(fd, addr);
			}
			e => return Err(Error::Connect { errno: e, addr: addr.to_string() }),
		}
	}
}

fn wait_blocking_connect(fd: &OwnedFd, addr: &SocketAddr) -> Result<(), Error> {
	let mut pfd = libc::pollfd { fd: fd.as_raw_fd(), events: libc::POLLOUT, revents: 0 };
	loop {
		let n = unsafe { libc::poll(&mut pfd, 1, -1) };
		if n == -1 && errno() == libc::EINTR {
			continue;
		}
		if n == -1 {
			return Err(Error::Connect { errno: errno(), addr: addr.to_string() });
		}
		break;
	}
	match so_error(fd.as_raw_fd())? {
		0 => Ok(()),
		e => Err(Error::Connect { errno: e, addr: addr.to_string() }),
	}
}

fn wait_writable(attempt: &ConnectAttempt, addr: &SocketAddr, timeout: Duration) -> Result<(), Error> {
	// A deadline past what Instant can hold means no deadline.
	let deadline = Instant::now().checked_add(timeout);
	let mut pfd = libc::pollfd { fd: attempt.as_raw_fd(), events: libc::POLLOUT, revents: 0 };
	loop {
		let ms = match deadline {
			Some(deadline) => poll_millis(deadline.saturating_duration_since(Instant::now())),
			None => -1,
		};
		let n = unsafe { libc::poll(&mut pfd, 1, ms) };
		match n {
			-1 if errno() == libc::EINTR => continue,
			-1 => return Err(Error::Connect { errno: errno(), addr: addr.to_string() }),
			0 if deadline.is_some_and(|d| Instant::now() < d) => continue,
			0 => return Err(Error::Connect { errno: libc::ETIMEDOUT, addr: addr.to_string() }),
			_ => return Ok(()),
		}
	}
}

/// `poll(2)` timeout for `left`, rounded up to whole milliseconds.
fn poll_millis(left: Duration) -> libc::c_int {
	left.as_micros().div_ceil(1000).min(libc::c_int::MAX as u128) as libc::c_int
}

/// Reads and clears SO_ERROR.
pub(crate) fn so_error(fd: libc::c_int) -> Result<i32, Error> {
	let mut error: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

	let result = unsafe {
		libc::getsockopt(
			fd,
			libc::SOL_SOCKET,
			libc::SO_ERROR,
			&mut error as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};

	if result == -1 {
		return Err(Error::GetOption { errno: errno(), option: "SO_ERROR" });
	}
	Ok(error)
}

impl<T: SockType> std::fmt::Debug for RawSocket<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RawSocket")
			.field("fd", &self.fd.as_raw_fd())
			.field("family", &self.family)
			.field("kind", &T::KIND)
			.finish()
	}
}

impl<T: SockType> AsRawFd for RawSocket<T> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl<T: SockType> AsFd for RawSocket<T> {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl<T: SockType> IntoRawFd for RawSocket<T> {
	fn into_raw_fd(self) -> std::os::fd::RawFd {
		self.fd.into_raw_fd()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;
	use crate::socket::{ListenConfig, Listener, Stream};

	fn dial(target: &SocketAddr, timeout: Duration) -> Result<ConnectAttempt, Error> {
		RawSocket::<Stream>::new(Family::Inet4)?.connect_timeout(Network::Tcp4, target, timeout)
	}

	/// A loopback listener that drops new SYNs: its accept queue is full
	/// and nothing ever accepts.
	fn saturated() -> (Listener, SocketAddr, Vec<ConnectAttempt>) {
		let listener = ListenConfig::new().backlog(0).listen("tcp4", "127.0.0.1:0").unwrap();
		let target = listener.local_addr().unwrap();

		let mut queued = Vec::new();
		for _ in 0..16 {
			match dial(&target, Duration::from_millis(100)) {
				Ok(attempt) => queued.push(attempt),
				Err(e) => {
					assert_eq!(e.errno(), Some(libc::ETIMEDOUT), "{e}");
					return (listener, target, queued);
				}
			}
		}
		panic!("accept queue never filled after {} connects", queued.len());
	}

	#[test]
	fn poll_millis_rounds_up() {
		assert_eq!(poll_millis(Duration::ZERO), 0);
		assert_eq!(poll_millis(Duration::from_micros(1)), 1);
		assert_eq!(poll_millis(Duration::from_micros(900)), 1);
		assert_eq!(poll_millis(Duration::from_micros(1001)), 2);
		assert_eq!(poll_millis(Duration::from_secs(2)), 2000);
		assert_eq!(poll_millis(Duration::MAX), libc::c_int::MAX);
	}

	#[test]
	fn expired_timeout_is_etimedout() {
		let (_listener, target, _queued) = saturated();

		let err = dial(&target, Duration::ZERO).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Connect);
		assert_eq!(err.errno(), Some(libc::ETIMEDOUT));
	}

	#[test]
	fn sub_millisecond_timeout_is_waited_out() {
		let (_listener, target, _queued) = saturated();

		let started = Instant::now();
		let err = dial(&target, Duration::from_micros(900)).unwrap_err();
		assert_eq!(err.errno(), Some(libc::ETIMEDOUT));
		assert!(started.elapsed() >= Duration::from_micros(900), "gave up after {:?}", started.elapsed());
	}

	#[test]
	fn repeated_connect_on_connected_socket_succeeds() {
		let listener = ListenConfig::new().listen("tcp4", "127.0.0.1:0").unwrap();
		let target = listener.local_addr().unwrap();

		let socket = RawSocket::<Stream>::new(Family::Inet4).unwrap();
		connect_fd(&socket.fd, &target).unwrap();
		connect_fd(&socket.fd, &target).unwrap();
	}

	#[test]
	fn unbounded_timeout_connects() {
		let listener = ListenConfig::new().listen("tcp4", "127.0.0.1:0").unwrap();
		let target = listener.local_addr().unwrap();

		let attempt = dial(&target, Duration::MAX).unwrap();
		assert_eq!(attempt.remote_addr(), Some(target));
		assert_eq!(attempt.take_error().unwrap().map(|e| e.kind()), None);
	}
}
