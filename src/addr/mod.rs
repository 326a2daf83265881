//! Address families, endpoint resolution and sockaddr conversion.
//!
//! Two families are supported:
//! - `Inet4`: Internet Protocol version 4
//! - `Inet6`: Internet Protocol version 6

mod endpoint;
mod ipv4;
mod ipv6;

pub use self::endpoint::{Endpoint, resolve};
pub(crate) use self::endpoint::resolve_in;

use std::net::SocketAddr;
use std::os::fd::RawFd;

use crate::error::{Error, errno};

/// Address family of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	Inet4,
	Inet6,
}

impl Family {
	pub fn of(addr: &SocketAddr) -> Self {
		match addr {
			SocketAddr::V4(_) => Family::Inet4,
			SocketAddr::V6(_) => Family::Inet6,
		}
	}

	/// Returns the libc constant for this address family.
	#[inline]
	pub fn raw(&self) -> libc::c_int {
		match self {
			Family::Inet4 => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
		}
	}
}

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}

impl ToSockAddr for SocketAddr {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			SocketAddr::V4(addr) => addr.with_raw(f),
			SocketAddr::V6(addr) => addr.with_raw(f),
		}
	}
}

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

impl FromSockAddr for SocketAddr {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sa_family_t>() as libc::socklen_t {
			return None;
		}
		let family = unsafe { (*addr).sa_family } as libc::c_int;
		match family {
			libc::AF_INET => unsafe { ipv4::from_sockaddr(addr, len) }.map(SocketAddr::V4),
			libc::AF_INET6 => unsafe { ipv6::from_sockaddr(addr, len) }.map(SocketAddr::V6),
			_ => None,
		}
	}
}

/// Which end of a socket to query.
#[derive(Clone, Copy)]
pub(crate) enum Side {
	Local,
	Peer,
}

/// Reads the local or peer address of a socket.
///
/// Returns `Ok(None)` when the OS reports the socket as not connected,
/// or when the peer address is not (yet) populated.
pub(crate) fn query(fd: RawFd, side: Side) -> Result<Option<SocketAddr>, Error> {
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
	let ptr = &mut storage as *mut _ as *mut libc::sockaddr;

	let result = unsafe {
		match side {
			Side::Local => libc::getsockname(fd, ptr, &mut len),
			Side::Peer => libc::getpeername(fd, ptr, &mut len),
		}
	};

	if result == -1 {
		let e = errno();
		if e == libc::ENOTCONN {
			return Ok(None);
		}
		let option = match side {
			Side::Local => "SO_SOCKNAME",
			Side::Peer => "SO_PEERNAME",
		};
		return Err(Error::GetOption { errno: e, option });
	}

	Ok(unsafe { SocketAddr::from_sockaddr(ptr, len) })
}

/// Reads the local address of a socket; absent metadata is an error here.
pub(crate) fn local_addr(fd: RawFd) -> Result<SocketAddr, Error> {
	query(fd, Side::Local)?.ok_or(Error::GetOption { errno: libc::ENOTCONN, option: "SO_SOCKNAME" })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn v4_round_trips_through_storage() {
		let addr: SocketAddr = "192.168.1.20:8080".parse().unwrap();
		let back = addr.with_raw(|ptr, len| unsafe { SocketAddr::from_sockaddr(ptr, len) });
		assert_eq!(back, Some(addr));
	}

	#[test]
	fn v6_keeps_scope_id() {
		let ip: std::net::Ipv6Addr = "fe80::1".parse().unwrap();
		let addr = SocketAddr::V6(std::net::SocketAddrV6::new(ip, 9000, 0, 3));
		let back = addr.with_raw(|ptr, len| unsafe { SocketAddr::from_sockaddr(ptr, len) });
		assert_eq!(back, Some(addr));
	}

	#[test]
	fn truncated_sockaddr_is_rejected() {
		let addr: SocketAddr = "10.0.0.1:1".parse().unwrap();
		let back = addr.with_raw(|ptr, _| unsafe { SocketAddr::from_sockaddr(ptr, 4) });
		assert_eq!(back, None);
	}

	#[test]
	fn family_matches_addr() {
		assert_eq!(Family::of(&"[::1]:1".parse().unwrap()), Family::Inet6);
		assert_eq!(Family::Inet4.raw(), libc::AF_INET);
	}
}
