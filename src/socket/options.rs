use std::os::fd::AsRawFd;
use log::debug;
use crate::error::{ConfigError, Error, errno};
use crate::network::Network;

/// Reuse options the current platform can apply.
///
/// `SO_REUSEADDR` exists everywhere; `SO_REUSEPORT` only on some targets.
/// A platform without it still gets a working (address-only) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	pub reuse_port: bool,
}

impl Capabilities {
	/// Capabilities of the target this crate was compiled for.
	pub const fn platform() -> Self {
		Self { reuse_port: HAS_REUSE_PORT }
	}

	/// Address reuse only.
	pub const fn addr_only() -> Self {
		Self { reuse_port: false }
	}
}

impl Default for Capabilities {
	fn default() -> Self {
		Self::platform()
	}
}

#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
const HAS_REUSE_PORT: bool = true;
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
const HAS_REUSE_PORT: bool = false;

/// Applies the reuse options for `network` to an unbound socket.
///
/// Must run before bind or connect; afterwards the kernel ignores or
/// rejects the options.
pub fn configure<S: AsRawFd>(socket: &S, network: Network) -> Result<(), ConfigError> {
	configure_with(socket, network, Capabilities::platform())
}

/// Like `configure`, with an explicit capability set.
pub fn configure_with<S: AsRawFd>(
	socket: &S,
	network: Network,
	caps: Capabilities,
) -> Result<(), ConfigError> {
	let sock_type = socket_type(socket).map_err(|errno| ConfigError::OsRejected { errno, option: "SO_TYPE" })?;
	if sock_type != libc::SOCK_STREAM && sock_type != libc::SOCK_DGRAM {
		return Err(ConfigError::Unsupported { sock_type });
	}
	if sock_type != network.sock_type() {
		return Err(ConfigError::Unsupported { sock_type });
	}

	set_flag(socket, libc::SO_REUSEADDR, true)
		.map_err(|errno| ConfigError::OsRejected { errno, option: "SO_REUSEADDR" })?;

	if caps.reuse_port {
		match set_reuse_port_raw(socket, true) {
			Ok(()) => {}
			// Kernel predates SO_REUSEPORT: address reuse alone still stands.
			Err(libc::ENOPROTOOPT) => {
				debug!("SO_REUSEPORT unavailable on fd {}, continuing with SO_REUSEADDR only", socket.as_raw_fd());
			}
			Err(errno) => return Err(ConfigError::OsRejected { errno, option: "SO_REUSEPORT" }),
		}
	}

	debug!("configured reuse on fd {} for {} (reuse_port={})", socket.as_raw_fd(), network, caps.reuse_port);
	Ok(())
}

/// Sets SO_REUSEADDR on a socket.
///
/// Allows binding to an address other sockets with the option hold,
/// and to one left in TIME_WAIT.
pub fn set_reuse_addr<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), Error> {
	set_flag(socket, libc::SO_REUSEADDR, enable)
		.map_err(|errno| Error::SetOption { errno, option: "SO_REUSEADDR" })
}

/// Sets SO_REUSEPORT on a socket.
///
/// Allows multiple sockets to bind the same port.
/// Every socket sharing the port must set it.
pub fn set_reuse_port<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), Error> {
	set_reuse_port_raw(socket, enable)
		.map_err(|errno| Error::SetOption { errno, option: "SO_REUSEPORT" })
}

/// Reads SO_REUSEADDR.
pub fn reuse_addr<S: AsRawFd>(socket: &S) -> Result<bool, Error> {
	get_int(socket, libc::SO_REUSEADDR)
		.map(|v| v != 0)
		.map_err(|errno| Error::GetOption { errno, option: "SO_REUSEADDR" })
}

/// Reads SO_REUSEPORT. Always false where the platform lacks it.
pub fn reuse_port<S: AsRawFd>(socket: &S) -> Result<bool, Error> {
	#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
	{
		get_int(socket, libc::SO_REUSEPORT)
			.map(|v| v != 0)
			.map_err(|errno| Error::GetOption { errno, option: "SO_REUSEPORT" })
	}
	#[cfg(any(target_os = "solaris", target_os = "illumos"))]
	{
		let _ = socket;
		Ok(false)
	}
}

/// Reads SO_TYPE (SOCK_STREAM, SOCK_DGRAM, ...).
fn socket_type<S: AsRawFd>(socket: &S) -> Result<libc::c_int, i32> {
	get_int(socket, libc::SO_TYPE)
}

#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
fn set_reuse_port_raw<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), i32> {
	set_flag(socket, libc::SO_REUSEPORT, enable)
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn set_reuse_port_raw<S: AsRawFd>(_socket: &S, _enable: bool) -> Result<(), i32> {
	Err(libc::ENOPROTOOPT)
}

fn set_flag<S: AsRawFd>(socket: &S, option: libc::c_int, enable: bool) -> Result<(), i32> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			option,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(errno())
	} else {
		Ok(())
	}
}

fn get_int<S: AsRawFd>(socket: &S, option: libc::c_int) -> Result<libc::c_int, i32> {
	let mut val: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
	let result = unsafe {
		libc::getsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			option,
			&mut val as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};
	if result == -1 {
		Err(errno())
	} else {
		Ok(val)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::addr::Family;
	use crate::socket::{Datagram, RawSocket, Stream};
	use std::os::fd::{FromRawFd, OwnedFd};

	#[test]
	fn configure_sets_both_flags() {
		let socket = RawSocket::<Stream>::new(Family::Inet4).unwrap();
		assert!(!reuse_addr(&socket).unwrap());

		configure(&socket, Network::Tcp4).unwrap();
		assert!(reuse_addr(&socket).unwrap());
		assert_eq!(reuse_port(&socket).unwrap(), Capabilities::platform().reuse_port);
	}

	#[test]
	fn addr_only_capabilities_skip_reuse_port() {
		let socket = RawSocket::<Datagram>::new(Family::Inet4).unwrap();
		configure_with(&socket, Network::Udp, Capabilities::addr_only()).unwrap();
		assert!(reuse_addr(&socket).unwrap());
		assert!(!reuse_port(&socket).unwrap());
	}

	#[test]
	fn mismatched_kind_is_unsupported() {
		let socket = RawSocket::<Datagram>::new(Family::Inet4).unwrap();
		let err = configure(&socket, Network::Tcp).unwrap_err();
		assert!(matches!(err, ConfigError::Unsupported { sock_type } if sock_type == libc::SOCK_DGRAM));
		assert!(!reuse_addr(&socket).unwrap());
	}

	#[test]
	fn seqpacket_is_unsupported() {
		let mut fds = [0 as libc::c_int; 2];
		let rc = unsafe {
			libc::socketpair(libc::AF_UNIX, libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC, 0, fds.as_mut_ptr())
		};
		assert_eq!(rc, 0);
		let a = unsafe { OwnedFd::from_raw_fd(fds[0]) };
		let _b = unsafe { OwnedFd::from_raw_fd(fds[1]) };

		let err = configure(&a, Network::Tcp).unwrap_err();
		assert!(matches!(err, ConfigError::Unsupported { sock_type } if sock_type == libc::SOCK_SEQPACKET));
	}

	#[test]
	fn invalid_handle_is_os_rejected() {
		struct Dead(libc::c_int);
		impl AsRawFd for Dead {
			fn as_raw_fd(&self) -> libc::c_int {
				self.0
			}
		}
		// negative descriptors are never valid
		let err = configure(&Dead(-1), Network::Tcp).unwrap_err();
		assert!(matches!(err, ConfigError::OsRejected { errno, .. } if errno == libc::EBADF));
	}
}
