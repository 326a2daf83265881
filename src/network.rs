//! Network type strings.
//!
//! `Network` is parsed once at the start of every operation and decides
//! the socket kind and which address families are acceptable.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A recognized network type.
///
/// - `Tcp` / `Udp`: either family, IPv4 preferred when resolving
/// - `Tcp4` / `Udp4`: IPv4 only
/// - `Tcp6` / `Udp6`: IPv6 only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
	Tcp,
	Tcp4,
	Tcp6,
	Udp,
	Udp4,
	Udp6,
}

/// Socket kind a network maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	Stream,
	Datagram,
}

/// Family restriction a network places on its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyHint {
	Any,
	V4,
	V6,
}

impl Network {
	pub fn kind(&self) -> Kind {
		match self {
			Network::Tcp | Network::Tcp4 | Network::Tcp6 => Kind::Stream,
			Network::Udp | Network::Udp4 | Network::Udp6 => Kind::Datagram,
		}
	}

	#[inline]
	pub fn is_stream(&self) -> bool {
		self.kind() == Kind::Stream
	}

	#[inline]
	pub fn is_datagram(&self) -> bool {
		self.kind() == Kind::Datagram
	}

	pub fn family_hint(&self) -> FamilyHint {
		match self {
			Network::Tcp | Network::Udp => FamilyHint::Any,
			Network::Tcp4 | Network::Udp4 => FamilyHint::V4,
			Network::Tcp6 | Network::Udp6 => FamilyHint::V6,
		}
	}

	/// Returns the libc socket type constant.
	#[inline]
	pub fn sock_type(&self) -> libc::c_int {
		match self.kind() {
			Kind::Stream => libc::SOCK_STREAM,
			Kind::Datagram => libc::SOCK_DGRAM,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Tcp => "tcp",
			Network::Tcp4 => "tcp4",
			Network::Tcp6 => "tcp6",
			Network::Udp => "udp",
			Network::Udp4 => "udp4",
			Network::Udp6 => "udp6",
		}
	}

	/// Parses a network string that must name a stream network.
	pub(crate) fn parse_stream(network: &str) -> Result<Self, Error> {
		let parsed: Network = network.parse()?;
		if !parsed.is_stream() {
			return Err(Error::Unsupported { network: network.to_owned() });
		}
		Ok(parsed)
	}

	/// Parses a network string that must name a datagram network.
	pub(crate) fn parse_datagram(network: &str) -> Result<Self, Error> {
		let parsed: Network = network.parse()?;
		if !parsed.is_datagram() {
			return Err(Error::Unsupported { network: network.to_owned() });
		}
		Ok(parsed)
	}
}

impl FromStr for Network {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tcp" => Ok(Network::Tcp),
			"tcp4" => Ok(Network::Tcp4),
			"tcp6" => Ok(Network::Tcp6),
			"udp" => Ok(Network::Udp),
			"udp4" => Ok(Network::Udp4),
			"udp6" => Ok(Network::Udp6),
			_ => Err(Error::Unsupported { network: s.to_owned() }),
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn parses_all_supported_names() {
		for name in ["tcp", "tcp4", "tcp6", "udp", "udp4", "udp6"] {
			let network: Network = name.parse().unwrap();
			assert_eq!(network.to_string(), name);
		}
	}

	#[test]
	fn rejects_unknown_names() {
		for name in ["", "TCP", "unix", "ip4:icmp", "sctp", "tcp7"] {
			let err = name.parse::<Network>().unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Unsupported);
		}
	}

	#[test]
	fn kind_and_family() {
		assert_eq!(Network::Tcp6.kind(), Kind::Stream);
		assert_eq!(Network::Tcp6.family_hint(), FamilyHint::V6);
		assert_eq!(Network::Udp4.kind(), Kind::Datagram);
		assert_eq!(Network::Udp4.sock_type(), libc::SOCK_DGRAM);
		assert_eq!(Network::Udp.family_hint(), FamilyHint::Any);
	}

	#[test]
	fn stream_and_datagram_parsers_cross_reject() {
		assert_eq!(Network::parse_stream("udp").unwrap_err().kind(), ErrorKind::Unsupported);
		assert_eq!(Network::parse_datagram("tcp4").unwrap_err().kind(), ErrorKind::Unsupported);
		assert_eq!(Network::parse_stream("tcp6").unwrap(), Network::Tcp6);
	}
}
