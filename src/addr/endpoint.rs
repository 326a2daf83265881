use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

use crate::addr::Family;
use crate::error::Error;
use crate::network::{FamilyHint, Network};

/// A resolved address, tagged with the network it was resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
	network: Network,
	addr: SocketAddr,
}

impl Endpoint {
	/// Builds an endpoint from an already resolved address.
	///
	/// Fails with `Resolve` if the address family is not allowed by `network`.
	pub fn new(network: Network, addr: SocketAddr) -> Result<Self, Error> {
		if !accepts(network.family_hint(), &addr) {
			return Err(Error::Resolve {
				address: addr.to_string(),
				reason: format!("address family not allowed for {}", network),
			});
		}
		Ok(Self { network, addr })
	}

	pub fn network(&self) -> Network {
		self.network
	}

	pub fn addr(&self) -> SocketAddr {
		self.addr
	}

	pub fn family(&self) -> Family {
		Family::of(&self.addr)
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.network, self.addr)
	}
}

fn accepts(hint: FamilyHint, addr: &SocketAddr) -> bool {
	match hint {
		FamilyHint::Any => true,
		FamilyHint::V4 => addr.is_ipv4(),
		FamilyHint::V6 => addr.is_ipv6(),
	}
}

/// Resolves `address` ("host:port") for `network`.
///
/// An empty host (":8080") means the unspecified address: `0.0.0.0`,
/// or `::` for the IPv6-only networks. For the dual networks (`tcp`, `udp`)
/// the first IPv4 candidate wins, falling back to the first candidate.
pub fn resolve(network: Network, address: &str) -> Result<Endpoint, Error> {
	resolve_with(network, address, network.family_hint())
}

/// Like `resolve`, but only accepts candidates of `family`.
pub(crate) fn resolve_in(network: Network, address: &str, family: Family) -> Result<Endpoint, Error> {
	let hint = match family {
		Family::Inet4 => FamilyHint::V4,
		Family::Inet6 => FamilyHint::V6,
	};
	if !compatible(network.family_hint(), hint) {
		return Err(Error::Resolve {
			address: address.to_owned(),
			reason: format!("{:?} address not allowed for {}", family, network),
		});
	}
	resolve_with(network, address, hint)
}

fn compatible(network: FamilyHint, wanted: FamilyHint) -> bool {
	network == FamilyHint::Any || network == wanted
}

fn resolve_with(network: Network, address: &str, hint: FamilyHint) -> Result<Endpoint, Error> {
	let resolve_err = |reason: String| Error::Resolve { address: address.to_owned(), reason };

	let candidates: Vec<SocketAddr> = match address.strip_prefix(':') {
		Some(port) => {
			let port: u16 = port.parse().map_err(|_| resolve_err(format!("invalid port {:?}", port)))?;
			let ip: IpAddr = match hint {
				FamilyHint::V6 => Ipv6Addr::UNSPECIFIED.into(),
				FamilyHint::Any | FamilyHint::V4 => Ipv4Addr::UNSPECIFIED.into(),
			};
			vec![SocketAddr::new(ip, port)]
		}
		None => address
			.to_socket_addrs()
			.map_err(|e| resolve_err(e.to_string()))?
			.collect(),
	};

	let chosen = match hint {
		FamilyHint::Any => candidates
			.iter()
			.find(|a| a.is_ipv4())
			.or_else(|| candidates.first()),
		FamilyHint::V4 | FamilyHint::V6 => candidates.iter().find(|a| accepts(hint, a)),
	};

	let addr = *chosen.ok_or_else(|| resolve_err(format!("no suitable address for {}", network)))?;
	Ok(Endpoint { network, addr })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn resolves_literal_v4() {
		let ep = resolve(Network::Tcp, "127.0.0.1:14000").unwrap();
		assert_eq!(ep.addr(), "127.0.0.1:14000".parse().unwrap());
		assert_eq!(ep.family(), Family::Inet4);
		assert_eq!(ep.network(), Network::Tcp);
	}

	#[test]
	fn resolves_literal_v6() {
		let ep = resolve(Network::Udp6, "[::1]:53").unwrap();
		assert_eq!(ep.family(), Family::Inet6);
		assert_eq!(ep.addr().port(), 53);
	}

	#[test]
	fn empty_host_is_unspecified() {
		let ep = resolve(Network::Tcp4, ":8080").unwrap();
		assert_eq!(ep.addr(), "0.0.0.0:8080".parse().unwrap());

		let ep = resolve(Network::Tcp6, ":8080").unwrap();
		assert_eq!(ep.addr(), "[::]:8080".parse().unwrap());
	}

	#[test]
	fn family_restriction_is_enforced() {
		let err = resolve(Network::Tcp4, "[::1]:80").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Resolve);

		let err = resolve(Network::Udp6, "127.0.0.1:80").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Resolve);
	}

	#[test]
	fn malformed_addresses_fail_to_resolve() {
		for bad in ["127.0.0.1", "127.0.0.1:notaport", ":", ":70000", "[::1:80"] {
			let err = resolve(Network::Tcp, bad).unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Resolve, "{}", bad);
		}
	}

	#[test]
	fn resolve_in_pins_the_family() {
		let ep = resolve_in(Network::Tcp, "127.0.0.1:0", Family::Inet4).unwrap();
		assert_eq!(ep.family(), Family::Inet4);

		let err = resolve_in(Network::Tcp, "127.0.0.1:0", Family::Inet6).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Resolve);

		let err = resolve_in(Network::Tcp4, "[::1]:0", Family::Inet6).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Resolve);
	}

	#[test]
	fn endpoint_new_checks_family() {
		assert!(Endpoint::new(Network::Udp4, "127.0.0.1:1".parse().unwrap()).is_ok());
		assert!(Endpoint::new(Network::Udp4, "[::1]:1".parse().unwrap()).is_err());
	}
}
