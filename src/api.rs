use crate::addr;
use crate::error::Result;
use crate::factory;
use crate::network::Network;
use crate::socket::{Connection, Dialer, Listener, PacketConn};

/// Listens on `address` with SO_REUSEADDR and (where available)
/// SO_REUSEPORT set, so other reuse-configured sockets can share the port.
///
/// ```ignore
/// let l1 = reuselane::listen("tcp", "127.0.0.1:1234")?;
/// let l2 = reuselane::listen("tcp", "127.0.0.1:1234")?;
/// ```
pub fn listen(network: &str, address: &str) -> Result<Listener> {
	factory::listen_stream(network, address)
}

/// Binds a datagram socket on `address` with the reuse options set.
pub fn listen_packet(network: &str, address: &str) -> Result<PacketConn> {
	factory::listen_packet(network, address)
}

/// Dials `remote_address` from `local_address` (empty for an ephemeral port).
///
/// The local address may be one a listener from `listen` holds:
///
/// ```ignore
/// let _l1 = reuselane::listen("tcp", "127.0.0.1:1234")?;
/// let _l2 = reuselane::listen("tcp", "127.0.0.1:1235")?;
/// let c = reuselane::dial("tcp", "127.0.0.1:1234", "127.0.0.1:1235")?;
/// ```
///
/// Dialing your own address fails: the 4-tuple would collide with itself.
pub fn dial(network: &str, local_address: &str, remote_address: &str) -> Result<Connection> {
	let mut dialer = Dialer::new();
	if !local_address.is_empty() {
		let parsed: Network = network.parse()?;
		dialer = dialer.local_addr(addr::resolve(parsed, local_address)?.addr());
	}
	dialer.dial(network, remote_address)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn unsupported_network_wins_over_bad_address() {
		let err = listen("sctp", "no-such-host.invalid:1").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unsupported);

		let err = listen_packet("tcp", "no-such-host.invalid:1").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unsupported);

		let err = dial("unix", "also bad", "still bad").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unsupported);
	}

	#[test]
	fn listen_rejects_datagram_networks() {
		for network in ["udp", "udp4", "udp6"] {
			let err = listen(network, "127.0.0.1:0").unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Unsupported);
		}
	}

	#[test]
	fn malformed_local_address_is_a_resolve_error() {
		let err = dial("tcp", "127.0.0.1", "127.0.0.1:1").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Resolve);
	}
}
