//! Socket creation pipelines.
//!
//! Every path runs: parse network → resolve → socket() → reuse options →
//! bind/connect. The network string is checked before anything touches
//! the OS, and a failure at any step drops the descriptor it owned.

use log::{debug, warn};

use crate::addr::{self, Endpoint};
use crate::error::{Error, Result};
use crate::network::{Kind, Network};
use crate::socket::{
	ConnectAttempt, Datagram, Dialer, ListenConfig, Listener, PacketConn, RawSocket, SockType, Stream,
};

/// Listens on a stream network with reuse options applied.
pub fn listen_stream(network: &str, address: &str) -> Result<Listener> {
	listen_stream_with(&ListenConfig::default(), network, address)
}

/// Binds a datagram socket with reuse options applied.
pub fn listen_packet(network: &str, address: &str) -> Result<PacketConn> {
	listen_packet_with(&ListenConfig::default(), network, address)
}

pub(crate) fn listen_stream_with(config: &ListenConfig, network: &str, address: &str) -> Result<Listener> {
	let network = Network::parse_stream(network)?;
	let endpoint = addr::resolve(network, address)?;

	let socket = RawSocket::<Stream>::new(endpoint.family())?;
	socket.configure(network, config.capabilities)?;

	let listener = socket.bind(&endpoint.addr())?.listen(network, config.backlog)?;
	debug!("listening on {} (backlog {})", endpoint, config.backlog);
	Ok(listener)
}

pub(crate) fn listen_packet_with(config: &ListenConfig, network: &str, address: &str) -> Result<PacketConn> {
	let network = Network::parse_datagram(network)?;
	let endpoint = addr::resolve(network, address)?;

	let socket = RawSocket::<Datagram>::new(endpoint.family())?;
	socket.configure(network, config.capabilities)?;

	let conn = socket.bind(&endpoint.addr())?.into_packet_conn(network);
	debug!("bound packet socket on {}", endpoint);
	Ok(conn)
}

/// Dials `remote` on a reuse-configured socket.
///
/// With `dialer.local_addr` set, the socket is bound there first, which
/// is how a connection can originate from a port a listener holds.
/// The remote address is resolved in the local address's family.
///
/// The returned attempt may not know its remote address yet; see
/// `poller::await_remote_address`.
pub fn dial(dialer: &Dialer, network: &str, remote: &str) -> Result<ConnectAttempt> {
	let network: Network = network.parse()?;
	match network.kind() {
		Kind::Stream => dial_as::<Stream>(dialer, network, remote),
		Kind::Datagram => dial_as::<Datagram>(dialer, network, remote),
	}
}

fn dial_as<T: SockType>(dialer: &Dialer, network: Network, remote: &str) -> Result<ConnectAttempt> {
	let local = dialer.local_addr.map(|a| Endpoint::new(network, a)).transpose()?;
	let remote = match local {
		Some(local) => addr::resolve_in(network, remote, local.family())?,
		None => addr::resolve(network, remote)?,
	};

	let socket = RawSocket::<T>::new(remote.family())?;
	socket.configure(network, dialer.capabilities)?;

	let target = remote.addr();
	let attempt = match (local, dialer.timeout) {
		(Some(local), Some(timeout)) => socket.bind(&local.addr())?.connect_timeout(network, &target, timeout)?,
		(Some(local), None) => socket.bind(&local.addr())?.connect(network, &target)?,
		(None, Some(timeout)) => socket.connect_timeout(network, &target, timeout)?,
		(None, None) => socket.connect(network, &target)?,
	};

	reject_self_dial(attempt, &remote)
}

/// A socket whose local address is its own destination collided with
/// itself on the 4-tuple. Linux completes that as a simultaneous open
/// (and UDP always allows it), so it has to be caught here.
fn reject_self_dial(attempt: ConnectAttempt, remote: &Endpoint) -> Result<ConnectAttempt> {
	let local = attempt.local_addr()?;
	if local == remote.addr() {
		warn!("dial to {} connected to itself, closing", remote);
		drop(attempt);
		return Err(Error::Connect {
			errno: libc::EADDRINUSE,
			addr: remote.addr().to_string(),
		});
	}
	debug!("dialed {} from {}", remote, local);
	Ok(attempt)
}

