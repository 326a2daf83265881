use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;
use crate::factory;
use crate::poller::{self, PollConfig};
use super::{Capabilities, ConnectAttempt, Connection, Listener, PacketConn};

// ============================================================================
// Listen configuration
// ============================================================================

/// Settings for the listen paths.
///
/// # Example
/// ```ignore
/// use reuselane::{ListenConfig, Capabilities};
///
/// let a = ListenConfig::new().backlog(1024).listen("tcp", "0.0.0.0:8080")?;
/// let b = ListenConfig::new().backlog(1024).listen("tcp", "0.0.0.0:8080")?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ListenConfig {
	pub backlog: i32,
	pub capabilities: Capabilities,
}

impl Default for ListenConfig {
	fn default() -> Self {
		Self {
			backlog: libc::SOMAXCONN,
			capabilities: Capabilities::platform(),
		}
	}
}

impl ListenConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set listen backlog. Default: `SOMAXCONN`.
	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	/// Restrict the reuse options that get applied.
	pub fn capabilities(mut self, caps: Capabilities) -> Self {
		self.capabilities = caps;
		self
	}

	/// Creates a reuse-configured stream listener.
	pub fn listen(&self, network: &str, address: &str) -> Result<Listener> {
		factory::listen_stream_with(self, network, address)
	}

	/// Creates a reuse-configured datagram socket.
	pub fn listen_packet(&self, network: &str, address: &str) -> Result<PacketConn> {
		factory::listen_packet_with(self, network, address)
	}
}

// ============================================================================
// Dialer
// ============================================================================

/// Dial options: an optional local address to dial from, a connect
/// timeout, and the remote-address wait.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use reuselane::Dialer;
///
/// let _l = reuselane::listen("tcp", "127.0.0.1:4001")?;
/// let conn = Dialer::new()
///     .local_addr("127.0.0.1:4001".parse()?)
///     .timeout(Duration::from_secs(3))
///     .dial("tcp", "203.0.113.7:4001")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Dialer {
	pub local_addr: Option<SocketAddr>,
	pub timeout: Option<Duration>,
	pub completion: PollConfig,
	pub capabilities: Capabilities,
}

impl Dialer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Dial from this local address. It may be a port other
	/// reuse-configured sockets (listeners included) are bound to.
	pub fn local_addr(mut self, addr: SocketAddr) -> Self {
		self.local_addr = Some(addr);
		self
	}

	/// Upper bound on the connect handshake.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Tunables for the remote-address wait after connect.
	pub fn completion(mut self, config: PollConfig) -> Self {
		self.completion = config;
		self
	}

	pub fn capabilities(mut self, caps: Capabilities) -> Self {
		self.capabilities = caps;
		self
	}

	/// Dials `address` and waits until the connection reports its peer.
	pub fn dial(&self, network: &str, address: &str) -> Result<Connection> {
		let attempt = self.dial_attempt(network, address)?;
		poller::await_remote_address(attempt, &self.completion)
	}

	/// Dials without waiting for the remote address.
	pub fn dial_attempt(&self, network: &str, address: &str) -> Result<ConnectAttempt> {
		factory::dial(self, network, address)
	}
}
