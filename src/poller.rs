//! Waiting for a dialed socket's remote address.
//!
//! On some platforms a reuse-configured connect returns success before the
//! kernel has attached the peer address to the socket. Nothing signals when
//! it shows up, so the dial path polls for it with a bounded wait.
//!
//! ```text
//!   Connecting ──connected()──▶ AwaitingMetadata ──tick(Some)──▶ Ready
//!                                      │
//!                                      └──tick(None), elapsed ≥ max_wait──▶ Failed
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::error::{Error, Result};
use crate::socket::{ConnectAttempt, Connection};

/// Bound and cadence of the remote-address wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	/// Give up once this much time has passed without a remote address.
	pub max_wait: Duration,
	/// Sleep between checks.
	pub interval: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			max_wait: Duration::from_secs(1),
			interval: Duration::from_micros(20),
		}
	}
}

impl PollConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn max_wait(mut self, max_wait: Duration) -> Self {
		self.max_wait = max_wait;
		self
	}

	pub fn interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}
}

/// Where a dial is in its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialState {
	Connecting,
	AwaitingMetadata,
	Ready(SocketAddr),
	Failed,
}

impl DialState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, DialState::Ready(_) | DialState::Failed)
	}
}

/// The completion state machine.
///
/// Pure bookkeeping: callers feed it observations and elapsed time, so the
/// timing rules can be exercised without sockets or a clock.
#[derive(Debug)]
pub struct CompletionPoller {
	config: PollConfig,
	state: DialState,
	polls: u32,
}

impl CompletionPoller {
	pub fn new(config: PollConfig) -> Self {
		Self {
			config,
			state: DialState::Connecting,
			polls: 0,
		}
	}

	pub fn state(&self) -> DialState {
		self.state
	}

	/// Number of ticks evaluated while awaiting metadata.
	pub fn polls(&self) -> u32 {
		self.polls
	}

	/// connect() returned success.
	pub fn connected(&mut self) {
		if self.state == DialState::Connecting {
			self.state = DialState::AwaitingMetadata;
		}
	}

	/// Evaluates one observation of the remote address.
	///
	/// Only moves out of `AwaitingMetadata`; ticks in any other state are
	/// ignored. A present address wins even at the bound.
	pub fn tick(&mut self, remote: Option<SocketAddr>, elapsed: Duration) -> DialState {
		if self.state != DialState::AwaitingMetadata {
			return self.state;
		}

		self.polls += 1;
		self.state = match remote {
			Some(addr) => DialState::Ready(addr),
			None if elapsed >= self.config.max_wait => DialState::Failed,
			None => DialState::AwaitingMetadata,
		};
		self.state
	}

	/// How long to sleep before the next tick, never past the bound.
	pub fn next_delay(&self, elapsed: Duration) -> Duration {
		self.config.interval.min(self.config.max_wait.saturating_sub(elapsed))
	}
}

/// Something that may or may not know its remote address yet.
///
/// Dropping the probe must release whatever it holds.
pub trait RemoteProbe {
	fn remote_addr(&self) -> Option<SocketAddr>;
}

impl RemoteProbe for ConnectAttempt {
	fn remote_addr(&self) -> Option<SocketAddr> {
		ConnectAttempt::remote_addr(self)
	}
}

/// Polls `probe` until it reports a remote address or `max_wait` passes.
///
/// On expiry the probe is dropped before `Error::ReuseFailed` is returned.
pub fn poll_remote<P: RemoteProbe>(probe: P, config: &PollConfig) -> Result<(P, SocketAddr)> {
	let mut poller = CompletionPoller::new(*config);
	poller.connected();

	let start = Instant::now();
	loop {
		let elapsed = start.elapsed();
		match poller.tick(probe.remote_addr(), elapsed) {
			DialState::Ready(remote) => {
				trace!("remote address {} present after {} poll(s)", remote, poller.polls());
				return Ok((probe, remote));
			}
			DialState::Failed => {
				drop(probe);
				let waited = start.elapsed();
				warn!("no remote address after {:?} ({} polls), giving up", waited, poller.polls());
				return Err(Error::ReuseFailed { waited, polls: poller.polls() });
			}
			DialState::Connecting | DialState::AwaitingMetadata => {
				std::thread::sleep(poller.next_delay(elapsed));
			}
		}
	}
}

/// Turns a connect attempt into a `Connection` once its remote address is known.
pub fn await_remote_address(attempt: ConnectAttempt, config: &PollConfig) -> Result<Connection> {
	let (attempt, remote) = poll_remote(attempt, config)?;
	Ok(attempt.finish(remote))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;
	use std::cell::Cell;
	use std::rc::Rc;

	fn addr() -> SocketAddr {
		"127.0.0.1:9".parse().unwrap()
	}

	/// Reports `addr` after `absent` empty polls; flags `closed` on drop.
	#[derive(Debug)]
	struct FakeProbe {
		absent: Cell<u32>,
		addr: Option<SocketAddr>,
		closed: Rc<Cell<bool>>,
	}

	impl FakeProbe {
		fn new(absent: u32, addr: Option<SocketAddr>) -> (Self, Rc<Cell<bool>>) {
			let closed = Rc::new(Cell::new(false));
			let probe = Self { absent: Cell::new(absent), addr, closed: closed.clone() };
			(probe, closed)
		}
	}

	impl RemoteProbe for FakeProbe {
		fn remote_addr(&self) -> Option<SocketAddr> {
			if self.absent.get() > 0 {
				self.absent.set(self.absent.get() - 1);
				return None;
			}
			self.addr
		}
	}

	impl Drop for FakeProbe {
		fn drop(&mut self) {
			self.closed.set(true);
		}
	}

	#[test]
	fn defaults() {
		let config = PollConfig::default();
		assert_eq!(config.max_wait, Duration::from_secs(1));
		assert_eq!(config.interval, Duration::from_micros(20));
	}

	#[test]
	fn ticks_before_connect_are_ignored() {
		let mut poller = CompletionPoller::new(PollConfig::default());
		assert_eq!(poller.tick(Some(addr()), Duration::ZERO), DialState::Connecting);
		assert_eq!(poller.polls(), 0);
	}

	#[test]
	fn waits_then_becomes_ready() {
		let mut poller = CompletionPoller::new(PollConfig::new().max_wait(Duration::from_millis(10)));
		poller.connected();
		assert_eq!(poller.state(), DialState::AwaitingMetadata);

		assert_eq!(poller.tick(None, Duration::from_millis(1)), DialState::AwaitingMetadata);
		assert_eq!(poller.tick(None, Duration::from_millis(5)), DialState::AwaitingMetadata);
		assert_eq!(poller.tick(Some(addr()), Duration::from_millis(6)), DialState::Ready(addr()));
		assert_eq!(poller.polls(), 3);
	}

	#[test]
	fn fails_at_the_bound() {
		let mut poller = CompletionPoller::new(PollConfig::new().max_wait(Duration::from_millis(10)));
		poller.connected();
		assert_eq!(poller.tick(None, Duration::from_millis(10)), DialState::Failed);
	}

	#[test]
	fn present_address_wins_at_the_bound() {
		let mut poller = CompletionPoller::new(PollConfig::new().max_wait(Duration::from_millis(10)));
		poller.connected();
		assert_eq!(poller.tick(Some(addr()), Duration::from_secs(5)), DialState::Ready(addr()));
	}

	#[test]
	fn terminal_states_stick() {
		let mut poller = CompletionPoller::new(PollConfig::new().max_wait(Duration::ZERO));
		poller.connected();
		assert_eq!(poller.tick(None, Duration::ZERO), DialState::Failed);
		assert!(poller.state().is_terminal());
		assert_eq!(poller.tick(Some(addr()), Duration::ZERO), DialState::Failed);
		poller.connected();
		assert_eq!(poller.state(), DialState::Failed);
	}

	#[test]
	fn delay_never_passes_the_bound() {
		let config = PollConfig::new()
			.max_wait(Duration::from_millis(10))
			.interval(Duration::from_millis(4));
		let poller = CompletionPoller::new(config);
		assert_eq!(poller.next_delay(Duration::ZERO), Duration::from_millis(4));
		assert_eq!(poller.next_delay(Duration::from_millis(8)), Duration::from_millis(2));
		assert_eq!(poller.next_delay(Duration::from_millis(12)), Duration::ZERO);
	}

	#[test]
	fn late_metadata_is_picked_up() {
		let (probe, closed) = FakeProbe::new(5, Some(addr()));
		let config = PollConfig::new().interval(Duration::from_micros(10));

		let (probe, remote) = poll_remote(probe, &config).unwrap();
		assert_eq!(remote, addr());
		assert!(!closed.get());
		drop(probe);
		assert!(closed.get());
	}

	#[test]
	fn missing_metadata_fails_and_releases_probe() {
		let (probe, closed) = FakeProbe::new(0, None);
		let config = PollConfig::new()
			.max_wait(Duration::from_millis(20))
			.interval(Duration::from_millis(1));

		let started = Instant::now();
		let err = poll_remote(probe, &config).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::ReuseFailed);
		assert!(closed.get());
		assert!(started.elapsed() >= Duration::from_millis(20));

		match err {
			Error::ReuseFailed { waited, polls } => {
				assert!(waited >= Duration::from_millis(20));
				assert!(polls >= 2);
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn zero_wait_fails_on_first_miss() {
		let (probe, closed) = FakeProbe::new(0, None);
		let err = poll_remote(probe, &PollConfig::new().max_wait(Duration::ZERO)).unwrap_err();
		assert!(matches!(err, Error::ReuseFailed { polls: 1, .. }));
		assert!(closed.get());
	}
}
