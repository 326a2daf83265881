pub mod socket;
pub mod poller;
mod addr;
mod api;
mod error;
mod factory;
mod network;

pub use self::api::{listen, listen_packet, dial};
pub use self::error::{Error, ErrorKind, ConfigError, IoError, Result, errno};
pub use self::addr::{Family, Endpoint, resolve};
pub use self::network::{Network, Kind, FamilyHint};
pub use self::poller::{PollConfig, DialState, CompletionPoller, RemoteProbe,
					   await_remote_address, poll_remote};
pub use self::socket::{SockType, Stream, Datagram, RawSocket, BoundSocket,
					   Listener, Connection, PacketConn, ConnectAttempt, Shutdown,
					   ListenConfig, Dialer, Capabilities,
					   configure, configure_with,
					   set_reuse_addr, set_reuse_port, reuse_addr, reuse_port};
