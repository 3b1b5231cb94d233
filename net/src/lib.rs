//! Networking for the greeting client.
//!
//! A [`Session`] owns one outbound connection for its whole life: it connects,
//! sends a single unframed greeting, waits for either a reply or the peer
//! hanging up, and then closes. The lifecycle rules live in the I/O-free
//! [`SessionMachine`]; [`Session`] only moves bytes and feeds it events.

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};
use tokio::net::TcpStream;

pub mod error;
pub mod machine;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use machine::{Action, Event, SessionMachine, State, Transition};
pub use session::{Outcome, Session, SessionReport};
pub use transport::{Connector, TcpConnector};

/// Where the client always connects.
pub const DEFAULT_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 4567));

/// The one message the client sends.
pub const GREETING: &str = "Hello, server! Love, Client.";

/// Settings for a single session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub addr: SocketAddr,
    pub payload: Vec<u8>,
    /// Give up on `Connecting` after this long. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
    /// Size of the buffer each socket read fills.
    pub read_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            payload: GREETING.as_bytes().to_vec(),
            connect_timeout: Some(Duration::from_secs(5)),
            read_buffer: 4096,
        }
    }
}

impl SessionConfig {
    /// Default settings aimed at another address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }
}

/// Run one session over plain TCP.
pub async fn greet(config: SessionConfig) -> SessionReport {
    Session::<TcpStream>::create(&TcpConnector, config).await
}
