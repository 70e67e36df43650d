//! # Transport Abstraction
//!
//! A minimal, synchronous interface for moving rpc messages between peers.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The transport knows nothing about hashes or payloads.
//!   It moves opaque buffers tagged with a `SendMode`.
//! - **Events Out**: Inbound traffic and connection changes are pushed as
//!   `TransportEvent`s into the `EventSender` the transport was built with.
//!   The network manager drains them with `pump` or `run`.

use std::fmt;

use tokio::sync::mpsc;

use crate::connection::ConnectionHandle;
use crate::connection::ConnectionId;

/// Delivery guarantee requested for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SendMode {
    #[default]
    Reliable,
    Unreliable,
}

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// The operation needs a connection that does not exist.
    NotConnected,
    /// No client with this id is connected.
    UnknownConnection(ConnectionId),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::NotConnected => write!(f, "Not connected"),
            Self::UnknownConnection(id) => write!(f, "Unknown connection: {}", id),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Something that happened on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// This client finished connecting to a server.
    ClientConnected(ConnectionHandle),
    /// This client lost or closed its server connection.
    ClientDisconnected,
    /// This server started listening.
    ServerStarted,
    /// A client connected to this server.
    ServerClientConnected(ConnectionHandle),
    /// A client left this server.
    ServerClientDisconnected(ConnectionHandle),
    /// A client sent a message to this server.
    ServerDataReceived(ConnectionHandle, Vec<u8>),
    /// The server sent a message to this client.
    ClientDataReceived(Vec<u8>),
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Creates the channel a transport reports its events through.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A pluggable byte transport.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
///
/// # Invariants
/// - Must not interpret payload content.
/// - Must report every connection change and inbound message as a
///   `TransportEvent`.
pub trait Transport: Send + Sync + 'static {
    /// True while a client connection or a server is running.
    fn is_active(&self) -> bool;

    /// True if this transport is running a server.
    fn is_server(&self) -> bool;

    fn connect_client(&self, address: &str) -> Result<()>;

    fn stop_client(&self) -> Result<()>;

    fn start_server(&self) -> Result<()>;

    fn stop_server(&self) -> Result<()>;

    /// Forcibly disconnects a client from this server.
    fn kick_connection(&self, id: ConnectionId) -> Result<()>;

    fn send_to_server(&self, payload: &[u8], mode: SendMode) -> Result<()>;

    fn send_to_client(&self, id: ConnectionId, payload: &[u8], mode: SendMode) -> Result<()>;

    /// Stops everything. Must be safe to call more than once.
    fn shutdown(&self);
}
