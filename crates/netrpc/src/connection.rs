use std::fmt;
use std::sync::Arc;

/// Transport-assigned identifier of a connected client.
pub type ConnectionId = u32;

/// Which side of the link a handle names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    /// The server, as seen by a client.
    Server,
    /// One client, as seen by the server.
    Client,
}

/// An opaque identifier for the remote end of a connection.
///
/// Handles are never serialized. Receivers get one substituted for the
/// rpc's connection parameter: on the server it names the calling client,
/// on a client it names the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    id: ConnectionId,
    address: Arc<str>,
    peer: PeerKind,
}

impl ConnectionHandle {
    /// The server this client is connected to. Always id 0.
    pub fn server(address: impl Into<Arc<str>>) -> Self {
        Self { id: 0, address: address.into(), peer: PeerKind::Server }
    }

    /// A client connected to this server.
    pub fn client(id: ConnectionId, address: impl Into<Arc<str>>) -> Self {
        Self { id, address: address.into(), peer: PeerKind::Client }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn peer(&self) -> PeerKind {
        self.peer
    }

    pub fn is_server(&self) -> bool {
        self.peer == PeerKind::Server
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer {
            PeerKind::Server => write!(f, "server@{}", self.address),
            PeerKind::Client => write!(f, "client#{}@{}", self.id, self.address),
        }
    }
}
