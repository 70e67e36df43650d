//! # Network Manager
//!
//! The context every generated sender is handed, and the router every inbound
//! message goes through.
//!
//! A manager owns one transport (installed once with `init`), the connection
//! bookkeeping for its side of the link, and a shared reference to the
//! dispatch table. Any number of managers may live in one process; a test can
//! run a server and several clients side by side.
//!
//! ## Routing
//!
//! An inbound message is `[hash: u16 LE][payload]`. The router looks the hash
//! up in the table and checks that the procedure's call kind matches the
//! channel the message arrived on:
//!
//! - `Server` procedures are only accepted by a server.
//! - `Client` and `Multi` procedures are only accepted by a client.
//!
//! Anything else (too short, unknown id, wrong direction, bad payload) is
//! logged and dropped.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::RwLock;

use dashmap::DashMap;
use netpack::Reader;

use crate::connection::ConnectionHandle;
use crate::connection::ConnectionId;
use crate::dispatch::CallKind;
use crate::dispatch::Channel;
use crate::dispatch::DispatchTable;
use crate::error::Error;
use crate::error::Result;
use crate::events::NetworkEvents;
use crate::events::NoEvents;
use crate::transport::EventReceiver;
use crate::transport::SendMode;
use crate::transport::Transport;
use crate::transport::TransportEvent;

/// What the router did with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The receiver decoded the payload and ran the procedure.
    Invoked { hash: u16 },
    /// Fewer than two bytes; there is no hash to read.
    TooShort { len: usize },
    /// No procedure is registered under this hash.
    UnknownHash { hash: u16 },
    /// The procedure exists but may not arrive on this channel.
    WrongDirection { hash: u16, kind: CallKind, channel: Channel },
    /// The receiver failed to decode its arguments.
    DecodeFailed { hash: u16, error: netpack::Error },
}

pub struct NetworkManager {
    table: Arc<DispatchTable>,
    transport: OnceLock<Arc<dyn Transport>>,
    server_connection: RwLock<Option<ConnectionHandle>>,
    clients: DashMap<ConnectionId, ConnectionHandle>,
    events: Box<dyn NetworkEvents>,
}

impl NetworkManager {
    pub fn new(table: Arc<DispatchTable>) -> Self {
        Self {
            table,
            transport: OnceLock::new(),
            server_connection: RwLock::new(None),
            clients: DashMap::new(),
            events: Box::new(NoEvents),
        }
    }

    /// Installs lifecycle hooks.
    pub fn with_events(mut self, events: impl NetworkEvents + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Binds the transport. Must be called before any lifecycle call.
    ///
    /// # Errors
    /// Returns `Error::AlreadyInitialized` if a transport is already bound.
    pub fn init(&self, transport: Arc<dyn Transport>) -> Result<()> {
        self.transport.set(transport).map_err(|_| Error::AlreadyInitialized)
    }

    /// True once `init` has succeeded. Generated senders do nothing until then.
    pub fn is_initialized(&self) -> bool {
        self.transport.get().is_some()
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.get()
    }

    pub fn transport_active(&self) -> bool {
        self.transport.get().map(|t| t.is_active()).unwrap_or(false)
    }

    /// The server this client is connected to, if any.
    pub fn server_connection(&self) -> Option<ConnectionHandle> {
        self.server_connection.read().ok().and_then(|s| s.clone())
    }

    /// Every client connected to this server, ordered by id.
    pub fn client_connections(&self) -> Vec<ConnectionHandle> {
        let mut clients: Vec<_> = self.clients.iter().map(|c| c.value().clone()).collect();
        clients.sort_by_key(|c| c.id());
        clients
    }

    pub fn client(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.clients.get(&id).map(|c| c.value().clone())
    }

    fn bound_transport(&self) -> Result<&Arc<dyn Transport>> {
        self.transport.get().ok_or(Error::NotInitialized)
    }

    fn set_server_connection(&self, connection: Option<ConnectionHandle>) {
        match self.server_connection.write() {
            Ok(mut slot) => *slot = connection,
            Err(poisoned) => *poisoned.into_inner() = connection,
        }
    }

    // ========================================================================
    //  LIFECYCLE
    // ========================================================================

    pub fn connect_to_server(&self, address: &str) -> Result<()> {
        tracing::debug!(address, "connecting to server");
        Ok(self.bound_transport()?.connect_client(address)?)
    }

    pub fn disconnect(&self) -> Result<()> {
        Ok(self.bound_transport()?.stop_client()?)
    }

    pub fn start_server(&self) -> Result<()> {
        Ok(self.bound_transport()?.start_server()?)
    }

    pub fn end_server(&self) -> Result<()> {
        Ok(self.bound_transport()?.stop_server()?)
    }

    pub fn kick_client(&self, id: ConnectionId) -> Result<()> {
        tracing::debug!(id, "kicking client");
        Ok(self.bound_transport()?.kick_connection(id)?)
    }

    /// Shuts the transport down, if one is bound.
    pub fn shutdown(&self) {
        if let Some(transport) = self.transport.get() {
            transport.shutdown();
        }
    }

    // ========================================================================
    //  SENDING
    // ========================================================================

    /// Forwards a message to the server.
    ///
    /// # Errors
    /// Returns `Error::NoActivePeer` if the transport is inactive or this
    /// client has no server connection.
    pub fn send_to_server(&self, payload: &[u8], mode: SendMode) -> Result<()> {
        let transport = self.active_transport("server rpc")?;
        if self.server_connection().is_none() {
            return Err(Error::NoActivePeer("server rpc called without a server connection".into()));
        }
        Ok(transport.send_to_server(payload, mode)?)
    }

    /// Forwards a message to one client.
    ///
    /// # Errors
    /// Returns `Error::NoActivePeer` if the transport is inactive, and
    /// `Error::InvalidArgument` if `connection` is `None`. Nothing is sent in
    /// either case.
    pub fn send_to_client(
        &self,
        connection: Option<&ConnectionHandle>,
        payload: &[u8],
        mode: SendMode,
    ) -> Result<()> {
        let transport = self.active_transport("client rpc")?;
        let Some(connection) = connection else {
            return Err(Error::InvalidArgument("client rpc sent to a missing connection".into()));
        };
        Ok(transport.send_to_client(connection.id(), payload, mode)?)
    }

    /// Forwards a message to every connected client.
    ///
    /// A client the transport refuses does not stop the broadcast; every
    /// other client still gets the message.
    ///
    /// # Errors
    /// Returns `Error::NoActivePeer` if the transport is inactive, otherwise
    /// the first transport error, after every client was tried.
    pub fn send_to_all_clients(&self, payload: &[u8], mode: SendMode) -> Result<()> {
        let transport = self.active_transport("multi rpc")?;
        let mut first_error = None;
        for id in self.client_connections().iter().map(|c| c.id()) {
            if let Err(error) = transport.send_to_client(id, payload, mode) {
                tracing::warn!(id, %error, "multi rpc not delivered to client");
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    fn active_transport(&self, what: &str) -> Result<&Arc<dyn Transport>> {
        match self.transport.get() {
            Some(t) if t.is_active() => Ok(t),
            _ => Err(Error::NoActivePeer(format!("{} called while the transport is inactive", what))),
        }
    }

    // ========================================================================
    //  RECEIVING
    // ========================================================================

    /// Applies one transport event: bookkeeping, then hooks, then routing.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::ClientConnected(server) => {
                self.set_server_connection(Some(server.clone()));
                self.events.on_client_connected(&server);
            }
            TransportEvent::ClientDisconnected => {
                self.set_server_connection(None);
                self.events.on_client_disconnected();
            }
            TransportEvent::ServerStarted => {
                self.events.on_server_started();
            }
            TransportEvent::ServerClientConnected(client) => {
                self.clients.insert(client.id(), client.clone());
                self.events.on_server_client_connected(&client);
            }
            TransportEvent::ServerClientDisconnected(client) => {
                self.clients.remove(&client.id());
                self.events.on_server_client_disconnected(&client);
            }
            TransportEvent::ServerDataReceived(sender, payload) => {
                self.route_server_bound(&sender, &payload);
            }
            TransportEvent::ClientDataReceived(payload) => {
                self.route_client_bound(&payload);
            }
        }
    }

    /// Handles every event already queued, without waiting. Returns how many
    /// were handled.
    pub fn pump(&self, events: &mut EventReceiver) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handles events until every sender of the channel is dropped.
    pub async fn run(self: Arc<Self>, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("transport event channel closed");
    }

    /// Routes a message a client sent to this server.
    pub fn route_server_bound(&self, sender: &ConnectionHandle, payload: &[u8]) -> RouteOutcome {
        self.route(Channel::ServerBound, sender, payload)
    }

    /// Routes a message the server sent to this client.
    pub fn route_client_bound(&self, payload: &[u8]) -> RouteOutcome {
        let server = self.server_connection().unwrap_or_else(|| ConnectionHandle::server(""));
        self.route(Channel::ClientBound, &server, payload)
    }

    fn route(&self, channel: Channel, sender: &ConnectionHandle, payload: &[u8]) -> RouteOutcome {
        if payload.len() < 2 {
            tracing::warn!(len = payload.len(), ?channel, "rpc message too short, dropping");
            return RouteOutcome::TooShort { len: payload.len() };
        }

        let mut reader = Reader::new(payload);
        let hash = match netpack::primitives::read_u16(&mut reader) {
            Ok(hash) => hash,
            Err(error) => return RouteOutcome::DecodeFailed { hash: 0, error },
        };

        let Some(entry) = self.table.get(hash) else {
            tracing::warn!(hash, ?channel, "received unknown rpc id, dropping");
            return RouteOutcome::UnknownHash { hash };
        };

        if entry.kind.channel() != channel {
            tracing::warn!(hash, name = entry.name, kind = ?entry.kind, ?channel, "rpc arrived on the wrong channel, dropping");
            return RouteOutcome::WrongDirection { hash, kind: entry.kind, channel };
        }

        match (entry.receiver)(sender, &mut reader) {
            Ok(()) => {
                tracing::trace!(hash, name = entry.name, %sender, "rpc invoked");
                RouteOutcome::Invoked { hash }
            }
            Err(error) => {
                tracing::warn!(hash, name = entry.name, %error, "rpc payload failed to decode, dropping");
                RouteOutcome::DecodeFailed { hash, error }
            }
        }
    }
}
