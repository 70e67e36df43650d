//! In-process transport.
//!
//! A `LocalHub` plays the part of the network: one server endpoint and any
//! number of client endpoints register their event senders with it, and every
//! send becomes a `TransportEvent` pushed straight into the receiving
//! endpoint's channel. Delivery is always in order and never dropped, whatever
//! the `SendMode`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use dashmap::DashMap;

use crate::connection::ConnectionHandle;
use crate::connection::ConnectionId;
use crate::transport;
use crate::transport::EventSender;
use crate::transport::SendMode;
use crate::transport::Transport;
use crate::transport::TransportEvent;

/// The shared medium local endpoints talk through.
pub struct LocalHub {
    server: Mutex<Option<EventSender>>,
    clients: DashMap<ConnectionId, EventSender>,
    next_id: AtomicU32,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            server: Mutex::new(None),
            clients: DashMap::new(),
            next_id: AtomicU32::new(1),
        })
    }

    fn server(&self) -> MutexGuard<'_, Option<EventSender>> {
        self.server.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn client_handle(id: ConnectionId) -> ConnectionHandle {
        ConnectionHandle::client(id, format!("local:{}", id))
    }
}

#[derive(Debug, Default)]
struct State {
    serving: bool,
    client: Option<ConnectionId>,
}

/// One endpoint on a `LocalHub`. The same type serves as client or server.
pub struct LocalTransport {
    hub: Arc<LocalHub>,
    events: EventSender,
    state: Mutex<State>,
}

impl LocalTransport {
    /// Creates an endpoint that reports its events into `events`.
    pub fn new(hub: &Arc<LocalHub>, events: EventSender) -> Self {
        Self { hub: hub.clone(), events, state: Mutex::new(State::default()) }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The hub id of this endpoint's client connection, if it is connected.
    pub fn client_id(&self) -> Option<ConnectionId> {
        let id = self.state().client?;
        self.hub.clients.contains_key(&id).then_some(id)
    }
}

fn deliver(to: &EventSender, event: TransportEvent) -> transport::Result<()> {
    to.send(event)
        .map_err(|_| transport::Error::ConnectionLost("local endpoint dropped its event channel".into()))
}

impl Transport for LocalTransport {
    fn is_active(&self) -> bool {
        let serving = self.state().serving;
        serving || self.client_id().is_some()
    }

    fn is_server(&self) -> bool {
        self.state().serving
    }

    fn connect_client(&self, address: &str) -> transport::Result<()> {
        if self.client_id().is_some() {
            return Err(transport::Error::Io("already connected".into()));
        }
        let Some(server) = self.hub.server().clone() else {
            return Err(transport::Error::ConnectionLost(format!("no local server at {}", address)));
        };

        let id = self.hub.next_id.fetch_add(1, Ordering::Relaxed);
        self.hub.clients.insert(id, self.events.clone());
        self.state().client = Some(id);

        deliver(&self.events, TransportEvent::ClientConnected(ConnectionHandle::server(address)))?;
        deliver(&server, TransportEvent::ServerClientConnected(LocalHub::client_handle(id)))
    }

    fn stop_client(&self) -> transport::Result<()> {
        let Some(id) = self.state().client.take() else {
            return Ok(());
        };
        if self.hub.clients.remove(&id).is_none() {
            return Ok(());
        }

        if let Some(server) = self.hub.server().clone() {
            deliver(&server, TransportEvent::ServerClientDisconnected(LocalHub::client_handle(id)))?;
        }
        deliver(&self.events, TransportEvent::ClientDisconnected)
    }

    fn start_server(&self) -> transport::Result<()> {
        {
            let mut server = self.hub.server();
            if server.is_some() {
                return Err(transport::Error::Io("a local server is already running".into()));
            }
            *server = Some(self.events.clone());
        }
        self.state().serving = true;
        deliver(&self.events, TransportEvent::ServerStarted)
    }

    fn stop_server(&self) -> transport::Result<()> {
        if !std::mem::take(&mut self.state().serving) {
            return Ok(());
        }
        self.hub.server().take();

        let ids: Vec<ConnectionId> = self.hub.clients.iter().map(|c| *c.key()).collect();
        for id in ids {
            if let Some((_, client)) = self.hub.clients.remove(&id) {
                let _ = deliver(&client, TransportEvent::ClientDisconnected);
                deliver(&self.events, TransportEvent::ServerClientDisconnected(LocalHub::client_handle(id)))?;
            }
        }
        Ok(())
    }

    fn kick_connection(&self, id: ConnectionId) -> transport::Result<()> {
        if !self.is_server() {
            return Err(transport::Error::NotConnected);
        }
        let Some((_, client)) = self.hub.clients.remove(&id) else {
            return Err(transport::Error::UnknownConnection(id));
        };

        let _ = deliver(&client, TransportEvent::ClientDisconnected);
        deliver(&self.events, TransportEvent::ServerClientDisconnected(LocalHub::client_handle(id)))
    }

    fn send_to_server(&self, payload: &[u8], _mode: SendMode) -> transport::Result<()> {
        let id = self.client_id().ok_or(transport::Error::NotConnected)?;
        let Some(server) = self.hub.server().clone() else {
            return Err(transport::Error::ConnectionLost("local server stopped".into()));
        };
        deliver(&server, TransportEvent::ServerDataReceived(LocalHub::client_handle(id), payload.to_vec()))
    }

    fn send_to_client(&self, id: ConnectionId, payload: &[u8], _mode: SendMode) -> transport::Result<()> {
        if !self.is_server() {
            return Err(transport::Error::NotConnected);
        }
        let client = self
            .hub
            .clients
            .get(&id)
            .map(|c| c.value().clone())
            .ok_or(transport::Error::UnknownConnection(id))?;
        deliver(&client, TransportEvent::ClientDataReceived(payload.to_vec()))
    }

    fn shutdown(&self) {
        if let Err(e) = self.stop_client() {
            tracing::debug!(%e, "local client shutdown");
        }
        if let Err(e) = self.stop_server() {
            tracing::debug!(%e, "local server shutdown");
        }
    }
}
