use std::cell::RefCell;
use std::sync::Arc;
use std::sync::Mutex;

use netpack::Reader;
use netpack::Writer;
use netpack::primitives::read_i32;
use netpack::primitives::write_i32;
use netpack::primitives::write_u16;
use tracing_subscriber::EnvFilter;

use crate::*;

const PING: u16 = 0x0101;
const NOTIFY: u16 = 0x0202;
const BROADCAST: u16 = 0x0303;

thread_local! {
    static CALLS: RefCell<Vec<(&'static str, ConnectionHandle, i32)>> = const { RefCell::new(Vec::new()) };
}

fn record(name: &'static str, sender: &ConnectionHandle, reader: &mut Reader<'_>) -> netpack::Result<()> {
    let value = read_i32(reader)?;
    CALLS.with(|c| c.borrow_mut().push((name, sender.clone(), value)));
    Ok(())
}

fn recv_ping(sender: &ConnectionHandle, reader: &mut Reader<'_>) -> netpack::Result<()> {
    record("ping", sender, reader)
}

fn recv_notify(sender: &ConnectionHandle, reader: &mut Reader<'_>) -> netpack::Result<()> {
    record("notify", sender, reader)
}

fn recv_broadcast(sender: &ConnectionHandle, reader: &mut Reader<'_>) -> netpack::Result<()> {
    record("broadcast", sender, reader)
}

fn take_calls() -> Vec<(&'static str, ConnectionHandle, i32)> {
    CALLS.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

fn table() -> Arc<DispatchTable> {
    let mut builder = DispatchTable::builder();
    builder.register(PING, "test::Net::ping(i32)", CallKind::Server, recv_ping).unwrap();
    builder.register(NOTIFY, "test::Net::notify(i32)", CallKind::Client, recv_notify).unwrap();
    builder.register(BROADCAST, "test::Net::broadcast(i32)", CallKind::Multi, recv_broadcast).unwrap();
    Arc::new(builder.build())
}

fn message(hash: u16, value: i32) -> Vec<u8> {
    let mut w = Writer::new();
    write_u16(&mut w, hash);
    write_i32(&mut w, value);
    w.into_bytes()
}

fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
//  DISPATCH TABLE
// ============================================================================

#[test]
fn test_register_keeps_first_on_collision() {
    let mut builder = DispatchTable::builder();
    builder.register(7, "first", CallKind::Server, recv_ping).unwrap();
    let err = builder.register(7, "second", CallKind::Client, recv_notify).unwrap_err();
    assert_eq!(err, Collision { hash: 7, kept: "first", rejected: "second" });

    let table = builder.build();
    assert_eq!(table.len(), 1);
    let entry = table.get(7).unwrap();
    assert_eq!(entry.name, "first");
    assert_eq!(entry.kind, CallKind::Server);
}

#[test]
fn test_call_kind_channels() {
    assert_eq!(CallKind::Server.channel(), Channel::ServerBound);
    assert_eq!(CallKind::Client.channel(), Channel::ClientBound);
    assert_eq!(CallKind::Multi.channel(), Channel::ClientBound);
}

// ============================================================================
//  ROUTER
// ============================================================================

#[test]
fn test_route_too_short_is_dropped() {
    let net = NetworkManager::new(table());
    let client = ConnectionHandle::client(3, "a");

    assert_eq!(net.route_server_bound(&client, &[0x01]), RouteOutcome::TooShort { len: 1 });
    assert_eq!(net.route_client_bound(&[]), RouteOutcome::TooShort { len: 0 });
    assert!(take_calls().is_empty());
    assert_eq!(net.table().len(), 3);
}

#[test]
fn test_route_unknown_hash_is_dropped() {
    let net = NetworkManager::new(table());
    let outcome = net.route_client_bound(&message(0xbeef, 1));
    assert_eq!(outcome, RouteOutcome::UnknownHash { hash: 0xbeef });
    assert!(take_calls().is_empty());
}

#[test]
fn test_route_server_rpc_on_client_channel_is_dropped() {
    let net = NetworkManager::new(table());
    let outcome = net.route_client_bound(&message(PING, 5));
    assert_eq!(
        outcome,
        RouteOutcome::WrongDirection { hash: PING, kind: CallKind::Server, channel: Channel::ClientBound }
    );
    assert!(take_calls().is_empty());
}

#[test]
fn test_route_client_rpcs_on_server_channel_are_dropped() {
    let net = NetworkManager::new(table());
    let client = ConnectionHandle::client(1, "a");
    for hash in [NOTIFY, BROADCAST] {
        let outcome = net.route_server_bound(&client, &message(hash, 5));
        assert!(matches!(outcome, RouteOutcome::WrongDirection { channel: Channel::ServerBound, .. }));
    }
    assert!(take_calls().is_empty());
}

#[test]
fn test_route_server_bound_passes_sender() {
    let net = NetworkManager::new(table());
    let client = ConnectionHandle::client(42, "10.0.0.2:9000");

    assert_eq!(net.route_server_bound(&client, &message(PING, -9)), RouteOutcome::Invoked { hash: PING });
    assert_eq!(take_calls(), vec![("ping", client, -9)]);
}

#[test]
fn test_route_client_bound_passes_server_connection() {
    let net = NetworkManager::new(table());
    net.handle_event(TransportEvent::ClientConnected(ConnectionHandle::server("game.example:7777")));

    net.handle_event(TransportEvent::ClientDataReceived(message(NOTIFY, 1)));
    net.handle_event(TransportEvent::ClientDataReceived(message(BROADCAST, 2)));

    let calls = take_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "notify");
    assert_eq!(calls[1].0, "broadcast");
    assert!(calls.iter().all(|(_, sender, _)| sender.is_server() && sender.address() == "game.example:7777"));
}

#[test]
fn test_route_truncated_payload_fails_decode() {
    let net = NetworkManager::new(table());
    let client = ConnectionHandle::client(1, "a");
    let mut bytes = message(PING, 1);
    bytes.truncate(4);

    let outcome = net.route_server_bound(&client, &bytes);
    assert!(matches!(outcome, RouteOutcome::DecodeFailed { hash: PING, .. }));
    assert!(take_calls().is_empty());
}

// ============================================================================
//  SENDING
// ============================================================================

struct Harness {
    server: NetworkManager,
    server_rx: EventReceiver,
    client: NetworkManager,
    client_rx: EventReceiver,
}

impl Harness {
    fn connected() -> Self {
        trace();
        let hub = LocalHub::new();
        let (server_tx, server_rx) = event_channel();
        let (client_tx, client_rx) = event_channel();

        let server = NetworkManager::new(table());
        server.init(Arc::new(LocalTransport::new(&hub, server_tx))).unwrap();
        let client = NetworkManager::new(table());
        client.init(Arc::new(LocalTransport::new(&hub, client_tx))).unwrap();

        let mut h = Self { server, server_rx, client, client_rx };
        h.server.start_server().unwrap();
        h.client.connect_to_server("local").unwrap();
        h.pump();
        h
    }

    fn pump(&mut self) -> usize {
        self.server.pump(&mut self.server_rx) + self.client.pump(&mut self.client_rx)
    }
}

#[test]
fn test_send_before_init_is_inactive() {
    let net = NetworkManager::new(table());
    assert!(!net.is_initialized());
    assert!(matches!(net.send_to_server(&message(PING, 1), SendMode::Reliable), Err(Error::NoActivePeer(_))));
    assert!(matches!(net.connect_to_server("x"), Err(Error::NotInitialized)));
}

#[test]
fn test_init_twice_fails() {
    let hub = LocalHub::new();
    let (tx, _rx) = event_channel();
    let net = NetworkManager::new(table());
    net.init(Arc::new(LocalTransport::new(&hub, tx.clone()))).unwrap();
    let again = net.init(Arc::new(LocalTransport::new(&hub, tx)));
    assert!(matches!(again, Err(Error::AlreadyInitialized)));
}

#[test]
fn test_send_to_client_without_connection_is_invalid() {
    let mut h = Harness::connected();
    let result = h.server.send_to_client(None, &message(NOTIFY, 1), SendMode::Reliable);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(h.pump(), 0);
}

#[test]
fn test_send_to_server_without_server_connection() {
    let hub = LocalHub::new();
    let (tx, _rx) = event_channel();
    let server = NetworkManager::new(table());
    server.init(Arc::new(LocalTransport::new(&hub, tx))).unwrap();
    server.start_server().unwrap();

    // Active transport, but this side never connected as a client.
    let result = server.send_to_server(&message(PING, 1), SendMode::Reliable);
    assert!(matches!(result, Err(Error::NoActivePeer(_))));
}

#[test]
fn test_roundtrip_over_local_transport() {
    let mut h = Harness::connected();
    let clients = h.server.client_connections();
    assert_eq!(clients.len(), 1);
    assert!(h.client.server_connection().is_some());

    h.client.send_to_server(&message(PING, 11), SendMode::Unreliable).unwrap();
    h.server.send_to_client(Some(&clients[0]), &message(NOTIFY, 12), SendMode::Reliable).unwrap();
    h.server.send_to_all_clients(&message(BROADCAST, 13), SendMode::Reliable).unwrap();
    assert_eq!(h.pump(), 3);

    let calls = take_calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], ("ping", clients[0].clone(), 11));
    assert_eq!((calls[1].0, calls[1].2), ("notify", 12));
    assert_eq!((calls[2].0, calls[2].2), ("broadcast", 13));
}

#[test]
fn test_broadcast_skips_dropped_client() {
    trace();
    let hub = LocalHub::new();
    let (server_tx, mut server_rx) = event_channel();
    let server = NetworkManager::new(table());
    server.init(Arc::new(LocalTransport::new(&hub, server_tx))).unwrap();
    server.start_server().unwrap();

    let mut clients = Vec::new();
    for _ in 0..3 {
        let (tx, rx) = event_channel();
        let client = NetworkManager::new(table());
        client.init(Arc::new(LocalTransport::new(&hub, tx))).unwrap();
        client.connect_to_server("local").unwrap();
        clients.push((client, rx));
    }
    server.pump(&mut server_rx);
    for (client, rx) in &mut clients {
        client.pump(rx);
    }
    let gone = server.client_connections()[0].id();

    // The server still lists the client until it pumps the disconnect.
    clients[0].0.disconnect().unwrap();
    assert_eq!(server.client_connections().len(), 3);

    let result = server.send_to_all_clients(&message(BROADCAST, 5), SendMode::Reliable);
    assert!(matches!(result, Err(Error::Transport(transport::Error::UnknownConnection(id))) if id == gone));

    for (client, rx) in &mut clients {
        client.pump(rx);
    }
    let delivered: Vec<i32> = take_calls().into_iter().filter(|c| c.0 == "broadcast").map(|c| c.2).collect();
    assert_eq!(delivered, vec![5, 5]);

    server.pump(&mut server_rx);
    assert_eq!(server.client_connections().len(), 2);
}

// ============================================================================
//  LIFECYCLE
// ============================================================================

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl NetworkEvents for Recorder {
    fn on_client_connected(&self, server: &ConnectionHandle) {
        self.0.lock().unwrap().push(format!("connected {}", server.address()));
    }
    fn on_client_disconnected(&self) {
        self.0.lock().unwrap().push("disconnected".into());
    }
    fn on_server_started(&self) {
        self.0.lock().unwrap().push("started".into());
    }
    fn on_server_client_connected(&self, client: &ConnectionHandle) {
        self.0.lock().unwrap().push(format!("joined {}", client.id()));
    }
    fn on_server_client_disconnected(&self, client: &ConnectionHandle) {
        self.0.lock().unwrap().push(format!("left {}", client.id()));
    }
}

#[test]
fn test_hooks_and_kick() {
    let hub = LocalHub::new();
    let server_log = Recorder::default();
    let client_log = Recorder::default();

    let (server_tx, mut server_rx) = event_channel();
    let server = NetworkManager::new(table()).with_events(server_log.clone());
    server.init(Arc::new(LocalTransport::new(&hub, server_tx))).unwrap();

    let (client_tx, mut client_rx) = event_channel();
    let client = NetworkManager::new(table()).with_events(client_log.clone());
    client.init(Arc::new(LocalTransport::new(&hub, client_tx))).unwrap();

    server.start_server().unwrap();
    client.connect_to_server("arena").unwrap();
    server.pump(&mut server_rx);
    client.pump(&mut client_rx);

    let id = server.client_connections()[0].id();
    server.kick_client(id).unwrap();
    server.pump(&mut server_rx);
    client.pump(&mut client_rx);

    assert!(server.client_connections().is_empty());
    assert!(client.server_connection().is_none());
    assert!(!client.transport_active());
    assert_eq!(
        *server_log.0.lock().unwrap(),
        vec!["started".to_string(), format!("joined {}", id), format!("left {}", id)]
    );
    assert_eq!(*client_log.0.lock().unwrap(), vec!["connected arena".to_string(), "disconnected".to_string()]);
}

#[test]
fn test_end_server_disconnects_clients() {
    let mut h = Harness::connected();
    h.server.end_server().unwrap();
    h.pump();

    assert!(h.server.client_connections().is_empty());
    assert!(h.client.server_connection().is_none());
    assert!(!h.server.transport_active());
}

#[tokio::test]
async fn test_run_drains_until_closed() {
    let (tx, rx) = event_channel();
    let net = Arc::new(NetworkManager::new(table()));
    let client = ConnectionHandle::client(9, "pump");

    tx.send(TransportEvent::ServerClientConnected(client.clone())).unwrap();
    tx.send(TransportEvent::ServerDataReceived(client.clone(), message(PING, 77))).unwrap();
    drop(tx);

    net.clone().run(rx).await;
    assert_eq!(net.client_connections(), vec![client.clone()]);
    assert_eq!(take_calls(), vec![("ping", client, 77)]);
}
