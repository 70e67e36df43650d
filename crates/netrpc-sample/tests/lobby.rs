//! End-to-end checks of the generated lobby bindings over an in-process hub.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use netrpc::CallKind;
use netrpc::ConnectionHandle;
use netrpc::ConnectionId;
use netrpc::Error;
use netrpc::EventReceiver;
use netrpc::LocalHub;
use netrpc::LocalTransport;
use netrpc::NetworkManager;
use netrpc::RouteOutcome;
use netrpc::SendMode;
use netrpc::Transport;
use netrpc::TransportEvent;
use netrpc::event_channel;
use netrpc::pack::Writer;
use netrpc::pack::hash::stable_hash;
use netrpc::pack::primitives::write_u16;
use netrpc::pack::primitives::write_u32;
use netrpc::transport;
use netrpc_sample::lobby::Event;
use netrpc_sample::lobby::Lobby;
use netrpc_sample::lobby::take_events;
use netrpc_sample::math::Vec3;
use netrpc_sample::rpc_dispatch_table;
use tracing_subscriber::EnvFilter;

const CHAT: &str = "netrpc_sample::lobby::Lobby::chat(i32, String, netrpc::ConnectionHandle)";
const MOVED: &str = "netrpc_sample::lobby::Lobby::moved(netrpc::ConnectionHandle, netrpc_sample::math::Vec3)";
const TICK: &str = "netrpc_sample::lobby::Lobby::tick(u32, bool)";

// The lobby records into one process-wide log.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let guard = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
    take_events();
    guard
}

struct Session {
    hub: Arc<LocalHub>,
    server: NetworkManager,
    server_rx: EventReceiver,
    clients: Vec<(NetworkManager, EventReceiver)>,
}

impl Session {
    fn with_clients(n: usize) -> Self {
        let hub = LocalHub::new();
        let (tx, server_rx) = event_channel();
        let server = NetworkManager::new(rpc_dispatch_table());
        server.init(Arc::new(LocalTransport::new(&hub, tx))).unwrap();
        server.start_server().unwrap();

        let mut session = Self { hub, server, server_rx, clients: Vec::new() };
        for _ in 0..n {
            session.join();
        }
        session
    }

    fn join(&mut self) {
        let (tx, rx) = event_channel();
        let client = NetworkManager::new(rpc_dispatch_table());
        client.init(Arc::new(LocalTransport::new(&self.hub, tx))).unwrap();
        client.connect_to_server("lobby").unwrap();
        self.clients.push((client, rx));
        self.pump();
    }

    fn client(&self, i: usize) -> &NetworkManager {
        &self.clients[i].0
    }

    fn pump(&mut self) -> usize {
        let mut n = self.server.pump(&mut self.server_rx);
        for (client, rx) in &mut self.clients {
            n += client.pump(rx);
        }
        n
    }
}

// ============================================================================
//  GENERATED TABLE
// ============================================================================

#[test]
fn test_table_holds_every_rpc() {
    let table = rpc_dispatch_table();
    assert_eq!(table.len(), 5);

    let chat = table.get(stable_hash(CHAT)).unwrap();
    assert_eq!(chat.name, CHAT);
    assert_eq!(chat.kind, CallKind::Server);

    assert_eq!(table.get(stable_hash(TICK)).unwrap().kind, CallKind::Multi);
    assert!(Arc::ptr_eq(&table, &rpc_dispatch_table()));
}

// ============================================================================
//  DELIVERY
// ============================================================================

#[test]
fn test_server_rpc_gets_calling_client() {
    let _guard = serial();
    let mut s = Session::with_clients(1);
    let id = s.server.client_connections()[0].id();

    Lobby::call_rpc_chat(s.client(0), 3, "hello".into(), None).unwrap();
    assert_eq!(s.pump(), 1);

    assert_eq!(take_events(), vec![Event::Chat { from: id, room: 3, text: "hello".into() }]);
}

#[test]
fn test_custom_payload_type() {
    let _guard = serial();
    let mut s = Session::with_clients(1);
    let id = s.server.client_connections()[0].id();

    Lobby::call_rpc_moved(s.client(0), None, Vec3::new(1.0, -2.5, 8.0)).unwrap();
    s.pump();

    assert_eq!(take_events(), vec![Event::Moved { from: id, to: Vec3::new(1.0, -2.5, 8.0) }]);
}

#[test]
fn test_client_rpc_reaches_only_destination() {
    let _guard = serial();
    let mut s = Session::with_clients(2);
    let target = s.server.client_connections()[1].clone();

    Lobby::call_rpc_welcome(&s.server, "be nice".into(), Some(&target), 7).unwrap();
    assert_eq!(s.pump(), 1);

    assert_eq!(
        take_events(),
        vec![Event::Welcome { from_server: true, motd: "be nice".into(), slot: 7 }]
    );
}

#[test]
fn test_client_rpc_without_destination_is_invalid() {
    let _guard = serial();
    let mut s = Session::with_clients(1);

    let result = Lobby::call_rpc_welcome(&s.server, "lost".into(), None, 1);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(s.pump(), 0);
    assert!(take_events().is_empty());
}

#[test]
fn test_multi_rpc_reaches_every_client() {
    let _guard = serial();
    let mut s = Session::with_clients(3);

    Lobby::call_rpc_tick(&s.server, 99, true).unwrap();
    assert_eq!(s.pump(), 3);

    assert_eq!(take_events(), vec![Event::Tick { frame: 99, alive: true }; 3]);
}

#[test]
fn test_default_values_fill_missing_arguments() {
    let _guard = serial();
    let mut s = Session::with_clients(1);

    Lobby::call_rpc_greet(s.client(0), None, Some(3)).unwrap();
    Lobby::call_rpc_greet(s.client(0), Some("yo".into()), None).unwrap();
    s.pump();

    assert_eq!(
        take_events(),
        vec![
            Event::Greet { text: "hi".into(), times: 3 },
            Event::Greet { text: "yo".into(), times: 1 },
        ]
    );
}

#[test]
fn test_uninitialized_manager_sends_nothing() {
    let _guard = serial();
    let net = NetworkManager::new(rpc_dispatch_table());

    assert!(Lobby::call_rpc_chat(&net, 1, "nobody".into(), None).is_ok());
    assert!(Lobby::call_rpc_tick(&net, 1, false).is_ok());
    assert!(take_events().is_empty());
}

// ============================================================================
//  ROUTING
// ============================================================================

#[test]
fn test_one_byte_message_is_dropped() {
    let _guard = serial();
    let net = NetworkManager::new(rpc_dispatch_table());
    let client = ConnectionHandle::client(1, "a");

    assert_eq!(net.route_server_bound(&client, &[0x01]), RouteOutcome::TooShort { len: 1 });
    assert_eq!(net.table().len(), 5);
    assert!(take_events().is_empty());
}

#[test]
fn test_multi_rpc_sent_to_server_is_dropped() {
    let _guard = serial();
    let net = NetworkManager::new(rpc_dispatch_table());
    let client = ConnectionHandle::client(1, "a");

    let mut w = Writer::new();
    write_u16(&mut w, stable_hash(TICK));
    write_u32(&mut w, 5);
    w.write_byte(1);

    let outcome = net.route_server_bound(&client, w.as_bytes());
    assert!(matches!(outcome, RouteOutcome::WrongDirection { kind: CallKind::Multi, .. }));
    assert!(take_events().is_empty());
}

// ============================================================================
//  WIRE FORMAT
// ============================================================================

#[derive(Default)]
struct Capture {
    sent: Mutex<Vec<(Option<ConnectionId>, Vec<u8>, SendMode)>>,
}

impl Capture {
    fn push(&self, to: Option<ConnectionId>, payload: &[u8], mode: SendMode) -> transport::Result<()> {
        self.sent.lock().unwrap().push((to, payload.to_vec(), mode));
        Ok(())
    }
}

impl Transport for Capture {
    fn is_active(&self) -> bool {
        true
    }
    fn is_server(&self) -> bool {
        false
    }
    fn connect_client(&self, _address: &str) -> transport::Result<()> {
        Ok(())
    }
    fn stop_client(&self) -> transport::Result<()> {
        Ok(())
    }
    fn start_server(&self) -> transport::Result<()> {
        Ok(())
    }
    fn stop_server(&self) -> transport::Result<()> {
        Ok(())
    }
    fn kick_connection(&self, _id: ConnectionId) -> transport::Result<()> {
        Ok(())
    }
    fn send_to_server(&self, payload: &[u8], mode: SendMode) -> transport::Result<()> {
        self.push(None, payload, mode)
    }
    fn send_to_client(&self, id: ConnectionId, payload: &[u8], mode: SendMode) -> transport::Result<()> {
        self.push(Some(id), payload, mode)
    }
    fn shutdown(&self) {}
}

#[test]
fn test_wire_layout_and_send_modes() {
    let _guard = serial();
    let capture = Arc::new(Capture::default());
    let net = NetworkManager::new(rpc_dispatch_table());
    net.init(capture.clone()).unwrap();
    net.handle_event(TransportEvent::ClientConnected(ConnectionHandle::server("capture")));

    Lobby::call_rpc_chat(&net, 3, "hi".into(), None).unwrap();
    Lobby::call_rpc_moved(&net, None, Vec3::new(1.0, 0.0, 0.0)).unwrap();

    let sent = capture.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);

    let [lo, hi] = stable_hash(CHAT).to_le_bytes();
    assert_eq!(sent[0], (None, vec![lo, hi, 3, 0, 0, 0, 2, b'h', b'i'], SendMode::Reliable));

    let (to, bytes, mode) = &sent[1];
    assert_eq!(*to, None);
    assert_eq!(*mode, SendMode::Unreliable);
    assert_eq!(bytes.len(), 2 + 12);
    assert_eq!(&bytes[..2], &stable_hash(MOVED).to_le_bytes());
    assert_eq!(&bytes[2..6], &1.0f32.to_le_bytes());
}
