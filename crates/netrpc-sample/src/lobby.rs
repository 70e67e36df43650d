//! The lobby's procedures. Each one records what it received so callers can
//! observe delivery with `take_events`.

use std::sync::Mutex;

use netrpc::ConnectionHandle;
use netrpc::ConnectionId;
use netrpc::client_rpc;
use netrpc::multi_rpc;
use netrpc::server_rpc;

use crate::math::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Chat { from: ConnectionId, room: i32, text: String },
    Moved { from: ConnectionId, to: Vec3 },
    Welcome { from_server: bool, motd: String, slot: u8 },
    Tick { frame: u32, alive: bool },
    Greet { text: String, times: i32 },
}

static EVENTS: Mutex<Vec<Event>> = Mutex::new(Vec::new());

fn record(event: Event) {
    tracing::info!(?event, "lobby rpc");
    EVENTS.lock().unwrap_or_else(|p| p.into_inner()).push(event);
}

/// Drains every event recorded so far.
pub fn take_events() -> Vec<Event> {
    std::mem::take(&mut *EVENTS.lock().unwrap_or_else(|p| p.into_inner()))
}

pub struct Lobby;

impl Lobby {
    #[server_rpc]
    pub fn chat(room: i32, text: String, sender: ConnectionHandle) {
        record(Event::Chat { from: sender.id(), room, text });
    }

    #[server_rpc(Unreliable)]
    pub fn moved(sender: ConnectionHandle, to: Vec3) {
        record(Event::Moved { from: sender.id(), to });
    }

    #[client_rpc]
    pub fn welcome(motd: String, peer: ConnectionHandle, slot: u8) {
        record(Event::Welcome { from_server: peer.is_server(), motd, slot });
    }

    #[multi_rpc(send = Reliable)]
    pub fn tick(frame: u32, alive: bool) {
        record(Event::Tick { frame, alive });
    }

    #[server_rpc]
    pub fn greet(#[default_value("hi")] text: String, #[default_value(1)] times: i32) {
        record(Event::Greet { text, times });
    }
}
