//! # Dispatch Table
//!
//! Maps a 16-bit procedure id to the generated receiver that decodes and
//! invokes it. The table is assembled once through a `DispatchTableBuilder`
//! (normally by the generated `register_rpcs`) and never changes afterwards,
//! so lookups need no locking.

use std::collections::HashMap;

use netpack::Reader;

use crate::connection::ConnectionHandle;

/// Who may invoke a procedure, and so which channel it may arrive on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Client to server.
    Server,
    /// Server to one client.
    Client,
    /// Server to every client.
    Multi,
}

/// The direction an inbound message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Received by a server from a client.
    ServerBound,
    /// Received by a client from the server.
    ClientBound,
}

impl CallKind {
    /// The only channel this kind of call may legally arrive on.
    pub fn channel(self) -> Channel {
        match self {
            CallKind::Server => Channel::ServerBound,
            CallKind::Client | CallKind::Multi => Channel::ClientBound,
        }
    }
}

/// A generated receiver: decodes arguments from the reader and calls the
/// procedure, with `sender` standing in for its connection parameter.
pub type RpcReceiver = fn(&ConnectionHandle, &mut Reader<'_>) -> netpack::Result<()>;

#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    pub hash: u16,
    /// Qualified procedure name the hash was computed from.
    pub name: &'static str,
    pub kind: CallKind,
    pub receiver: RpcReceiver,
}

/// A registration refused because its hash was already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub hash: u16,
    pub kept: &'static str,
    pub rejected: &'static str,
}

impl std::fmt::Display for Collision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rpc id {:#06x} of `{}` is already used by `{}`",
            self.hash, self.rejected, self.kept
        )
    }
}

impl std::error::Error for Collision {}

#[derive(Debug, Default)]
pub struct DispatchTableBuilder {
    entries: HashMap<u16, DispatchEntry>,
}

impl DispatchTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a receiver under `hash`.
    ///
    /// The first registration of a hash wins. A later one is refused and
    /// reported as a `Collision`; the table keeps the original entry.
    pub fn register(
        &mut self,
        hash: u16,
        name: &'static str,
        kind: CallKind,
        receiver: RpcReceiver,
    ) -> Result<(), Collision> {
        if let Some(existing) = self.entries.get(&hash) {
            let collision = Collision { hash, kept: existing.name, rejected: name };
            tracing::warn!(hash, kept = existing.name, rejected = name, "repeat rpc hash");
            return Err(collision);
        }
        self.entries.insert(hash, DispatchEntry { hash, name, kind, receiver });
        Ok(())
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable { entries: self.entries }
    }
}

/// The immutable, process-wide id to receiver map.
#[derive(Debug, Default)]
pub struct DispatchTable {
    entries: HashMap<u16, DispatchEntry>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::new()
    }

    pub fn get(&self, hash: u16) -> Option<&DispatchEntry> {
        self.entries.get(&hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries.values()
    }
}
