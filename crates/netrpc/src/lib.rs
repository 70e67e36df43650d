//! # netrpc
//!
//! Runtime half of attribute-driven rpcs between one server and many clients.
//!
//! Procedures are marked with [`server_rpc`], [`client_rpc`] or [`multi_rpc`].
//! A build script running `netrpc_build::compile()` scans the crate, and
//! [`include_rpcs!`] pulls in what it generated:
//!
//! - `Type::call_rpc_<name>(&manager, args..)` senders,
//! - hidden receivers that decode a message and call the procedure,
//! - `rpc_dispatch_table()`, the hash to receiver table for [`NetworkManager`].
//!
//! ```rust,ignore
//! netrpc::include_rpcs!();
//!
//! let (tx, mut rx) = netrpc::event_channel();
//! let net = NetworkManager::new(rpc_dispatch_table());
//! net.init(Arc::new(MyTransport::new(tx)))?;
//! net.connect_to_server("127.0.0.1:7777")?;
//! net.pump(&mut rx);
//! Player::call_rpc_moved(&net, None, 1.0, None)?;
//! ```

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod local;
pub mod manager;
pub mod transport;

#[cfg(test)]
mod tests;

pub use netpack as pack;
pub use netrpc_macros::client_rpc;
pub use netrpc_macros::multi_rpc;
pub use netrpc_macros::server_rpc;

pub use connection::ConnectionHandle;
pub use connection::ConnectionId;
pub use connection::PeerKind;
pub use dispatch::CallKind;
pub use dispatch::Channel;
pub use dispatch::Collision;
pub use dispatch::DispatchEntry;
pub use dispatch::DispatchTable;
pub use dispatch::DispatchTableBuilder;
pub use dispatch::RpcReceiver;
pub use error::Error;
pub use error::Result;
pub use events::NetworkEvents;
pub use events::NoEvents;
pub use local::LocalHub;
pub use local::LocalTransport;
pub use manager::NetworkManager;
pub use manager::RouteOutcome;
pub use transport::EventReceiver;
pub use transport::EventSender;
pub use transport::SendMode;
pub use transport::Transport;
pub use transport::TransportEvent;
pub use transport::event_channel;

/// Includes the code `netrpc_build` generated for this crate.
///
/// Invoke once, at the crate root.
#[macro_export]
macro_rules! include_rpcs {
    () => {
        include!(concat!(env!("OUT_DIR"), "/netrpc_generated.rs"));
    };
    ($file:literal) => {
        include!(concat!(env!("OUT_DIR"), "/", $file));
    };
}
