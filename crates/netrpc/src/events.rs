use crate::connection::ConnectionHandle;

/// Lifecycle hooks invoked by the network manager.
///
/// Every method defaults to doing nothing. The manager updates its own
/// connection bookkeeping before calling a hook, so hooks can query
/// `server_connection()` or `client_connections()` and see the new state.
pub trait NetworkEvents: Send + Sync {
    /// This client connected to `server`.
    fn on_client_connected(&self, server: &ConnectionHandle) {
        let _ = server;
    }

    /// This client's server connection closed.
    fn on_client_disconnected(&self) {}

    fn on_server_started(&self) {}

    /// `client` connected to this server.
    fn on_server_client_connected(&self, client: &ConnectionHandle) {
        let _ = client;
    }

    /// `client` left this server.
    fn on_server_client_disconnected(&self, client: &ConnectionHandle) {
        let _ = client;
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl NetworkEvents for NoEvents {}
