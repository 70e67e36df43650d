//! # Error Definitions
//!
//! Failures surfaced to callers of the network manager and generated senders.
//! Malformed inbound traffic never becomes an `Error`; the router logs and
//! drops it.

use crate::transport;

#[derive(Debug, Clone)]
pub enum Error {
    /// A client rpc was sent without a destination connection.
    InvalidArgument(String),
    /// The transport is inactive, or there is no server to send to.
    NoActivePeer(String),
    /// A lifecycle call was made before `NetworkManager::init`.
    NotInitialized,
    /// `NetworkManager::init` was called twice.
    AlreadyInitialized,
    /// The transport rejected the operation.
    Transport(transport::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::NoActivePeer(msg) => write!(f, "No active peer: {}", msg),
            Self::NotInitialized => write!(f, "Network manager has no transport"),
            Self::AlreadyInitialized => write!(f, "Network manager is already initialized"),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

/// A specialized Result type for netrpc operations.
pub type Result<T> = std::result::Result<T, Error>;
