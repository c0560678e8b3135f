use std::net::SocketAddr;

use thiserror::Error;

/// Errors that may occur in this library.
///
/// Faults local to one record, one subscriber or the device never show
/// up here; they are logged and recovered where they happen. Only the
/// inability to provide service at all is surfaced.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening endpoint could not be bound.
    #[error("Could not bind `{addr}`: {reason}")]
    Bind {
        /// The address we tried to bind.
        addr: SocketAddr,

        /// Why binding failed.
        reason: String,
    },

    /// The configured listen host is not an IP address.
    #[error("Invalid listen host `{0}`")]
    InvalidHost(String),

    /// The server stopped unexpectedly.
    #[error("Server stopped: {0}")]
    Server(String),
}
