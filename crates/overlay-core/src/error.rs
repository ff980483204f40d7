//! Transport-level failures shared by every exchange in the overlay.

use std::net::SocketAddr;
use std::time::Duration;

use crate::wire::{WireError, MAX_LINE_LEN};

/// Why a single line exchange with a remote endpoint failed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("connect to {addr} timed out after {after:?}")]
    ConnectTimeout { addr: SocketAddr, after: Duration },
    #[error("no reply within {0:?}")]
    ReadTimeout(Duration),
    #[error("connection closed before a full line arrived")]
    Closed,
    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    LineTooLong,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] WireError),
}

impl ProtocolError {
    /// True if the remote end could not be reached at all, as opposed to
    /// being reached and misbehaving.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Connect { .. } | ProtocolError::ConnectTimeout { .. }
        )
    }
}
