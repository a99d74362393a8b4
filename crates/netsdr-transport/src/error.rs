/// Errors that can occur in control/data channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the datagram socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the device.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The connection attempt did not complete in time.
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout {
        addr: String,
        timeout: std::time::Duration,
    },

    /// An I/O error occurred on an established channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Send attempted without an open control channel.
    #[error("not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
