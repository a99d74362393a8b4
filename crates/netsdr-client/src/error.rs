use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Control or data channel failure.
    #[error("transport error: {0}")]
    Transport(#[from] netsdr_transport::TransportError),

    /// An outbound message could not be built.
    #[error("frame error: {0}")]
    Frame(#[from] netsdr_frame::FrameError),

    /// The operation needs an open control channel.
    #[error("not connected")]
    NotConnected,

    /// Another control request is still waiting for its response.
    #[error("a control request is already in flight")]
    RequestInFlight,

    /// The control channel closed before the response arrived.
    #[error("disconnected while waiting for a response")]
    Disconnected,

    /// No response within the configured request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Writing samples failed.
    #[error("sample sink error: {0}")]
    Sink(#[source] std::io::Error),

    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ClientConfig`](crate::ClientConfig).
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
