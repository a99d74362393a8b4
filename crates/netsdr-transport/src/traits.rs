use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Inbound units pushed by a channel's background receive task.
///
/// The sender side is owned by the receive task; the stream ends when the
/// task exits (remote close, I/O error or explicit stop).
pub type Inbound = mpsc::Receiver<Bytes>;

/// The persistent control channel to the device.
///
/// Inbound messages arrive one complete protocol message per item on the
/// [`Inbound`] returned by [`connect`](ControlChannel::connect).
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Open the channel and start its receive task.
    async fn connect(&mut self) -> Result<Inbound>;

    /// Stop the receive task and close the channel. Idempotent.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the channel is open. Turns false once the receive task exits.
    fn is_connected(&self) -> bool;

    /// Write one encoded message. Fails with `NotConnected` when closed.
    async fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// The datagram channel carrying IQ data.
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Start the receive loop; one item per datagram until stopped.
    async fn start_listening(&mut self) -> Result<Inbound>;

    /// Cancel the receive loop. The [`Inbound`] ends once it exits.
    fn stop_listening(&mut self);

    fn is_listening(&self) -> bool;
}
