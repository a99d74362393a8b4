//! UDP data channel.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};
use crate::traits::{DataChannel, Inbound};

/// Default local port the device streams IQ datagrams to.
pub const DEFAULT_DATA_PORT: u16 = 60000;

/// Largest datagram a UDP socket can hand back.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Configuration for [`UdpDataChannel`].
#[derive(Debug, Clone)]
pub struct UdpDataConfig {
    /// Local `host:port` to bind.
    pub bind_addr: String,
    /// Datagrams buffered before the receive task waits.
    pub channel_capacity: usize,
    pub recv_buffer_size: usize,
}

impl Default for UdpDataConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_DATA_PORT}"),
            channel_capacity: 1024,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Datagram listener for the IQ stream.
///
/// The socket is bound on [`start_listening`](DataChannel::start_listening)
/// and owned by the receive task. Stopping cancels the task; starting again
/// waits for it to release the port before rebinding.
#[derive(Debug)]
pub struct UdpDataChannel {
    config: UdpDataConfig,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl UdpDataChannel {
    pub fn new(config: UdpDataConfig) -> Self {
        Self {
            config,
            cancel: None,
            task: None,
            local_addr: None,
        }
    }

    /// Shorthand for a listener on `bind_addr` with default settings.
    pub fn with_bind_addr(bind_addr: impl Into<String>) -> Self {
        Self::new(UdpDataConfig {
            bind_addr: bind_addr.into(),
            ..UdpDataConfig::default()
        })
    }

    /// The bound address while listening. Useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl DataChannel for UdpDataChannel {
    async fn start_listening(&mut self) -> Result<Inbound> {
        self.stop_listening();
        // The old task owns the socket; it must be gone before a fixed port
        // can be bound again.
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "previous data receive task failed");
            }
        }

        let addr = self.config.bind_addr.clone();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = socket.local_addr()?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(recv_loop(
            socket,
            tx,
            cancel.clone(),
            self.config.recv_buffer_size,
        ));

        self.cancel = Some(cancel);
        self.task = Some(task);
        self.local_addr = Some(local_addr);

        tracing::info!(addr = %local_addr, "data channel listening");
        Ok(rx)
    }

    fn stop_listening(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            tracing::debug!(addr = ?self.local_addr, "data channel stopping");
        }
        self.local_addr = None;
    }

    fn is_listening(&self) -> bool {
        self.cancel.is_some() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for UdpDataChannel {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

async fn recv_loop(
    socket: UdpSocket,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => received,
        };

        match received {
            Ok((len, from)) => {
                tracing::trace!(from = %from, bytes = len, "datagram received");
                let datagram = Bytes::copy_from_slice(&buf[..len]);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(datagram) => {
                        if sent.is_err() {
                            tracing::debug!("data inbound receiver dropped");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "data channel receive failed");
                break;
            }
        }
    }
    tracing::debug!("data receive loop stopped");
}
