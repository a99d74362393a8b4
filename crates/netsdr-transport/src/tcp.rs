//! TCP control channel.
//!
//! [`TcpControlChannel`] connects to the device's control port, reassembles
//! the inbound byte stream into whole protocol messages with
//! [`FrameCodec`](netsdr_frame::FrameCodec) and forwards each one on an mpsc
//! channel from a background task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use netsdr_frame::FrameCodec;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};
use crate::traits::{ControlChannel, Inbound};

/// Default device control port.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the inbound message queue.
pub const DEFAULT_CONTROL_CAPACITY: usize = 64;

/// Configuration for [`TcpControlChannel`].
#[derive(Debug, Clone)]
pub struct TcpControlConfig {
    /// `host:port` of the device control port.
    pub addr: String,
    pub connect_timeout: Duration,
    /// Inbound messages buffered before the receive task waits.
    pub channel_capacity: usize,
}

impl Default for TcpControlConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{DEFAULT_CONTROL_PORT}"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CONTROL_CAPACITY,
        }
    }
}

/// Control channel over a TCP stream.
#[derive(Debug)]
pub struct TcpControlChannel {
    config: TcpControlConfig,
    writer: Option<OwnedWriteHalf>,
    connected: Arc<AtomicBool>,
    cancel: Option<CancellationToken>,
    reader: Option<JoinHandle<()>>,
}

impl TcpControlChannel {
    pub fn new(config: TcpControlConfig) -> Self {
        Self {
            config,
            writer: None,
            connected: Arc::new(AtomicBool::new(false)),
            cancel: None,
            reader: None,
        }
    }

    /// Shorthand for a channel to `addr` with default settings.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self::new(TcpControlConfig {
            addr: addr.into(),
            ..TcpControlConfig::default()
        })
    }

    /// The configured device address.
    pub fn addr(&self) -> &str {
        &self.config.addr
    }
}

#[async_trait]
impl ControlChannel for TcpControlChannel {
    async fn connect(&mut self) -> Result<Inbound> {
        if self.writer.is_some() {
            self.disconnect().await?;
        }

        let addr = self.config.addr.clone();
        let timeout = self.config.connect_timeout;
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "connecting control channel"
        );

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                addr: addr.clone(),
                timeout,
            })?
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        // Control messages are small and latency-sensitive.
        if let Err(err) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %err, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let cancel = CancellationToken::new();

        self.connected.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(
            FramedRead::new(read_half, FrameCodec::new()),
            tx,
            cancel.clone(),
            Arc::clone(&self.connected),
            addr.clone(),
        ));

        self.writer = Some(write_half);
        self.cancel = Some(cancel);
        self.reader = Some(reader);

        tracing::info!(addr = %addr, "control channel connected");
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.shutdown().await {
                tracing::debug!(addr = %self.config.addr, error = %err, "shutdown after close");
            }
        }
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.await {
                tracing::warn!(error = %err, "control receive task failed");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!(addr = %self.config.addr, "control channel disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some() && self.connected.load(Ordering::SeqCst)
    }

    async fn send(&mut self, message: &[u8]) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;

        tracing::trace!(bytes = message.len(), data = ?message, "sending control message");

        writer.write_all(message).await.map_err(|err| {
            tracing::error!(addr = %self.config.addr, error = %err, "control send failed");
            TransportError::Io(err)
        })?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for TcpControlChannel {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

async fn read_loop(
    mut framed: FramedRead<OwnedReadHalf, FrameCodec>,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    addr: String,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = framed.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                tracing::trace!(bytes = message.len(), "control message received");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(message) => {
                        if sent.is_err() {
                            tracing::debug!("control inbound receiver dropped");
                            break;
                        }
                    }
                }
            }
            Some(Err(err)) => {
                tracing::warn!(addr = %addr, error = %err, "control channel read failed");
                break;
            }
            None => {
                tracing::debug!(addr = %addr, "control channel closed by device");
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    tracing::debug!(addr = %addr, "control receive loop stopped");
}

#[cfg(test)]
mod tests {
    use netsdr_frame::{decode_frame, encode, ItemCode, MessageKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn delivers_one_item_per_message() {
        let (listener, addr) = listener().await;
        let first = encode(MessageKind::SetControlItem, ItemCode::RFFilter, &[0, 0]).unwrap();
        let second = encode(MessageKind::Ack, ItemCode::ADModes, &[0, 3]).unwrap();

        let server = {
            let mut wire = first.to_vec();
            wire.extend_from_slice(&second);
            tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                stream.write_all(&wire).await.unwrap();
                stream
            })
        };

        let mut channel = TcpControlChannel::with_addr(addr);
        let mut inbound = channel.connect().await.unwrap();
        assert!(channel.is_connected());

        assert_eq!(inbound.recv().await.unwrap(), first);
        assert_eq!(inbound.recv().await.unwrap(), second);

        let _stream = server.await.unwrap();
        channel.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn send_reaches_device() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 6];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut channel = TcpControlChannel::with_addr(addr);
        let _inbound = channel.connect().await.unwrap();
        let msg = encode(MessageKind::SetControlItem, ItemCode::ADModes, &[0x00, 0x03]).unwrap();
        channel.send(&msg).await.unwrap();

        let received = server.await.unwrap();
        let frame = decode_frame(&received).unwrap();
        assert_eq!(frame.item_code, ItemCode::ADModes);
        channel.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn remote_close_ends_inbound_and_clears_connected() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut channel = TcpControlChannel::with_addr(addr);
        let mut inbound = channel.connect().await.unwrap();
        server.await.unwrap();

        assert!(inbound.recv().await.is_none());
        assert!(!channel.is_connected());
        let err = channel.send(&[0x04, 0x00, 0x18, 0x00]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_ends_inbound() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let mut channel = TcpControlChannel::with_addr(addr);
        let mut inbound = channel.connect().await.unwrap();
        let _stream = server.await.unwrap();

        channel.disconnect().await.unwrap();
        assert!(!channel.is_connected());
        assert!(inbound.recv().await.is_none());

        // Idempotent.
        channel.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn send_without_connect_fails() {
        let mut channel = TcpControlChannel::new(TcpControlConfig::default());
        let err = channel.send(&[0x00]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn refused_connection_reports_address() {
        let (listener, addr) = listener().await;
        drop(listener);

        let mut channel = TcpControlChannel::with_addr(addr.clone());
        let err = channel.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { addr: a, .. } if a == addr));
        assert!(!channel.is_connected());
    }
}
