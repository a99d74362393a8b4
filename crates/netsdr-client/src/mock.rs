//! In-memory channel ports for client tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use netsdr_transport::{ControlChannel, DataChannel, Inbound, Result, TransportError};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct ControlState {
    connected: bool,
    auto_reply: bool,
    connects: usize,
    sent: Vec<Bytes>,
    tx: Option<mpsc::Sender<Bytes>>,
}

/// Records sent messages; optionally echoes each one back as its response.
/// Clones share state so a test can keep a handle after moving one into
/// the client.
#[derive(Debug, Clone, Default)]
pub struct MockControlChannel {
    state: Arc<Mutex<ControlState>>,
}

impl MockControlChannel {
    /// A device that answers every request.
    pub fn auto_reply() -> Self {
        let mock = Self::default();
        mock.set_auto_reply(true);
        mock
    }

    fn state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap()
    }

    pub fn set_auto_reply(&self, enabled: bool) {
        self.state().auto_reply = enabled;
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state().sent.clone()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    /// Deliver `message` as if the device had sent it.
    pub async fn inject(&self, message: impl Into<Bytes>) {
        let tx = self.state().tx.clone().expect("mock not connected");
        tx.send(message.into()).await.unwrap();
    }

    /// Simulate the device closing the connection.
    pub fn close_remote(&self) {
        let mut state = self.state();
        state.connected = false;
        state.tx = None;
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn connect(&mut self) -> Result<Inbound> {
        let (tx, rx) = mpsc::channel(64);
        let mut state = self.state();
        state.connected = true;
        state.connects += 1;
        state.tx = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.close_remote();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        let message = Bytes::copy_from_slice(message);
        state.sent.push(message.clone());
        if state.auto_reply {
            if let Some(tx) = &state.tx {
                tx.try_send(message).unwrap();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DataState {
    starts: usize,
    fail_bind: bool,
    tx: Option<mpsc::Sender<Bytes>>,
}

#[derive(Debug, Clone, Default)]
pub struct MockDataChannel {
    state: Arc<Mutex<DataState>>,
}

impl MockDataChannel {
    fn state(&self) -> MutexGuard<'_, DataState> {
        self.state.lock().unwrap()
    }

    pub fn starts(&self) -> usize {
        self.state().starts
    }

    pub fn fail_bind(&self) {
        self.state().fail_bind = true;
    }

    pub async fn inject(&self, datagram: impl Into<Bytes>) {
        let tx = self.state().tx.clone().expect("mock not listening");
        tx.send(datagram.into()).await.unwrap();
    }
}

#[async_trait]
impl DataChannel for MockDataChannel {
    async fn start_listening(&mut self) -> Result<Inbound> {
        let mut state = self.state();
        if state.fail_bind {
            return Err(TransportError::Bind {
                addr: "0.0.0.0:60000".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
            });
        }
        let (tx, rx) = mpsc::channel(64);
        state.starts += 1;
        state.tx = Some(tx);
        Ok(rx)
    }

    fn stop_listening(&mut self) {
        self.state().tx = None;
    }

    fn is_listening(&self) -> bool {
        self.state().tx.is_some()
    }
}
