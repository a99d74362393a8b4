use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use netsdr_transport::{ControlChannel, DataChannel, TcpControlChannel, UdpDataChannel};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::config::{ClientConfig, ReceiverSettings};
use crate::control::ControlItem;
use crate::dispatch::{control_loop, ingest_loop, ClientEvent, SharedSink};
use crate::error::{ClientError, Result};
use crate::sink::{FileSampleSink, SampleSink};
use crate::slot::ResponseSlot;

const EVENT_CAPACITY: usize = 256;

/// Whether the receiver is streaming IQ data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IqState {
    Stopped,
    Started,
}

impl fmt::Display for IqState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IqState::Stopped => f.write_str("stopped"),
            IqState::Started => f.write_str("started"),
        }
    }
}

/// Client for a NetSDR receiver.
///
/// Owns the control and data channels, the single in-flight request slot
/// and the IQ streaming state. All operations take `&self`; share the client
/// behind an `Arc` to drive it from several tasks.
///
/// ```no_run
/// # async fn run() -> netsdr_client::Result<()> {
/// use netsdr_client::{ClientConfig, NetSdrClient};
///
/// let client = NetSdrClient::from_config(&ClientConfig::default());
/// client.connect().await?;
/// client.change_frequency(14_200_000, 1).await?;
/// client.start_iq().await?;
/// # Ok(())
/// # }
/// ```
pub struct NetSdrClient<C, D> {
    control: AsyncMutex<C>,
    data: AsyncMutex<D>,
    connecting: AsyncMutex<()>,
    slot: Arc<ResponseSlot>,
    connected: Arc<AtomicBool>,
    iq_started: AtomicBool,
    sink: SharedSink,
    settings: ReceiverSettings,
    events: broadcast::Sender<ClientEvent>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl NetSdrClient<TcpControlChannel, UdpDataChannel> {
    /// TCP/UDP client writing samples to `config.sample_file`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            TcpControlChannel::new(config.tcp_config()),
            UdpDataChannel::new(config.udp_config()),
            FileSampleSink::new(&config.sample_file),
            config.receiver_settings(),
        )
    }
}

impl<C, D> NetSdrClient<C, D>
where
    C: ControlChannel,
    D: DataChannel,
{
    pub fn new(
        control: C,
        data: D,
        sink: impl SampleSink + 'static,
        settings: ReceiverSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let sink: Box<dyn SampleSink> = Box::new(sink);
        Self {
            control: AsyncMutex::new(control),
            data: AsyncMutex::new(data),
            connecting: AsyncMutex::new(()),
            slot: Arc::new(ResponseSlot::new()),
            connected: Arc::new(AtomicBool::new(false)),
            iq_started: AtomicBool::new(false),
            sink: Arc::new(Mutex::new(sink)),
            settings,
            events,
            dispatcher: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn iq_state(&self) -> IqState {
        if self.iq_started.load(Ordering::SeqCst) {
            IqState::Started
        } else {
            IqState::Stopped
        }
    }

    /// Subscribe to unsolicited messages, sample batches and connection loss.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Open the control channel and configure the receiver.
    ///
    /// Sends sample rate, RF filter and A/D mode in that order, each waiting
    /// for its response. A no-op when already connected. If a setup request
    /// fails the channel is closed again and the error is returned, so the
    /// next call starts over.
    pub async fn connect(&self) -> Result<()> {
        let _connecting = self.connecting.lock().await;
        if self.is_connected() {
            tracing::debug!("already connected");
            return Ok(());
        }

        let previous = self.take_dispatcher();
        if let Some(previous) = previous {
            if let Err(err) = previous.await {
                tracing::warn!(error = %err, "previous control dispatch task failed");
            }
        }

        {
            let mut control = self.control.lock().await;
            let inbound = control.connect().await?;
            self.slot.clear();
            self.connected.store(true, Ordering::SeqCst);
            let dispatcher = tokio::spawn(control_loop(
                inbound,
                Arc::clone(&self.slot),
                Arc::clone(&self.connected),
                self.events.clone(),
            ));
            *self.lock_dispatcher() = Some(dispatcher);
        }
        tracing::info!("control channel open, configuring receiver");

        let setup = [
            ControlItem::sample_rate(self.settings.sample_rate),
            ControlItem::rf_filter(self.settings.rf_filter),
            ControlItem::ad_modes(self.settings.ad_mode),
        ];
        for item in &setup {
            if let Err(err) = self.request(item).await {
                tracing::warn!(item = %item.code, error = %err, "receiver setup failed, closing control channel");
                if let Err(close) = self.disconnect().await {
                    tracing::warn!(error = %close, "closing after failed setup failed");
                }
                return Err(err);
            }
        }

        tracing::info!(sample_rate = self.settings.sample_rate, "receiver configured");
        Ok(())
    }

    /// Close the control channel.
    ///
    /// A request still waiting fails with [`ClientError::Disconnected`]. IQ
    /// streaming is left as it is; call [`stop_iq`](Self::stop_iq) first to
    /// end it.
    pub async fn disconnect(&self) -> Result<()> {
        let result = {
            let mut control = self.control.lock().await;
            self.connected.store(false, Ordering::SeqCst);
            control.disconnect().await
        };

        let dispatcher = self.take_dispatcher();
        if let Some(dispatcher) = dispatcher {
            if let Err(err) = dispatcher.await {
                tracing::warn!(error = %err, "control dispatch task failed");
            }
        }
        self.slot.clear();

        tracing::info!(iq_state = %self.iq_state(), "disconnected");
        Ok(result?)
    }

    /// Tune `channel` to `hz`.
    pub async fn change_frequency(&self, hz: u64, channel: u8) -> Result<()> {
        self.request(&ControlItem::receiver_frequency(hz, channel)).await?;
        tracing::info!(hz, channel, "frequency changed");
        Ok(())
    }

    /// Start the receiver and begin ingesting IQ datagrams.
    ///
    /// The state turns `Started` once the device answers. The data channel
    /// is then opened and drained in the background; a bind failure is
    /// returned but leaves the state `Started`.
    pub async fn start_iq(&self) -> Result<()> {
        self.request(&ControlItem::receiver_start()).await?;
        self.iq_started.store(true, Ordering::SeqCst);
        tracing::info!("IQ streaming started");

        let inbound = self.data.lock().await.start_listening().await?;
        tokio::spawn(ingest_loop(
            inbound,
            Arc::clone(&self.sink),
            self.events.clone(),
        ));
        Ok(())
    }

    /// Stop the receiver and the data channel.
    pub async fn stop_iq(&self) -> Result<()> {
        self.request(&ControlItem::receiver_stop()).await?;
        self.iq_started.store(false, Ordering::SeqCst);
        self.data.lock().await.stop_listening();
        tracing::info!("IQ streaming stopped");
        Ok(())
    }

    /// Send a `SetControlItem` and wait for the next control message.
    ///
    /// Whatever arrives next is the response; its kind and item code are not
    /// checked. Only one request may be outstanding.
    pub async fn request(&self, item: &ControlItem) -> Result<Bytes> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let message = item.encode()?;
        let pending = self.slot.install()?;
        let _release = SlotRelease {
            slot: &self.slot,
            id: pending.id(),
        };

        tracing::debug!(item = %item.code, bytes = message.len(), "sending control request");
        self.control.lock().await.send(&message).await?;

        let response = match self.settings.request_timeout {
            None => pending.recv().await?,
            Some(limit) => tokio::time::timeout(limit, pending.recv())
                .await
                .map_err(|_| {
                    tracing::warn!(item = %item.code, timeout = ?limit, "control request timed out");
                    ClientError::Timeout(limit)
                })??,
        };

        tracing::trace!(item = %item.code, response = ?&response[..], "control response");
        Ok(response)
    }

    fn lock_dispatcher(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn take_dispatcher(&self) -> Option<JoinHandle<()>> {
        self.lock_dispatcher().take()
    }
}

impl<C, D> fmt::Debug for NetSdrClient<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetSdrClient")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("iq_started", &self.iq_started.load(Ordering::SeqCst))
            .field("pending", &self.slot.is_pending())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Frees the request slot when a request ends early (send error, timeout
/// or the caller dropping the future). No-op once the response was taken.
struct SlotRelease<'a> {
    slot: &'a ResponseSlot,
    id: u64,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        self.slot.cancel(self.id);
    }
}
