//! Background loops draining the channel inbound queues.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use netsdr_frame::{decode_frame, decode_samples, Frame, FrameError, MessageKind, IQ_SAMPLE_BITS};
use netsdr_transport::Inbound;
use tokio::sync::broadcast;

use crate::error::ClientError;
use crate::sink::SampleSink;
use crate::slot::{Delivery, ResponseSlot};

/// Shared handle to the client's sample sink.
pub type SharedSink = Arc<Mutex<Box<dyn SampleSink>>>;

/// Something the client observed outside a request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A device notification arrived with no request waiting.
    Notification(Frame),
    /// A well-formed message arrived with no request waiting.
    Unexpected(Frame),
    /// An unsolicited message failed to decode and was dropped.
    Malformed { bytes: Bytes, error: String },
    /// A datagram's samples were handed to the sink.
    Samples { sequence_number: u16, count: usize },
    /// The control channel closed without a disconnect call.
    ConnectionLost,
}

/// Classification of a control message nobody was waiting for.
#[derive(Debug)]
pub enum Unsolicited {
    Notification(Frame),
    Unexpected(Frame),
    Malformed(FrameError),
}

impl Unsolicited {
    pub fn classify(message: &[u8]) -> Self {
        match decode_frame(message) {
            Ok(frame) => Self::from_frame(frame),
            Err(err) => Self::Malformed(err),
        }
    }

    pub fn from_frame(frame: Frame) -> Self {
        if frame.kind == MessageKind::Notification {
            Self::Notification(frame)
        } else {
            Self::Unexpected(frame)
        }
    }
}

/// Drain the control inbound queue: answer the waiting request or classify.
///
/// When the queue ends the slot is cleared. If `connected` was still set the
/// device went away on its own and [`ClientEvent::ConnectionLost`] is sent.
pub(crate) async fn control_loop(
    mut inbound: Inbound,
    slot: Arc<ResponseSlot>,
    connected: Arc<AtomicBool>,
    events: broadcast::Sender<ClientEvent>,
) {
    while let Some(message) = inbound.recv().await {
        tracing::trace!(bytes = message.len(), data = ?&message[..], "control message");
        let message = match slot.resolve(message) {
            Delivery::Resolved => continue,
            Delivery::Abandoned => {
                tracing::debug!("response arrived after its request was dropped");
                continue;
            }
            Delivery::Unclaimed(message) => message,
        };

        let event = match Unsolicited::classify(&message) {
            Unsolicited::Notification(frame) => {
                tracing::info!(
                    kind = %frame.kind,
                    sequence_number = frame.sequence_number,
                    body_len = frame.body.len(),
                    "unsolicited notification"
                );
                ClientEvent::Notification(frame)
            }
            Unsolicited::Unexpected(frame) => {
                tracing::warn!(
                    kind = %frame.kind,
                    item_code = %frame.item_code,
                    body_len = frame.body.len(),
                    "unexpected message with no request in flight"
                );
                ClientEvent::Unexpected(frame)
            }
            Unsolicited::Malformed(err) => {
                tracing::warn!(error = %err, bytes = message.len(), "dropping undecodable message");
                ClientEvent::Malformed {
                    bytes: message,
                    error: err.to_string(),
                }
            }
        };
        let _ = events.send(event);
    }

    slot.clear();
    if connected.swap(false, Ordering::SeqCst) {
        tracing::warn!("control channel lost");
        let _ = events.send(ClientEvent::ConnectionLost);
    } else {
        tracing::debug!("control dispatch stopped");
    }
}

/// Decode one IQ datagram into its sequence number and 16-bit samples.
pub fn decode_datagram(datagram: &[u8]) -> Result<(u16, Vec<u32>), FrameError> {
    let frame = decode_frame(datagram)?;
    let samples = decode_samples(IQ_SAMPLE_BITS, &frame.body)?.collect();
    Ok((frame.sequence_number, samples))
}

/// Drain the data inbound queue into the sample sink.
pub(crate) async fn ingest_loop(
    mut inbound: Inbound,
    sink: SharedSink,
    events: broadcast::Sender<ClientEvent>,
) {
    while let Some(datagram) = inbound.recv().await {
        let (sequence_number, samples) = match decode_datagram(&datagram) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(error = %err, bytes = datagram.len(), "dropping undecodable datagram");
                continue;
            }
        };

        let count = samples.len();
        if let Err(err) = with_sink(&sink, move |sink| sink.write_samples(&samples)).await {
            tracing::warn!(error = %err, sequence_number, "sample sink write failed");
            continue;
        }

        tracing::trace!(sequence_number, count, "samples written");
        let _ = events.send(ClientEvent::Samples {
            sequence_number,
            count,
        });
    }

    if let Err(err) = with_sink(&sink, |sink| sink.flush()).await {
        tracing::warn!(error = %err, "sample sink flush failed");
    }
    tracing::debug!("sample ingestion stopped");
}

/// Run a sink operation on the blocking pool; file sinks do plain blocking I/O.
async fn with_sink<F>(sink: &SharedSink, op: F) -> Result<(), ClientError>
where
    F: FnOnce(&mut dyn SampleSink) -> io::Result<()> + Send + 'static,
{
    let sink = Arc::clone(sink);
    tokio::task::spawn_blocking(move || {
        let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut **sink)
    })
    .await
    .map_err(|err| ClientError::Sink(io::Error::other(err)))?
    .map_err(ClientError::Sink)
}
