//! Protocol client for NetSDR receivers.
//!
//! [`NetSdrClient`] drives a receiver over a [`ControlChannel`] and a
//! [`DataChannel`]: it configures the device on connect, correlates each
//! control request with the next inbound message, reports everything else
//! as a [`ClientEvent`] and feeds decoded IQ samples to a [`SampleSink`].
//!
//! [`ControlChannel`]: netsdr_transport::ControlChannel
//! [`DataChannel`]: netsdr_transport::DataChannel

pub mod client;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
#[cfg(test)]
mod mock;
pub mod sink;
pub mod slot;

pub use client::{IqState, NetSdrClient};
pub use config::{ClientConfig, ReceiverSettings};
pub use control::{
    ControlItem, DEFAULT_AD_MODE, DEFAULT_CHANNEL, DEFAULT_FREQUENCY_HZ, DEFAULT_SAMPLE_RATE,
    RF_FILTER_AUTO,
};
pub use dispatch::{decode_datagram, ClientEvent, Unsolicited};
pub use error::{ClientError, Result};
pub use sink::{FileSampleSink, MemorySampleSink, NullSampleSink, SampleSink, DEFAULT_SAMPLE_FILE};
pub use slot::{Delivery, PendingResponse, ResponseSlot};
