//! Device channel ports and their tokio adapters.
//!
//! A NetSDR receiver is driven over two channels:
//! - a persistent TCP control channel carrying framed request/response messages
//! - a UDP data channel the device streams IQ datagrams to
//!
//! [`ControlChannel`] and [`DataChannel`] are the ports the protocol client
//! is written against; [`TcpControlChannel`] and [`UdpDataChannel`] are the
//! real implementations. Each owns a background receive task that forwards
//! inbound units on an [`Inbound`] queue.

pub mod error;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::{TcpControlChannel, TcpControlConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTROL_PORT};
pub use traits::{ControlChannel, DataChannel, Inbound};
pub use udp::{UdpDataChannel, UdpDataConfig, DEFAULT_DATA_PORT, MAX_DATAGRAM_SIZE};
