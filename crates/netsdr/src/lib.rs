//! NetSDR receiver control.
//!
//! Drives a NetSDR-style software-defined radio over its two channels: a
//! TCP control channel carrying length-and-type-prefixed messages and a UDP
//! channel streaming IQ samples.
//!
//! # Crate Structure
//!
//! - [`frame`]: message codec, sample decoding and the TCP stream splitter
//! - [`transport`]: control/data channel ports and their tokio adapters
//! - [`client`]: protocol client (behind the `client` feature)

/// Re-export frame types.
pub mod frame {
    pub use netsdr_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use netsdr_transport::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use netsdr_client::*;
}
