use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use netsdr_transport::{
    TcpControlConfig, UdpDataConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTROL_PORT,
    DEFAULT_DATA_PORT,
};
use serde::{Deserialize, Serialize};

use crate::control::{DEFAULT_AD_MODE, DEFAULT_SAMPLE_RATE, RF_FILTER_AUTO};
use crate::error::{ClientError, Result};
use crate::sink::DEFAULT_SAMPLE_FILE;

/// Receiver setup applied on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverSettings {
    pub sample_rate: u64,
    pub rf_filter: u16,
    pub ad_mode: [u8; 2],
    /// Upper bound on each control round trip. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            rf_filter: RF_FILTER_AUTO,
            ad_mode: DEFAULT_AD_MODE,
            request_timeout: None,
        }
    }
}

/// Client configuration, loadable from JSON.
///
/// Every field is optional in the file; missing fields take their defaults.
///
/// ```json
/// { "host": "192.168.1.20", "request_timeout_ms": 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub control_port: u16,
    /// Local UDP port the device streams IQ data to.
    pub data_port: u16,
    pub connect_timeout_ms: u64,
    pub sample_rate: u64,
    pub rf_filter: u16,
    pub ad_mode: [u8; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    pub sample_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            data_port: DEFAULT_DATA_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            sample_rate: DEFAULT_SAMPLE_RATE,
            rf_filter: RF_FILTER_AUTO,
            ad_mode: DEFAULT_AD_MODE,
            request_timeout_ms: None,
            sample_file: PathBuf::from(DEFAULT_SAMPLE_FILE),
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ClientError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// `host:port` for the control connection. IPv6 literals are bracketed.
    pub fn control_addr(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.control_port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.control_port),
        }
    }

    pub fn data_bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.data_port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn tcp_config(&self) -> TcpControlConfig {
        TcpControlConfig {
            addr: self.control_addr(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..TcpControlConfig::default()
        }
    }

    pub fn udp_config(&self) -> UdpDataConfig {
        UdpDataConfig {
            bind_addr: self.data_bind_addr(),
            ..UdpDataConfig::default()
        }
    }

    pub fn receiver_settings(&self) -> ReceiverSettings {
        ReceiverSettings {
            sample_rate: self.sample_rate,
            rf_filter: self.rf_filter,
            ad_mode: self.ad_mode,
            request_timeout: self.request_timeout(),
        }
    }
}
