//! JSON configuration for a whole listener.
//!
//! Every field has a default, so `{}` is a valid (if receiver-less) file.
//!
//! ```
//! use sacnrx_core::config::ListenerConfig;
//!
//! let config = ListenerConfig::from_json_str(
//!     r#"{ "receivers": [ { "name": "wash", "universe": 3, "start_channel": 17 } ] }"#,
//! )?;
//! assert_eq!(config.port, 5568);
//! assert_eq!(config.receivers[0].receiver.start_channel, 17);
//! # Ok::<(), sacnrx_core::config::ConfigFileError>(())
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::WhiteChannels;
use crate::listener::{DEFAULT_MAX_DATAGRAMS_PER_TICK, DEFAULT_STREAM_IDLE_MS, ListenerOptions};
use crate::protocols::sacn::{ValidationRules, layout};
use crate::receiver::ReceiverConfig;
use crate::router::RouterOptions;
use crate::source::UdpSourceConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub port: u16,
    pub bind_address: IpAddr,
    pub multicast_interface: Ipv4Addr,
    pub accepted_start_codes: Vec<u8>,
    pub dmp_vectors: Vec<u8>,
    pub ignore_preview: bool,
    pub honor_stream_terminated: bool,
    pub allow_overlapping_ranges: bool,
    pub max_datagrams_per_tick: usize,
    pub stream_idle_ms: u64,
    pub receivers: Vec<OutputConfig>,
}

/// A receiver plus a description of the output it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(flatten)]
    pub receiver: ReceiverConfig,
    /// White channels the output can render.
    #[serde(default)]
    pub white: WhiteChannels,
    /// Render as an addressable strip even for a single pixel.
    #[serde(default)]
    pub addressable: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        let rules = ValidationRules::default();
        let router = RouterOptions::default();
        Self {
            port: layout::DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            accepted_start_codes: rules.accepted_start_codes,
            dmp_vectors: rules.dmp_vectors,
            ignore_preview: router.ignore_preview,
            honor_stream_terminated: router.honor_stream_terminated,
            allow_overlapping_ranges: router.allow_overlapping_ranges,
            max_datagrams_per_tick: DEFAULT_MAX_DATAGRAMS_PER_TICK,
            stream_idle_ms: DEFAULT_STREAM_IDLE_MS,
            receivers: Vec::new(),
        }
    }
}

impl ListenerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigFileError> {
        serde_json::from_str(text).map_err(ConfigFileError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigFileError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            rules: ValidationRules {
                accepted_start_codes: self.accepted_start_codes.clone(),
                dmp_vectors: self.dmp_vectors.clone(),
            },
            router: RouterOptions {
                allow_overlapping_ranges: self.allow_overlapping_ranges,
                ignore_preview: self.ignore_preview,
                honor_stream_terminated: self.honor_stream_terminated,
            },
            max_datagrams_per_tick: self.max_datagrams_per_tick.max(1),
            stream_idle: Duration::from_millis(self.stream_idle_ms),
        }
    }

    pub fn udp_source_config(&self) -> UdpSourceConfig {
        UdpSourceConfig {
            bind_address: self.bind_address,
            port: self.port,
            multicast_interface: self.multicast_interface,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", .path.display())]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[source] serde_json::Error),
}
