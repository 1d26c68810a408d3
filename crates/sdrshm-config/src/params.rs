use crate::agc::AgcMode;
use crate::loader::{load_toml, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_sample_rate_hz() -> f64 {
    40_000_000.0
}

fn default_frequency_hz() -> f64 {
    5_000_000_000.0
}

fn default_buffer_time_s() -> f64 {
    3.0
}

fn default_chunk_channel_capacity() -> usize {
    100
}

fn default_warning_channel_capacity() -> usize {
    16
}

fn default_stats_channel_capacity() -> usize {
    1000
}

fn default_rx_ring_path() -> PathBuf {
    PathBuf::from("/dev/shm/sdrshm_rx")
}

fn default_tx_ring_path() -> PathBuf {
    PathBuf::from("/dev/shm/sdrshm_tx")
}

/// Parameters for [`start_rx`](../sdrshm/fn.start_rx.html). All fields have
/// the defaults documented in the public API surface; construct with
/// `RxParams::default()` and override only what differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RxParams {
    pub sample_rate_hz: f64,
    pub frequency_hz: f64,
    pub gain_db: i32,
    pub agc_mode: AgcMode,
    /// `None` means "equal to `sample_rate_hz`", per the documented default.
    pub bandwidth_hz: Option<f64>,
    pub buffer_time_s: f64,
    /// `0` means unbounded.
    pub sample_cap: u64,
    pub ring_path: PathBuf,
    pub device_index: u32,
    pub chunk_channel_capacity: usize,
    pub warning_channel_capacity: usize,
    pub quiet: bool,
    /// Substitute binary for the external process invocation. Not
    /// serialized — this is a testing hook (point it at
    /// `sdrshm-mock-peer`), not a deployable config value.
    #[serde(skip)]
    pub invocation_override: Option<PathBuf>,
}

impl Default for RxParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            frequency_hz: default_frequency_hz(),
            gain_db: 20,
            agc_mode: AgcMode::default(),
            bandwidth_hz: None,
            buffer_time_s: default_buffer_time_s(),
            sample_cap: 0,
            ring_path: default_rx_ring_path(),
            device_index: 0,
            chunk_channel_capacity: default_chunk_channel_capacity(),
            warning_channel_capacity: default_warning_channel_capacity(),
            quiet: false,
            invocation_override: None,
        }
    }
}

impl RxParams {
    pub fn bandwidth_hz(&self) -> f64 {
        self.bandwidth_hz.unwrap_or(self.sample_rate_hz)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_toml(path)
    }
}

/// Parameters for [`start_tx`](../sdrshm/fn.start_tx.html).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TxParams {
    pub sample_rate_hz: f64,
    pub frequency_hz: f64,
    pub gain_db: i32,
    pub bandwidth_hz: Option<f64>,
    pub buffer_time_s: f64,
    pub ring_path: PathBuf,
    pub device_index: u32,
    pub quiet: bool,
    pub warning_channel_capacity: usize,
    pub stats_channel_capacity: usize,
    #[serde(skip)]
    pub invocation_override: Option<PathBuf>,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            frequency_hz: default_frequency_hz(),
            gain_db: -10,
            bandwidth_hz: None,
            buffer_time_s: default_buffer_time_s(),
            ring_path: default_tx_ring_path(),
            device_index: 0,
            quiet: false,
            warning_channel_capacity: default_warning_channel_capacity(),
            stats_channel_capacity: default_stats_channel_capacity(),
            invocation_override: None,
        }
    }
}

impl TxParams {
    pub fn bandwidth_hz(&self) -> f64 {
        self.bandwidth_hz.unwrap_or(self.sample_rate_hz)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_toml(path)
    }
}

/// Parameters for [`start_duplex`](../sdrshm/fn.start_duplex.html): one RX
/// parameter set, one TX parameter set, each with its own ring path and
/// buffer time, sharing a single warnings channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplexParams {
    pub rx: RxParams,
    pub tx: TxParams,
    pub warning_channel_capacity: usize,
}

impl Default for DuplexParams {
    fn default() -> Self {
        Self {
            rx: RxParams::default(),
            tx: TxParams::default(),
            warning_channel_capacity: default_warning_channel_capacity(),
        }
    }
}

impl DuplexParams {
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_toml(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rx_defaults_match_documented_values() {
        let p = RxParams::default();
        assert_eq!(p.sample_rate_hz, 40_000_000.0);
        assert_eq!(p.frequency_hz, 5_000_000_000.0);
        assert_eq!(p.gain_db, 20);
        assert_eq!(p.agc_mode, AgcMode::Manual);
        assert_eq!(p.bandwidth_hz(), p.sample_rate_hz);
        assert_eq!(p.buffer_time_s, 3.0);
        assert_eq!(p.sample_cap, 0);
        assert_eq!(p.chunk_channel_capacity, 100);
        assert_eq!(p.warning_channel_capacity, 16);
        assert!(!p.quiet);
    }

    #[test]
    fn tx_defaults_match_documented_values() {
        let p = TxParams::default();
        assert_eq!(p.gain_db, -10);
        assert_eq!(p.warning_channel_capacity, 16);
        assert_eq!(p.stats_channel_capacity, 1000);
    }

    #[test]
    fn rx_params_round_trip_through_toml() {
        let mut p = RxParams::default();
        p.gain_db = 5;
        p.ring_path = PathBuf::from("/dev/shm/test_rx");
        let text = toml::to_string(&p).unwrap();
        let back: RxParams = toml::from_str(&text).unwrap();
        assert_eq!(back.gain_db, 5);
        assert_eq!(back.ring_path, PathBuf::from("/dev/shm/test_rx"));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let back: RxParams = toml::from_str("gain_db = 3\n").unwrap();
        assert_eq!(back.gain_db, 3);
        assert_eq!(back.sample_rate_hz, 40_000_000.0);
    }
}
