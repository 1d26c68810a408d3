//! Composes the external process's command line from typed parameters.
//!
//! The external binary name defaults to [`DEFAULT_EXE_NAME`] resolved
//! against `PATH`; `RxParams::invocation_override` /
//! `TxParams::invocation_override` let a caller (tests, mainly) point at a
//! different executable — such as `sdrshm-mock-peer` — while keeping the
//! same flag composition.

use sdrshm_config::{AgcMode, RxParams, TxParams};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_EXE_NAME: &str = "sdr-shm-peer";

/// A fully composed invocation: which executable, with which arguments.
/// Kept as data (rather than building a `Command` directly) so tests can
/// assert on the flag list without spawning anything.
#[derive(Debug, Clone)]
pub struct ExternalProcessSpec {
    pub exe: PathBuf,
    pub args: Vec<String>,
}

impl ExternalProcessSpec {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.args(&self.args);
        cmd
    }

    pub fn for_rx(channels: u16, params: &RxParams) -> Self {
        let mut args = Vec::new();
        push(&mut args, "-c", params.device_index);
        push(&mut args, "-samplerate", params.sample_rate_hz as i64);
        push(&mut args, "-rx_freq", params.frequency_hz as i64);
        push(&mut args, "-rx_gain", params.gain_db);
        push_str(&mut args, "-agc_mode", params.agc_mode.as_token());
        push(&mut args, "-bandwidth", params.bandwidth_hz() as i64);
        push(&mut args, "-channels", channels);
        push_path(&mut args, "-shm_path", &params.ring_path);
        push(&mut args, "-buffer_time", params.buffer_time_s);
        push(&mut args, "-num_samples", params.sample_cap);
        if params.quiet {
            args.push("-q".to_string());
        }
        Self { exe: exe_path(&params.invocation_override), args }
    }

    pub fn for_tx(channels: u16, params: &TxParams) -> Self {
        let mut args = Vec::new();
        push(&mut args, "-c", params.device_index);
        push(&mut args, "-samplerate", params.sample_rate_hz as i64);
        push(&mut args, "-tx_freq", params.frequency_hz as i64);
        push(&mut args, "-tx_gain", params.gain_db);
        push(&mut args, "-bandwidth", params.bandwidth_hz() as i64);
        push(&mut args, "-channels", channels);
        push_path(&mut args, "-shm_path", &params.ring_path);
        push(&mut args, "-buffer_time", params.buffer_time_s);
        if params.quiet {
            args.push("-q".to_string());
        }
        Self { exe: exe_path(&params.invocation_override), args }
    }

    /// One process serves both rings; the device clock and AGC settings are
    /// taken from the RX side (this system has no duplex flags for a second
    /// bandwidth/AGC, so the RX values govern — see DESIGN.md).
    pub fn for_duplex(channels: u16, rx: &RxParams, tx: &TxParams) -> Self {
        let mut args = Vec::new();
        push(&mut args, "-c", rx.device_index);
        push(&mut args, "-samplerate", rx.sample_rate_hz as i64);
        push(&mut args, "-rx_freq", rx.frequency_hz as i64);
        push(&mut args, "-tx_freq", tx.frequency_hz as i64);
        push(&mut args, "-rx_gain", rx.gain_db);
        push(&mut args, "-tx_gain", tx.gain_db);
        push_str(&mut args, "-agc_mode", rx.agc_mode.as_token());
        push(&mut args, "-bandwidth", rx.bandwidth_hz() as i64);
        push(&mut args, "-channels", channels);
        push_path(&mut args, "-rx_shm_path", &rx.ring_path);
        push_path(&mut args, "-tx_shm_path", &tx.ring_path);
        push(&mut args, "-rx_buffer_time", rx.buffer_time_s);
        push(&mut args, "-tx_buffer_time", tx.buffer_time_s);
        push(&mut args, "-num_samples", rx.sample_cap);
        if rx.quiet || tx.quiet {
            args.push("-q".to_string());
        }
        args.push("-w".to_string());
        Self { exe: exe_path(&rx.invocation_override), args }
    }
}

fn exe_path(override_path: &Option<PathBuf>) -> PathBuf {
    override_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_EXE_NAME))
}

fn push(args: &mut Vec<String>, flag: &str, value: impl ToString) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

fn push_str(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

fn push_path(args: &mut Vec<String>, flag: &str, value: &Path) {
    args.push(flag.to_string());
    args.push(value.to_string_lossy().into_owned());
}
