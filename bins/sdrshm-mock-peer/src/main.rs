//! Mock external streaming process.
//!
//! Stands in for the real hardware/DMA binary in tests: it speaks the ring
//! protocol directly (no SDR, no DMA engine) so integration tests can drive
//! `sdrshm`'s supervisor, RX/TX tasks, and duplex coordination against a
//! real second OS process without any hardware.
//!
//! The wire protocol's flags are single-dash, multi-character
//! (`-rx_freq`, `-shm_path`, ...) — the exact shape `sdrshm_supervisor`'s
//! invocation composer emits. Clap's long-option parser only ever produces
//! a `--` prefix, so rather than fighting it into a non-standard shape this
//! binary reads `std::env::args()` directly, in the style of the reference
//! pack's other hand-rolled CLI entry points (see DESIGN.md).

use sdrshm_core::{read_sample_le, write_sample_le, Sample, RING_CHUNK_SIZE};
use sdrshm_ring::{num_slots_for_buffer_time, RingReader, RingWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct Args {
    samplerate_hz: f64,
    rx_freq: Option<f64>,
    tx_freq: Option<f64>,
    channels: u16,
    shm_path: Option<PathBuf>,
    rx_shm_path: Option<PathBuf>,
    tx_shm_path: Option<PathBuf>,
    buffer_time_s: f64,
    rx_buffer_time_s: Option<f64>,
    tx_buffer_time_s: Option<f64>,
    num_samples: u64,
    quiet: bool,
    wait_for_peer: bool,
}

fn parse_args() -> Args {
    let mut args = Args { samplerate_hz: 40_000_000.0, buffer_time_s: 3.0, ..Args::default() };
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < raw.len() {
        let flag = raw[i].clone();
        let takes_value = !matches!(flag.as_str(), "-q" | "-w");
        let value = if takes_value {
            i += 1;
            raw.get(i).cloned().unwrap_or_else(|| panic!("missing value for {flag}"))
        } else {
            String::new()
        };
        match flag.as_str() {
            "-c" | "-rx_gain" | "-tx_gain" | "-agc_mode" | "-bandwidth" => {}
            "-samplerate" => args.samplerate_hz = value.parse().expect("invalid -samplerate"),
            "-rx_freq" => args.rx_freq = Some(value.parse().expect("invalid -rx_freq")),
            "-tx_freq" => args.tx_freq = Some(value.parse().expect("invalid -tx_freq")),
            "-channels" => args.channels = value.parse().expect("invalid -channels"),
            "-shm_path" => args.shm_path = Some(PathBuf::from(value)),
            "-rx_shm_path" => args.rx_shm_path = Some(PathBuf::from(value)),
            "-tx_shm_path" => args.tx_shm_path = Some(PathBuf::from(value)),
            "-buffer_time" => args.buffer_time_s = value.parse().expect("invalid -buffer_time"),
            "-rx_buffer_time" => args.rx_buffer_time_s = Some(value.parse().expect("invalid -rx_buffer_time")),
            "-tx_buffer_time" => args.tx_buffer_time_s = Some(value.parse().expect("invalid -tx_buffer_time")),
            "-num_samples" => args.num_samples = value.parse().expect("invalid -num_samples"),
            "-q" => args.quiet = true,
            "-w" => args.wait_for_peer = true,
            other => panic!("unrecognized flag: {other}"),
        }
        i += 1;
    }
    args
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args();

    match (&args.rx_shm_path, &args.tx_shm_path) {
        (Some(rx_path), Some(tx_path)) => run_duplex(&args, rx_path, tx_path),
        _ => {
            let path = args.shm_path.clone().expect("-shm_path is required outside duplex mode");
            match (args.rx_freq, args.tx_freq) {
                (Some(_), None) => run_rx_producer(&args, &path, args.buffer_time_s),
                (None, Some(_)) => run_tx_consumer(&args, &path),
                _ => panic!("exactly one of -rx_freq / -tx_freq is required outside duplex mode"),
            }
        }
    }
}

/// Acts as the RX producer: creates the ring, fills it with a deterministic
/// counter sequence (`c_0 = 1`, `c_{n+1} = (c_n mod 32000) + 1`, advanced
/// once per `(sample, channel)` pair in channel-major-within-sample order),
/// and sets `writer_done` once `-num_samples` total samples per channel
/// have been published (0 means run until killed).
fn run_rx_producer(args: &Args, path: &Path, buffer_time_s: f64) {
    let chunk_size = RING_CHUNK_SIZE;
    let num_slots = num_slots_for_buffer_time(buffer_time_s, args.samplerate_hz, chunk_size);
    let mut writer = RingWriter::create(path, chunk_size, num_slots, args.channels)
        .expect("mock peer: failed to create RX ring");
    if !args.quiet {
        tracing::info!(path = %path.display(), num_slots, channels = args.channels, "mock peer: RX ring created");
    }

    let total_chunks = if args.num_samples == 0 { None } else { Some(args.num_samples.div_ceil(chunk_size as u64)) };
    let mut counter: i16 = 1;
    let mut chunks_written: u64 = 0;

    loop {
        if let Some(limit) = total_chunks {
            if chunks_written >= limit {
                break;
            }
        }
        while !writer.can_write() {
            std::thread::sleep(POLL_INTERVAL);
        }
        let write_index = writer.load_write_index_relaxed();
        let slot = writer.slot_mut(write_index);
        for s in 0..chunk_size as usize {
            for c in 0..args.channels as usize {
                write_sample_le(slot, s * args.channels as usize + c, Sample::new(counter, counter));
                counter = (counter % 32000) + 1;
            }
        }
        writer.store_write_index_release(write_index + 1);
        chunks_written += 1;
    }

    writer.set_writer_done();
    if !args.quiet {
        tracing::info!(chunks_written, "mock peer: RX producer done, writer_done set");
    }
    writer.sync_and_unmap().expect("mock peer: failed to flush RX ring");
}

/// Acts as the TX consumer: opens the host-created ring, drains it as
/// slots become available, and exits cleanly once the host has set
/// `writer_done` and every published slot has been consumed.
fn run_tx_consumer(args: &Args, path: &Path) {
    let reader = open_ring_with_retry(path, args.channels);
    let mut consumed: u64 = 0;

    loop {
        if reader.can_read() {
            let read_index = reader.load_read_index_relaxed();
            let slot = reader.slot(read_index);
            // Touch every sample so the consumer genuinely observes the
            // published bytes (a real DMA engine would read them out here).
            for s in 0..reader.chunk_size() as usize {
                for c in 0..args.channels as usize {
                    std::hint::black_box(read_sample_le(slot, s * args.channels as usize + c));
                }
            }
            reader.store_read_index_release(read_index + 1);
            consumed += 1;
            continue;
        }
        if reader.writer_done() {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    if !args.quiet {
        tracing::info!(consumed, "mock peer: TX consumer drained, exiting cleanly");
    }
    let _ = reader.sync_and_unmap();
}

/// Duplex mode: this one process is simultaneously the RX producer and the
/// TX consumer, matching the real hardware's role in a full-duplex session.
/// The host has already created the TX ring before spawning this process
/// (the `-w` flag is this protocol's "wait for it" switch), so the TX side
/// is opened with the same bounded retry as a standalone consumer; the RX
/// ring is created fresh, as in simplex RX mode.
fn run_duplex(args: &Args, rx_path: &Path, tx_path: &Path) {
    debug_assert!(args.wait_for_peer, "the supervisor always passes -w for duplex sessions");
    let tx_args = Args { channels: args.channels, quiet: args.quiet, ..Args::default() };
    let tx_path = tx_path.to_path_buf();
    let tx_thread = std::thread::spawn(move || run_tx_consumer(&tx_args, &tx_path));

    let buffer_time_s = args.rx_buffer_time_s.unwrap_or(args.buffer_time_s);
    run_rx_producer(args, rx_path, buffer_time_s);

    // The TX side only returns once the host sets writer_done on the TX
    // ring; in a real duplex session that happens only at shutdown, so the
    // host terminates this process (kill) well before the join below would
    // matter outside of tests that close both sides deliberately.
    let _ = tx_thread.join();
}

fn open_ring_with_retry(path: &Path, expected_channels: u16) -> RingReader {
    let deadline = Instant::now() + OPEN_TIMEOUT;
    loop {
        match RingReader::open(path) {
            Ok(reader) => {
                assert_eq!(
                    reader.num_channels(),
                    expected_channels,
                    "mock peer: ring channel count mismatch"
                );
                return reader;
            }
            Err(err) if Instant::now() < deadline => {
                tracing::trace!(%err, "mock peer: ring not ready yet, retrying");
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => panic!("mock peer: timed out opening ring at {}: {err}", path.display()),
        }
    }
}
