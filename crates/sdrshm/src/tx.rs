//! TX task: drains an input channel of chunks into the consumer ring.

use crossbeam_channel::{bounded, Receiver, Sender};
use sdrshm_config::TxParams;
use sdrshm_core::write_sample_le;
use sdrshm_core::{try_send, StreamError, TxChunk, TxStats, Warning, WarningKind, RING_CHUNK_SIZE};
use sdrshm_ring::{num_slots_for_buffer_time, RingWriter};
use sdrshm_supervisor::{clear_stale_ring, ExternalProcessSpec, ProcessHandle, WRITER_DONE_DRAIN_DELAY};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

const SPIN_BACKOFF: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub(crate) enum TxExitReason {
    Drained,
    ProcessExited,
}

/// Builds the TX ring itself (host is the producer here), launches the
/// external process as its consumer, and spawns the background task.
pub fn start_tx(
    input: Receiver<TxChunk>,
    channels: u16,
    params: TxParams,
) -> Result<(Receiver<TxStats>, Receiver<Warning>), StreamError> {
    clear_stale_ring(&params.ring_path)?;
    let writer = create_tx_ring(&params, channels)?;

    let spec = ExternalProcessSpec::for_tx(channels, &params);
    let log_path = crate::default_log_path("tx");
    let mut handle = ProcessHandle::spawn(&spec, &log_path)?;

    let (stats_tx, stats_rx) = bounded(params.stats_channel_capacity);
    let (warn_tx, warn_rx) = bounded(params.warning_channel_capacity);

    let ring_path = params.ring_path.clone();
    std::thread::spawn(move || {
        let mut handle = handle;
        let (_reason, writer) = run_tx_loop(writer, channels as usize, input, &stats_tx, &warn_tx, &mut || {
            handle.try_wait().ok().flatten()
        });
        drop(stats_tx);
        let _ = writer.sync_and_unmap();
        sdrshm_supervisor::cleanup(handle, &[&ring_path]);
    });

    Ok((stats_rx, warn_rx))
}

/// Creates the TX ring with a slot count that covers roughly
/// `buffer_time_s` at `sample_rate_hz`, using the protocol's fixed slot
/// geometry (see [`RING_CHUNK_SIZE`]).
pub(crate) fn create_tx_ring(params: &TxParams, channels: u16) -> Result<RingWriter, StreamError> {
    let num_slots = num_slots_for_buffer_time(params.buffer_time_s, params.sample_rate_hz, RING_CHUNK_SIZE);
    Ok(RingWriter::create(&params.ring_path, RING_CHUNK_SIZE, num_slots, channels)?)
}

pub(crate) fn run_tx_loop(
    mut writer: RingWriter,
    channels: usize,
    input: Receiver<TxChunk>,
    stats_tx: &Sender<TxStats>,
    warn_tx: &Sender<Warning>,
    is_exited: &mut dyn FnMut() -> Option<ExitStatus>,
) -> (TxExitReason, RingWriter) {
    let mut last_error_count = writer.error_count();
    let mut last_stall_count = writer.buffer_stall_count();
    let mut total_samples: u64 = 0;
    let started = Instant::now();

    for chunk in input.iter() {
        let error_count = writer.error_count();
        if error_count > last_error_count {
            try_send(
                warn_tx,
                Warning::new(WarningKind::Underflow, sample_time_label(started))
                    .with_detail(format!("error_count advanced to {error_count}")),
            );
            last_error_count = error_count;
        }
        let stall_count = writer.buffer_stall_count();
        if stall_count > last_stall_count {
            try_send(
                warn_tx,
                Warning::new(WarningKind::BufferEmpty, sample_time_label(started))
                    .with_detail(format!("{} new stall event(s)", stall_count - last_stall_count)),
            );
            last_stall_count = stall_count;
        }

        loop {
            if writer.can_write() {
                break;
            }
            if is_exited().is_some() {
                try_send(
                    warn_tx,
                    Warning::new(WarningKind::Error, sample_time_label(started))
                        .with_detail("external process exited while waiting for free slot"),
                );
                return (TxExitReason::ProcessExited, writer);
            }
            std::thread::sleep(SPIN_BACKOFF);
        }

        let write_index = writer.load_write_index_relaxed();
        let chunk_size = chunk.samples_per_channel();
        let ring_chunk_size = writer.chunk_size() as usize;
        let copy_len = chunk_size.min(ring_chunk_size);
        if chunk_size != ring_chunk_size {
            tracing::warn!(
                chunk_size,
                ring_chunk_size,
                "tx input chunk size does not match ring slot geometry; truncating/zero-padding to keep the slot fully initialized"
            );
        }
        let slot = writer.slot_mut(write_index);
        match &chunk {
            TxChunk::Complex(a) => {
                for s in 0..copy_len {
                    for c in 0..channels {
                        write_sample_le(slot, s * channels + c, a[[s, c]]);
                    }
                }
            }
            TxChunk::Real(a) => {
                for s in 0..copy_len {
                    for c in 0..channels {
                        let sample = num_complex::Complex::new(a[[s, c]], 0);
                        write_sample_le(slot, s * channels + c, sample);
                    }
                }
            }
        }
        for s in copy_len..ring_chunk_size {
            for c in 0..channels {
                write_sample_le(slot, s * channels + c, num_complex::Complex::new(0, 0));
            }
        }
        writer.store_write_index_release(write_index + 1);

        total_samples += chunk_size as u64;
        try_send(stats_tx, TxStats { total_samples });
    }

    writer.set_writer_done();
    std::thread::sleep(WRITER_DONE_DRAIN_DELAY);
    (TxExitReason::Drained, writer)
}

fn sample_time_label(started: Instant) -> String {
    format!("{:.3}", started.elapsed().as_secs_f64())
}
