//! RX task: drains the producer ring into a bounded output channel.

use crate::pool::{ChunkPool, PooledChunk};
use crossbeam_channel::{bounded, Receiver, Sender};
use sdrshm_config::RxParams;
use sdrshm_core::{read_sample_le, try_send, StreamError, Warning, WarningKind};
use sdrshm_ring::RingReader;
use sdrshm_supervisor::{clear_stale_ring, wait_for_ring_reader, ExternalProcessSpec, ProcessHandle};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

const SPIN_BACKOFF: Duration = Duration::from_millis(1);

/// Why the RX hot loop stopped.
#[derive(Debug)]
pub(crate) enum RxExitReason {
    WriterDone,
    PipeClosed,
    ProcessExited(ExitStatus),
}

/// Builds or opens the RX ring, launches the external process, and spawns
/// the background task. Returns the chunk and warning streams immediately;
/// a synchronous error means no thread was spawned and no resources are
/// held.
pub fn start_rx(
    channels: u16,
    params: RxParams,
) -> Result<(Receiver<PooledChunk>, Receiver<Warning>), StreamError> {
    clear_stale_ring(&params.ring_path)?;

    let spec = ExternalProcessSpec::for_rx(channels, &params);
    let log_path = crate::default_log_path("rx");
    let mut handle = ProcessHandle::spawn(&spec, &log_path)?;

    let reader = match wait_for_ring_reader(&params.ring_path, channels, &mut handle) {
        Ok(reader) => reader,
        Err(err) => {
            sdrshm_supervisor::cleanup(handle, &[&params.ring_path]);
            return Err(err);
        }
    };

    let (chunk_tx, chunk_rx) = bounded(params.chunk_channel_capacity);
    let (warn_tx, warn_rx) = bounded(params.warning_channel_capacity);
    let pool_capacity = params.chunk_channel_capacity + 2;

    let ring_path = params.ring_path.clone();
    std::thread::spawn(move || {
        let mut handle = handle;
        let (reason, reader) = run_rx_loop(reader, channels as usize, pool_capacity, &chunk_tx, &warn_tx, &mut || {
            handle.try_wait().ok().flatten()
        });
        report_exit(&reason, &warn_tx);
        drop(chunk_tx);
        let _ = reader.sync_and_unmap();
        sdrshm_supervisor::cleanup(handle, &[&ring_path]);
    });

    Ok((chunk_rx, warn_rx))
}

/// The hot loop itself, decoupled from how liveness of the external process
/// is checked — `is_exited` is a plain ownership-free probe so this same
/// loop body serves both the standalone RX task and the RX half of a
/// duplex session, which shares its process handle with the TX half.
pub(crate) fn run_rx_loop(
    reader: RingReader,
    channels: usize,
    pool_capacity: usize,
    chunk_tx: &Sender<PooledChunk>,
    warn_tx: &Sender<Warning>,
    is_exited: &mut dyn FnMut() -> Option<ExitStatus>,
) -> (RxExitReason, RingReader) {
    let chunk_size = reader.chunk_size() as usize;
    let pool = ChunkPool::new(pool_capacity, channels, chunk_size);
    let mut last_error_count = reader.error_count();
    let started = Instant::now();

    loop {
        let error_count = reader.error_count();
        if error_count > last_error_count {
            try_send(
                warn_tx,
                Warning::new(WarningKind::Overflow, elapsed_label(started))
                    .with_detail(format!("error_count advanced to {error_count}")),
            );
            last_error_count = error_count;
        }

        if reader.can_read() {
            let read_index = reader.load_read_index_relaxed();
            let slot = reader.slot(read_index);
            let chunk = pool.fill_and_take(|c| {
                for s in 0..chunk_size {
                    for ch in 0..channels {
                        c[[ch, s]] = read_sample_le(slot, s * channels + ch);
                    }
                }
            });
            if chunk_tx.send(chunk).is_err() {
                return (RxExitReason::PipeClosed, reader);
            }
            reader.store_read_index_release(read_index + 1);
            continue;
        }

        if reader.writer_done() {
            return (RxExitReason::WriterDone, reader);
        }

        if let Some(status) = is_exited() {
            return (RxExitReason::ProcessExited(status), reader);
        }

        std::thread::sleep(SPIN_BACKOFF);
    }
}

pub(crate) fn report_exit(reason: &RxExitReason, warn_tx: &Sender<Warning>) {
    match reason {
        RxExitReason::WriterDone | RxExitReason::PipeClosed => {}
        RxExitReason::ProcessExited(status) if status.success() => {
            try_send(
                warn_tx,
                Warning::new(WarningKind::Notice, "0")
                    .with_detail("external process exited cleanly without writer_done"),
            );
        }
        RxExitReason::ProcessExited(status) => {
            try_send(
                warn_tx,
                Warning::new(WarningKind::Error, "0")
                    .with_detail(format!("external process exited with status {status}")),
            );
        }
    }
}

fn elapsed_label(started: Instant) -> String {
    format!("{:.3}", started.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdrshm_core::{write_sample_le, Sample};
    use sdrshm_ring::RingWriter;
    use tempfile::NamedTempFile;

    fn scratch_path() -> std::path::PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        std::fs::remove_file(&path).ok();
        path
    }

    /// `c_0 = 1`, `c_{n+1} = (c_n mod 32000) + 1`: counts up from 1,
    /// wrapping back to 1 after 32000.
    fn next_counter(c: i16) -> i16 {
        (c % 32000) + 1
    }

    #[test]
    fn scenario_1_rx_single_channel_counter_sequence() {
        let path = scratch_path();
        let chunk_size = 256usize;
        let num_chunks = 10usize;
        let mut writer = RingWriter::create(&path, chunk_size as u32, 16, 1).unwrap();
        let reader = RingReader::open(&path).unwrap();

        let producer = std::thread::spawn(move || {
            let mut counter: i16 = 1;
            for _ in 0..num_chunks {
                while !writer.can_write() {
                    std::thread::sleep(SPIN_BACKOFF);
                }
                let write_index = writer.load_write_index_relaxed();
                let slot = writer.slot_mut(write_index);
                for s in 0..chunk_size {
                    write_sample_le(slot, s, Sample::new(counter, counter));
                    counter = next_counter(counter);
                }
                writer.store_write_index_release(write_index + 1);
            }
            writer.set_writer_done();
            writer.sync_and_unmap().unwrap();
        });

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(num_chunks + 2);
        let (warn_tx, warn_rx) = crossbeam_channel::bounded(16);
        let (reason, reader) = run_rx_loop(reader, 1, num_chunks + 2, &chunk_tx, &warn_tx, &mut || None);
        drop(chunk_tx);
        producer.join().unwrap();
        reader.sync_and_unmap().unwrap();
        sdrshm_ring::delete_ring(&path).unwrap();

        assert!(matches!(reason, RxExitReason::WriterDone));

        let mut expected: i16 = 1;
        let mut chunks_seen = 0;
        for chunk in chunk_rx.try_iter() {
            assert_eq!(chunk.dim(), (1, chunk_size));
            for s in 0..chunk_size {
                assert_eq!(chunk[[0, s]], Sample::new(expected, expected));
                expected = next_counter(expected);
            }
            chunks_seen += 1;
        }
        assert_eq!(chunks_seen, num_chunks);
        assert!(warn_rx.try_iter().next().is_none());
    }

    #[test]
    fn scenario_2_rx_dual_channel_counter_sequence() {
        let path = scratch_path();
        let chunk_size = 128usize;
        let num_chunks = 5usize;
        let channels = 2usize;
        let mut writer = RingWriter::create(&path, chunk_size as u32, 16, channels as u16).unwrap();
        let reader = RingReader::open(&path).unwrap();

        let producer = std::thread::spawn(move || {
            let mut counter: i16 = 1;
            for _ in 0..num_chunks {
                while !writer.can_write() {
                    std::thread::sleep(SPIN_BACKOFF);
                }
                let write_index = writer.load_write_index_relaxed();
                let slot = writer.slot_mut(write_index);
                for s in 0..chunk_size {
                    for c in 0..channels {
                        write_sample_le(slot, s * channels + c, Sample::new(counter, counter));
                        counter = next_counter(counter);
                    }
                }
                writer.store_write_index_release(write_index + 1);
            }
            writer.set_writer_done();
            writer.sync_and_unmap().unwrap();
        });

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(num_chunks + 2);
        let (warn_tx, warn_rx) = crossbeam_channel::bounded(16);
        let (reason, reader) = run_rx_loop(reader, channels, num_chunks + 2, &chunk_tx, &warn_tx, &mut || None);
        drop(chunk_tx);
        producer.join().unwrap();
        reader.sync_and_unmap().unwrap();
        sdrshm_ring::delete_ring(&path).unwrap();

        assert!(matches!(reason, RxExitReason::WriterDone));

        let mut expected: i16 = 1;
        let mut chunks_seen = 0;
        for chunk in chunk_rx.try_iter() {
            assert_eq!(chunk.dim(), (channels, chunk_size));
            for s in 0..chunk_size {
                for c in 0..channels {
                    assert_eq!(chunk[[c, s]], Sample::new(expected, expected));
                    expected = next_counter(expected);
                }
            }
            chunks_seen += 1;
        }
        assert_eq!(chunks_seen, num_chunks);
        assert!(warn_rx.try_iter().next().is_none());
    }
}
