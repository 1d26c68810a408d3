//! Full-duplex coordination: one external process acting as both the RX
//! producer and the TX consumer, driven by two independent tasks sharing a
//! warnings channel and a process handle.

use crate::pool::PooledChunk;
use crate::rx;
use crate::tx;
use crossbeam_channel::{bounded, Receiver};
use sdrshm_config::DuplexParams;
use sdrshm_core::{StreamError, TxChunk, TxStats, Warning};
use sdrshm_supervisor::{clear_stale_ring, wait_for_ring_reader, ExternalProcessSpec, ProcessHandle};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared ownership of the one subprocess backing both the RX and TX
/// tasks. Either task may observe it has exited; only the last task to
/// finish its own loop actually sends the kill signal, matching the
/// "idempotent, either side may call it" guidance for duplex teardown.
struct SharedProcess {
    handle: Mutex<ProcessHandle>,
    tasks_remaining: AtomicUsize,
}

impl SharedProcess {
    fn new(handle: ProcessHandle) -> Arc<Self> {
        Arc::new(Self { handle: Mutex::new(handle), tasks_remaining: AtomicUsize::new(2) })
    }

    fn try_wait(&self) -> Option<ExitStatus> {
        self.handle.lock().unwrap().try_wait().ok().flatten()
    }

    fn task_finished(&self) {
        if self.tasks_remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.handle.lock().unwrap().terminate();
        }
    }
}

/// Creates the TX ring, spawns the external process wired for both rings,
/// waits for it to create the RX ring, then spawns the RX and TX tasks.
pub fn start_duplex(
    channels: u16,
    tx_input: Receiver<TxChunk>,
    params: DuplexParams,
) -> Result<(Receiver<PooledChunk>, Receiver<TxStats>, Receiver<Warning>), StreamError> {
    clear_stale_ring(&params.rx.ring_path)?;

    let tx_writer = tx::create_tx_ring(&params.tx, channels)?;

    let spec = ExternalProcessSpec::for_duplex(channels, &params.rx, &params.tx);
    let log_path = crate::default_log_path("duplex");
    let mut handle = ProcessHandle::spawn(&spec, &log_path)?;

    let rx_reader = match wait_for_ring_reader(&params.rx.ring_path, channels, &mut handle) {
        Ok(reader) => reader,
        Err(err) => {
            let _ = tx_writer.sync_and_unmap();
            sdrshm_supervisor::cleanup(handle, &[&params.rx.ring_path, &params.tx.ring_path]);
            return Err(err);
        }
    };

    let (chunk_tx, chunk_rx) = bounded(params.rx.chunk_channel_capacity);
    let (stats_tx, stats_rx) = bounded(params.tx.stats_channel_capacity);
    let (warn_tx, warn_rx) = bounded(params.warning_channel_capacity);
    let rx_pool_capacity = params.rx.chunk_channel_capacity + 2;

    let shared = SharedProcess::new(handle);

    let rx_ring_path = params.rx.ring_path.clone();
    let rx_warn_tx = warn_tx.clone();
    let rx_shared = shared.clone();
    std::thread::spawn(move || {
        let (reason, reader) = rx::run_rx_loop(rx_reader, channels as usize, rx_pool_capacity, &chunk_tx, &rx_warn_tx, &mut || {
            rx_shared.try_wait()
        });
        rx::report_exit(&reason, &rx_warn_tx);
        drop(chunk_tx);
        let _ = reader.sync_and_unmap();
        let _ = sdrshm_ring::delete_ring(&rx_ring_path);
        rx_shared.task_finished();
    });

    let tx_ring_path = params.tx.ring_path.clone();
    let tx_shared = shared.clone();
    std::thread::spawn(move || {
        let (_reason, writer) = tx::run_tx_loop(tx_writer, channels as usize, tx_input, &stats_tx, &warn_tx, &mut || {
            tx_shared.try_wait()
        });
        drop(stats_tx);
        let _ = writer.sync_and_unmap();
        let _ = sdrshm_ring::delete_ring(&tx_ring_path);
        tx_shared.task_finished();
    });

    Ok((chunk_rx, stats_rx, warn_rx))
}
