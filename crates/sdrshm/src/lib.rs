//! Cross-process streaming substrate for SDR IQ samples.
//!
//! Three entry points — [`start_rx`], [`start_tx`], [`start_duplex`] —
//! each build or open a ring, launch the external hardware-owning process
//! (see `sdrshm_supervisor`), spawn one or two background threads that
//! drive it (see `rx`/`tx`/`duplex`), and hand back bounded channels of
//! chunks, stats, and out-of-band warnings. [`bridge`] repackages an RX
//! chunk stream into the shape a downstream signal-channel consumer
//! expects.

mod bridge;
mod duplex;
mod pool;
mod rx;
mod tx;

pub use bridge::bridge;
pub use duplex::start_duplex;
pub use pool::PooledChunk;
pub use rx::start_rx;
pub use tx::start_tx;

pub use sdrshm_config::{AgcMode, DuplexParams, RxParams, TxParams};
pub use sdrshm_core::{Chunk, Sample, StreamError, TxChunk, TxStats, Warning, WarningKind};
pub use sdrshm_ring::{delete_ring, read_stats, RingStats};

pub(crate) fn default_log_path(role: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("sdrshm-{role}-{}.log", std::process::id()))
}
