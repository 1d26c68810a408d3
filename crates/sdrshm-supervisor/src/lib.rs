//! Owns the external hardware-owning process for the lifetime of a
//! streaming session: composes its invocation, spawns it with output
//! redirected to a log file, polls for the ring(s) it creates to become
//! usable, and tears everything down in a fixed order on any terminal
//! event.

mod invocation;
mod process;

pub use invocation::{ExternalProcessSpec, DEFAULT_EXE_NAME};
pub use process::{
    cleanup, clear_stale_ring, wait_for_ring_reader, ProcessHandle, WRITER_DONE_DRAIN_DELAY,
};
