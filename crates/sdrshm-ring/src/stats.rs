//! Read-only diagnostics and idempotent cleanup on a ring file path, without
//! taking on a writer or reader role.

use crate::shm_layout::{RingHeader, WRITER_DONE_BIT};
use sdrshm_core::RingError;
use sdrshm_mmap::MmapFile;
use std::path::Path;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingStats {
    pub write_index: u64,
    pub read_index: u64,
    pub error_count: u64,
    pub writer_done: bool,
}

pub fn read_stats<P: AsRef<Path>>(path: P) -> Result<RingStats, RingError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RingError::Absent(path.to_path_buf()));
    }
    let mm = MmapFile::open_ro(path)?;
    let h = unsafe { &*(mm.as_ptr() as *const RingHeader) };
    Ok(RingStats {
        write_index: h.write_index.load(Ordering::Relaxed),
        read_index: h.read_index.load(Ordering::Relaxed),
        error_count: h.error_count.load(Ordering::Relaxed),
        writer_done: h.flags.load(Ordering::Relaxed) & WRITER_DONE_BIT != 0,
    })
}

/// A no-op on an absent path: starting a new session always deletes any
/// stale ring file first, and a previous clean shutdown may have already
/// removed it.
pub fn delete_ring<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
