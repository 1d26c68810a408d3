//! The single-producer/single-consumer ring: one [`RingWriter`], one
//! [`RingReader`], exactly one per ring file.
//!
//! `error_count` and `buffer_stall_count` are relaxed counters that whichever
//! side observes the anomaly increments (the external peer reports overflow/
//! underflow/stall conditions it has ground truth on); both handles expose
//! full read/write access to them, while `write_index`/`read_index` keep the
//! strict per-role acquire/release split the wire-ordering contract requires.
//! See DESIGN.md for why this crate doesn't split `error_count` access by
//! role the way `write_index` is split.

use crate::geometry::slot_offset;
use crate::shm_layout::{RingHeader, HEADER_SIZE, WRITER_DONE_BIT};
use sdrshm_core::RingError;
use sdrshm_mmap::MmapFileMut;
use std::path::Path;
use std::sync::atomic::Ordering;

const SAMPLE_SIZE: u32 = 4; // complex int16: 2 * i16

fn validate(chunk_size: u32, num_slots: u32, num_channels: u16, sample_size: u32, file_len: usize) -> Result<(), RingError> {
    if file_len < HEADER_SIZE {
        return Err(RingError::TooSmall { needed: HEADER_SIZE, found: file_len });
    }
    if chunk_size == 0 {
        return Err(RingError::Malformed { reason: "chunk_size is zero" });
    }
    if num_slots == 0 {
        return Err(RingError::Malformed { reason: "num_slots is zero" });
    }
    if !(num_channels == 1 || num_channels == 2) {
        return Err(RingError::Malformed { reason: "num_channels not in {1,2}" });
    }
    if sample_size != SAMPLE_SIZE {
        return Err(RingError::Malformed { reason: "sample_size != 4" });
    }
    let chunk_bytes = chunk_size as usize * num_channels as usize * sample_size as usize;
    let needed = HEADER_SIZE + num_slots as usize * chunk_bytes;
    if file_len < needed {
        return Err(RingError::TooSmall { needed, found: file_len });
    }
    Ok(())
}

/// Producer handle: advances `write_index` (release), observes `read_index`
/// (acquire) to know how much free space remains.
pub struct RingWriter {
    mm: MmapFileMut,
    base: *mut u8,
    num_slots: u32,
    num_channels: u16,
    chunk_bytes: usize,
}

// SAFETY: the raw pointer addresses memory owned by `mm`, which is moved
// with `self`; RingWriter is used from a single thread at a time (not Sync).
unsafe impl Send for RingWriter {}

impl RingWriter {
    /// Creates a new ring file sized exactly for `chunk_size * num_slots *
    /// num_channels * 4` bytes of slots plus the header, and writes the
    /// immutable metadata. Fails if the path already exists — callers that
    /// need "delete stale file first" semantics should remove it themselves.
    pub fn create<P: AsRef<Path>>(path: P, chunk_size: u32, num_slots: u32, num_channels: u16) -> Result<Self, RingError> {
        // usize::MAX sentinel: only the geometry checks apply here, the file doesn't exist yet.
        validate(chunk_size, num_slots, num_channels, SAMPLE_SIZE, usize::MAX)?;
        let chunk_bytes = chunk_size as usize * num_channels as usize * SAMPLE_SIZE as usize;
        let total = HEADER_SIZE + num_slots as usize * chunk_bytes;

        let mut mm = MmapFileMut::create_rw(path, total as u64, true)?;
        let base = mm.as_mut_ptr();
        unsafe {
            std::ptr::write(
                base as *mut RingHeader,
                RingHeader::init(chunk_size, num_slots, num_channels, SAMPLE_SIZE),
            );
        }

        Ok(Self { mm, base, num_slots, num_channels, chunk_bytes })
    }

    /// Opens an existing ring file for the writer role.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RingError> {
        let mut mm = MmapFileMut::open_rw(path)?;
        let base = mm.as_mut_ptr();
        let (chunk_size, num_slots, num_channels, sample_size) = {
            let h = unsafe { &*(base as *const RingHeader) };
            (h.chunk_size, h.num_slots, h.num_channels, h.sample_size)
        };
        validate(chunk_size, num_slots, num_channels, sample_size, mm.len())?;
        let chunk_bytes = chunk_size as usize * num_channels as usize * sample_size as usize;
        Ok(Self { mm, base, num_slots, num_channels, chunk_bytes })
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        unsafe { &*(self.base as *const RingHeader) }
    }

    pub fn num_slots(&self) -> u32 {
        self.num_slots
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn chunk_size(&self) -> u32 {
        self.header().chunk_size
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    #[inline(always)]
    pub fn load_write_index_relaxed(&self) -> u64 {
        self.header().write_index.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn load_read_index_acquire(&self) -> u64 {
        self.header().read_index.load(Ordering::Acquire)
    }

    /// Publishes slot `v - 1`: must only be called after that slot's bytes
    /// are fully written. The release-store is the synchronization point
    /// the wire-ordering contract depends on; a fence-plus-relaxed-store is
    /// not an acceptable substitute (see crate docs).
    #[inline(always)]
    pub fn store_write_index_release(&self, v: u64) {
        self.header().write_index.store(v, Ordering::Release);
    }

    #[inline(always)]
    pub fn can_write(&self) -> bool {
        let w = self.load_write_index_relaxed();
        let r = self.load_read_index_acquire();
        w.wrapping_sub(r) < self.num_slots as u64
    }

    /// Mutable view of slot `index`'s bytes. Caller must own that slot
    /// (`index` not yet published, or published-and-not-yet-visible to a
    /// reader) before writing into it.
    #[inline(always)]
    pub fn slot_mut(&mut self, index: u64) -> &mut [u8] {
        let off = slot_offset(index, self.num_slots, self.chunk_bytes);
        unsafe { std::slice::from_raw_parts_mut(self.base.add(off), self.chunk_bytes) }
    }

    pub fn error_count(&self) -> u64 {
        self.header().error_count.load(Ordering::Relaxed)
    }

    pub fn bump_error_count(&self) {
        self.header().error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_stall_count(&self) -> u64 {
        self.header().buffer_stall_count.load(Ordering::Relaxed)
    }

    pub fn bump_buffer_stall_count(&self) {
        self.header().buffer_stall_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn writer_done(&self) -> bool {
        self.header().flags.load(Ordering::Relaxed) & WRITER_DONE_BIT != 0
    }

    /// Sets the writer_done flag. Single plain store under a relaxed
    /// read-then-write: safe because this side is the sole writer of the
    /// flags word.
    pub fn set_writer_done(&self) {
        let flags = self.header().flags.load(Ordering::Relaxed);
        self.header().flags.store(flags | WRITER_DONE_BIT, Ordering::Relaxed);
    }

    pub fn sync_and_unmap(self) -> std::io::Result<()> {
        self.mm.sync_and_unmap()
    }
}

/// Consumer handle: advances `read_index` (release), observes `write_index`
/// (acquire) to know what has been published. Mapped read-write, not
/// read-only: the reader is still the sole writer of its own `read_index`
/// (and of `error_count`/`buffer_stall_count` when it is the one observing
/// the anomaly), so a PROT_READ mapping would fault the moment it tries to
/// publish a freed slot back to the writer.
pub struct RingReader {
    mm: MmapFileMut,
    base: *const u8,
    num_slots: u32,
    num_channels: u16,
    chunk_bytes: usize,
}

// SAFETY: same reasoning as RingWriter's Send impl.
unsafe impl Send for RingReader {}

impl RingReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RingError> {
        if !path.as_ref().exists() {
            return Err(RingError::Absent(path.as_ref().to_path_buf()));
        }
        let mut mm = MmapFileMut::open_rw(path)?;
        let base = mm.as_mut_ptr() as *const u8;
        let (chunk_size, num_slots, num_channels, sample_size) = {
            let h = unsafe { &*(base as *const RingHeader) };
            (h.chunk_size, h.num_slots, h.num_channels, h.sample_size)
        };
        validate(chunk_size, num_slots, num_channels, sample_size, mm.len())?;
        let chunk_bytes = chunk_size as usize * num_channels as usize * sample_size as usize;
        Ok(Self { mm, base, num_slots, num_channels, chunk_bytes })
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        unsafe { &*(self.base as *const RingHeader) }
    }

    pub fn num_slots(&self) -> u32 {
        self.num_slots
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn chunk_size(&self) -> u32 {
        self.header().chunk_size
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    #[inline(always)]
    pub fn load_write_index_acquire(&self) -> u64 {
        self.header().write_index.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn load_read_index_relaxed(&self) -> u64 {
        self.header().read_index.load(Ordering::Relaxed)
    }

    /// Frees slot `v - 1` back to the writer. Release-store so the writer's
    /// subsequent acquire-load of `read_index` sees it.
    #[inline(always)]
    pub fn store_read_index_release(&self, v: u64) {
        self.header().read_index.store(v, Ordering::Release);
    }

    #[inline(always)]
    pub fn can_read(&self) -> bool {
        self.load_write_index_acquire() > self.load_read_index_relaxed()
    }

    #[inline(always)]
    pub fn slot(&self, index: u64) -> &[u8] {
        let off = slot_offset(index, self.num_slots, self.chunk_bytes);
        unsafe { std::slice::from_raw_parts(self.base.add(off), self.chunk_bytes) }
    }

    pub fn error_count(&self) -> u64 {
        self.header().error_count.load(Ordering::Relaxed)
    }

    pub fn bump_error_count(&self) {
        self.header().error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_stall_count(&self) -> u64 {
        self.header().buffer_stall_count.load(Ordering::Relaxed)
    }

    pub fn bump_buffer_stall_count(&self) {
        self.header().buffer_stall_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn writer_done(&self) -> bool {
        self.header().flags.load(Ordering::Relaxed) & WRITER_DONE_BIT != 0
    }

    pub fn sync_and_unmap(self) -> std::io::Result<()> {
        self.mm.sync_and_unmap()
    }
}
