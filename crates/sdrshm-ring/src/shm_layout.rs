//! Binary layout of the ring's 64-byte header.
//!
//! ```text
//! offset  size  field
//!      0     8  write_index        (writer: RW release, reader: R acquire)
//!      8     8  read_index         (reader: RW release, writer: R acquire)
//!     16     8  error_count        (RW relaxed)
//!     24     4  chunk_size         (init only)
//!     28     4  num_slots          (init only)
//!     32     2  num_channels       (init only)
//!     34     2  flags              (RW relaxed, bit 0 = writer_done)
//!     36     4  sample_size        (init only)
//!     40     8  buffer_stall_count (RW relaxed)
//!     48    16  reserved
//! ```
//!
//! `#[repr(C)]` with fields in this order reproduces these offsets exactly:
//! every field already falls on a boundary its own alignment requires, so
//! the compiler inserts no padding between them. A unit test below pins
//! this down with `core::mem::offset_of!` so a future field reorder can't
//! silently break the wire format.

use std::sync::atomic::{AtomicU16, AtomicU64};

pub const HEADER_SIZE: usize = 64;
pub const WRITER_DONE_BIT: u16 = 1 << 0;

#[repr(C)]
pub struct RingHeader {
    pub write_index: AtomicU64,
    pub read_index: AtomicU64,
    pub error_count: AtomicU64,
    pub chunk_size: u32,
    pub num_slots: u32,
    pub num_channels: u16,
    pub flags: AtomicU16,
    pub sample_size: u32,
    pub buffer_stall_count: AtomicU64,
    reserved: [u8; 16],
}

impl RingHeader {
    /// Writes the immutable metadata fields and zeroes everything else.
    /// Must run exactly once, before any role observes `write_index > 0`.
    pub fn init(chunk_size: u32, num_slots: u32, num_channels: u16, sample_size: u32) -> Self {
        Self {
            write_index: AtomicU64::new(0),
            read_index: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            chunk_size,
            num_slots,
            num_channels,
            flags: AtomicU16::new(0),
            sample_size,
            buffer_stall_count: AtomicU64::new(0),
            reserved: [0; 16],
        }
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_size as usize * self.num_channels as usize * self.sample_size as usize
    }

    pub fn total_bytes(&self) -> usize {
        HEADER_SIZE + self.num_slots as usize * self.chunk_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn header_layout_matches_wire_format() {
        assert_eq!(size_of::<RingHeader>(), HEADER_SIZE);
        assert_eq!(offset_of!(RingHeader, write_index), 0);
        assert_eq!(offset_of!(RingHeader, read_index), 8);
        assert_eq!(offset_of!(RingHeader, error_count), 16);
        assert_eq!(offset_of!(RingHeader, chunk_size), 24);
        assert_eq!(offset_of!(RingHeader, num_slots), 28);
        assert_eq!(offset_of!(RingHeader, num_channels), 32);
        assert_eq!(offset_of!(RingHeader, flags), 34);
        assert_eq!(offset_of!(RingHeader, sample_size), 36);
        assert_eq!(offset_of!(RingHeader, buffer_stall_count), 40);
        assert_eq!(offset_of!(RingHeader, reserved), 48);
    }
}
