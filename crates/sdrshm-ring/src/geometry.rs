//! Slot addressing. Indices are free-running 64-bit counters (never wrap in
//! practice); `num_slots` need not be a power of two, so index mapping is a
//! plain modulo rather than a bitmask (unlike a power-of-2-only ring).

use crate::shm_layout::HEADER_SIZE;

#[inline(always)]
pub fn index_to_slot(index: u64, num_slots: u32) -> u64 {
    index % num_slots as u64
}

/// Byte offset of a slot from the start of the mapped region.
#[inline(always)]
pub fn slot_offset(index: u64, num_slots: u32, chunk_bytes: usize) -> usize {
    HEADER_SIZE + index_to_slot(index, num_slots) as usize * chunk_bytes
}

/// Slot count that covers roughly `buffer_time_s` seconds at `sample_rate_hz`
/// given the protocol's fixed `chunk_size`. Shared by whichever side creates
/// a ring (the host for TX, the external process for RX) so both derive the
/// same geometry from the same three numbers without negotiating it over
/// any channel but the ring metadata itself.
pub fn num_slots_for_buffer_time(buffer_time_s: f64, sample_rate_hz: f64, chunk_size: u32) -> u32 {
    let slots = (buffer_time_s * sample_rate_hz / chunk_size as f64).ceil();
    slots.max(1.0) as u32
}
