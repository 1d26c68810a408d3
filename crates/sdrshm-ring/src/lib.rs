//! `sdrshm-ring`: the wire-compatible shared-memory ring buffer used to
//! shuttle SDR IQ samples between a host process and an external
//! streaming process.
//!
//! A ring is a 64-byte header (see [`shm_layout`]) followed by
//! `num_slots` fixed-size slots of complex-int16 samples. Exactly one
//! [`RingWriter`] and one [`RingReader`] operate on a given ring file;
//! [`RingWriter::store_write_index_release`] / [`RingReader::load_write_index_acquire`]
//! (and the symmetric pair on `read_index`) are the synchronization point —
//! see `spsc` module docs for why a fence-plus-relaxed-store is not a
//! substitute for a real release-store here.

mod geometry;
mod shm_layout;
mod spsc;
mod stats;

pub use geometry::num_slots_for_buffer_time;
pub use shm_layout::{HEADER_SIZE, WRITER_DONE_BIT};
pub use spsc::{RingReader, RingWriter};
pub use stats::{delete_ring, read_stats, RingStats};

pub use sdrshm_core::RingError;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn scratch_path() -> std::path::PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        fs::remove_file(&path).ok();
        path
    }

    #[test]
    fn create_then_open_round_trips_metadata() {
        let path = scratch_path();
        let writer = RingWriter::create(&path, 256, 16, 1).unwrap();
        assert_eq!(writer.num_slots(), 16);
        assert_eq!(writer.num_channels(), 1);
        assert_eq!(writer.chunk_size(), 256);

        let reader = RingReader::open(&path).unwrap();
        assert_eq!(reader.num_slots(), 16);
        assert_eq!(reader.num_channels(), 1);
        assert!(!reader.can_read());
        assert!(!reader.writer_done());

        writer.sync_and_unmap().unwrap();
        delete_ring(&path).unwrap();
    }

    #[test]
    fn create_fails_if_path_exists() {
        let path = scratch_path();
        let _w = RingWriter::create(&path, 64, 4, 1).unwrap();
        let err = RingWriter::create(&path, 64, 4, 1).unwrap_err();
        assert!(matches!(err, RingError::Io(_)));
        delete_ring(&path).unwrap();
    }

    #[test]
    fn open_rejects_malformed_channel_count() {
        let path = scratch_path();
        {
            let mut w = RingWriter::create(&path, 64, 4, 1).unwrap();
            // Corrupt num_channels directly to simulate a malformed file.
            unsafe {
                let base = w.slot_mut(0).as_mut_ptr().sub(HEADER_SIZE);
                *(base.add(32) as *mut u16) = 3;
            }
        }
        let err = RingReader::open(&path).unwrap_err();
        assert!(matches!(err, RingError::Malformed { .. }));
        delete_ring(&path).unwrap();
    }

    #[test]
    fn open_absent_reports_absent() {
        let path = scratch_path();
        let err = RingReader::open(&path).unwrap_err();
        assert!(matches!(err, RingError::Absent(_)));
    }

    #[test]
    fn single_slot_publish_and_consume_round_trips() {
        let path = scratch_path();
        let mut writer = RingWriter::create(&path, 4, 2, 1).unwrap();
        let reader = RingReader::open(&path).unwrap();

        assert!(writer.can_write());
        assert!(!reader.can_read());

        writer.slot_mut(0).copy_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8, 0]);
        writer.store_write_index_release(1);

        assert!(reader.can_read());
        let idx = reader.load_write_index_acquire() - 1;
        assert_eq!(reader.slot(idx), &[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8, 0][..]);
        reader.store_read_index_release(idx + 1);

        assert!(!reader.can_read());
        assert!(writer.can_write());

        writer.sync_and_unmap().unwrap();
        reader.sync_and_unmap().unwrap();
        delete_ring(&path).unwrap();
    }

    #[test]
    fn can_write_false_when_ring_is_full() {
        let path = scratch_path();
        let writer = RingWriter::create(&path, 4, 2, 1).unwrap();
        writer.store_write_index_release(2); // 2 slots, both occupied, read_index still 0
        assert!(!writer.can_write());
        writer.sync_and_unmap().unwrap();
        delete_ring(&path).unwrap();
    }

    #[test]
    fn writer_done_flag_round_trips() {
        let path = scratch_path();
        let writer = RingWriter::create(&path, 4, 2, 1).unwrap();
        let reader = RingReader::open(&path).unwrap();
        assert!(!reader.writer_done());
        writer.set_writer_done();
        assert!(reader.writer_done());
        writer.sync_and_unmap().unwrap();
        reader.sync_and_unmap().unwrap();
        delete_ring(&path).unwrap();
    }

    #[test]
    fn read_stats_reports_current_header_state() {
        let path = scratch_path();
        let writer = RingWriter::create(&path, 4, 2, 1).unwrap();
        writer.store_write_index_release(1);
        writer.bump_error_count();

        let stats = read_stats(&path).unwrap();
        assert_eq!(stats.write_index, 1);
        assert_eq!(stats.read_index, 0);
        assert_eq!(stats.error_count, 1);
        assert!(!stats.writer_done);

        writer.sync_and_unmap().unwrap();
        delete_ring(&path).unwrap();
    }

    #[test]
    fn delete_ring_is_idempotent_on_absent_path() {
        let path = scratch_path();
        delete_ring(&path).unwrap();
        delete_ring(&path).unwrap();
    }
}
