//! Repackages an RX chunk stream, shaped `(channels, samples)`, into the
//! `(samples, channels)` shape a downstream signal-channel consumer
//! expects.

use crate::pool::{ChunkPool, PooledChunk};
use crossbeam_channel::{bounded, Receiver};

/// Spawns a converter thread; terminates when `upstream` closes. Errors
/// have nowhere to originate in a pure reshape, so this simply forwards
/// upstream closing as its own closing.
pub fn bridge(upstream: Receiver<PooledChunk>, channel_capacity: usize) -> Receiver<PooledChunk> {
    let (tx, rx) = bounded(channel_capacity);
    std::thread::spawn(move || {
        let mut pool: Option<ChunkPool> = None;
        for chunk in upstream.iter() {
            let (channels, samples) = chunk.dim();
            let pool = pool.get_or_insert_with(|| ChunkPool::new(channel_capacity + 2, samples, channels));
            let converted = pool.fill_and_take(|out| {
                for c in 0..channels {
                    for s in 0..samples {
                        out[[s, c]] = chunk[[c, s]];
                    }
                }
            });
            if tx.send(converted).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn reshapes_channels_by_samples_to_samples_by_channels() {
        let (upstream_tx, upstream_rx) = bounded(1);
        let pool = ChunkPool::new(1, 2, 3);
        let input = pool.fill_and_take(|c| {
            for s in 0..3 {
                for ch in 0..2 {
                    c[[ch, s]] = Complex::new((s * 2 + ch) as i16, 0);
                }
            }
        });
        upstream_tx.send(input).unwrap();
        drop(upstream_tx);

        let downstream = bridge(upstream_rx, 4);
        let out = downstream.recv().unwrap();
        assert_eq!(out.dim(), (3, 2));
        for s in 0..3 {
            for c in 0..2 {
                assert_eq!(out[[s, c]], Complex::new((s * 2 + c) as i16, 0));
            }
        }
        assert!(downstream.recv().is_err());
    }
}
