//! Pre-allocated working set of `capacity + 2` matrices. `fill_and_take`
//! hands out a [`PooledChunk`] that rejoins the free list automatically when
//! dropped, so once the pool is primed the hot path never allocates a fresh
//! matrix — only a consumer holding more chunks in flight than the `+2`
//! margin provides forces a fallback allocation.

use sdrshm_core::Chunk;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

struct Shared {
    shape: (usize, usize),
    free: Vec<Chunk>,
}

/// Shared handle to a pool of pre-allocated chunk matrices. Cheap to clone
/// (an `Arc` bump); clones share the same free list.
#[derive(Clone)]
pub struct ChunkPool {
    shared: Arc<Mutex<Shared>>,
}

impl ChunkPool {
    pub fn new(capacity: usize, rows: usize, cols: usize) -> Self {
        let free = (0..capacity).map(|_| Chunk::zeros((rows, cols))).collect();
        Self { shared: Arc::new(Mutex::new(Shared { shape: (rows, cols), free })) }
    }

    /// Takes a matrix off the free list (or allocates one if it is
    /// momentarily exhausted), fills it in place via `fill`, and hands it
    /// back as a [`PooledChunk`] that returns it to this pool on drop.
    pub fn fill_and_take(&self, fill: impl FnOnce(&mut Chunk)) -> PooledChunk {
        let mut chunk = {
            let mut shared = self.shared.lock().unwrap();
            shared.free.pop().unwrap_or_else(|| Chunk::zeros(shared.shape))
        };
        fill(&mut chunk);
        PooledChunk { chunk: Some(chunk), shared: self.shared.clone() }
    }
}

/// A chunk matrix borrowed from a [`ChunkPool`]. Derefs to [`Chunk`] for
/// read access; returns its backing allocation to the pool's free list when
/// dropped instead of deallocating it.
pub struct PooledChunk {
    chunk: Option<Chunk>,
    shared: Arc<Mutex<Shared>>,
}

impl Deref for PooledChunk {
    type Target = Chunk;

    fn deref(&self) -> &Chunk {
        self.chunk.as_ref().expect("chunk taken before drop")
    }
}

impl Drop for PooledChunk {
    fn drop(&mut self) {
        if let Some(chunk) = self.chunk.take() {
            self.shared.lock().unwrap().free.push(chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_take_rotates_and_preserves_shape() {
        let pool = ChunkPool::new(3, 2, 4);
        for n in 0..7 {
            let chunk = pool.fill_and_take(|c| c.fill(num_complex::Complex::new(n as i16, 0)));
            assert_eq!(chunk.shape(), &[2, 4]);
            assert_eq!(chunk[[0, 0]].re, n as i16);
        }
    }

    #[test]
    fn returned_chunks_are_reused_not_reallocated() {
        let pool = ChunkPool::new(1, 2, 2);
        let first_ptr = {
            let chunk = pool.fill_and_take(|_| {});
            chunk.as_ptr()
        };
        // `chunk` dropped here, returning its allocation to the free list.
        let second_ptr = {
            let chunk = pool.fill_and_take(|_| {});
            chunk.as_ptr()
        };
        assert_eq!(first_ptr, second_ptr, "pool should hand back the same backing allocation");
    }

    #[test]
    fn exhausted_pool_falls_back_to_a_fresh_allocation() {
        let pool = ChunkPool::new(1, 2, 2);
        let _first = pool.fill_and_take(|_| {}); // held, so the free list is empty
        let second = pool.fill_and_take(|_| {}); // must allocate rather than block or panic
        assert_eq!(second.shape(), &[2, 2]);
    }
}
