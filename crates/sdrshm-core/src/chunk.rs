use ndarray::Array2;
use num_complex::Complex;

/// A single complex int16 IQ sample (real, imaginary), little-endian on the
/// wire. `num_complex::Complex<i16>` lays its fields out `(re, im)` with no
/// padding, so it is bit-for-bit the wire format — no conversion needed when
/// copying into or out of a ring slot.
pub type Sample = Complex<i16>;

/// A dense matrix of IQ samples: `(channels, samples)` on the RX boundary,
/// `(samples, channels)` on the TX input boundary (the asymmetry matches
/// what each boundary naturally produces/consumes).
pub type Chunk = Array2<Sample>;

/// Samples per channel in one ring slot. Fixed rather than negotiated: the
/// host (TX producer) and the external process (RX producer) must agree on
/// slot geometry without exchanging it over any channel but the ring
/// metadata itself, so both sides build rings against this constant.
pub const RING_CHUNK_SIZE: u32 = 4096;

/// Element type accepted on the TX input boundary: real-int16 input is
/// widened to complex-int16 with a zero imaginary part during the copy.
#[derive(Debug, Clone)]
pub enum TxChunk {
    Complex(Array2<Sample>),
    Real(Array2<i16>),
}

impl TxChunk {
    /// Number of samples per channel in this chunk (the ring's `chunk_size`).
    pub fn samples_per_channel(&self) -> usize {
        match self {
            TxChunk::Complex(a) => a.nrows(),
            TxChunk::Real(a) => a.nrows(),
        }
    }

    pub fn num_channels(&self) -> usize {
        match self {
            TxChunk::Complex(a) => a.ncols(),
            TxChunk::Real(a) => a.ncols(),
        }
    }
}

/// Reads the sample at flat wire position `sample_index` (`s * num_channels +
/// c`, per the channel-interleaved-within-sample layout) out of a raw slot.
#[inline]
pub fn read_sample_le(bytes: &[u8], sample_index: usize) -> Sample {
    let base = sample_index * 4;
    let re = i16::from_le_bytes([bytes[base], bytes[base + 1]]);
    let im = i16::from_le_bytes([bytes[base + 2], bytes[base + 3]]);
    Sample::new(re, im)
}

/// Writes `sample` at flat wire position `sample_index` into a raw slot.
#[inline]
pub fn write_sample_le(bytes: &mut [u8], sample_index: usize, sample: Sample) {
    let base = sample_index * 4;
    bytes[base..base + 2].copy_from_slice(&sample.re.to_le_bytes());
    bytes[base + 2..base + 4].copy_from_slice(&sample.im.to_le_bytes());
}
