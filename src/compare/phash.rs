//! Band-median perceptual hash.
//!
//! The image is reduced to a 16x16 luminance grid. The grid is split into
//! horizontal bands of four rows, and each cell contributes one bit: set when
//! the cell is brighter than its band's median. That gives a 256-bit
//! signature where visually similar images differ in few bits.

use image::imageops::FilterType;

use crate::errors::MonitorError;

const GRID: u32 = 16;
const BAND_ROWS: usize = 4;

/// Bytes in a hash.
pub const HASH_LEN: usize = (GRID * GRID / 8) as usize;
/// Bits per hash byte.
pub const BITS_PER_UNIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptualHash {
    bits: [u8; HASH_LEN],
}

impl PerceptualHash {
    /// Decode an encoded image (PNG, JPEG, ...) and hash it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MonitorError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| MonitorError::HashCompute(format!("cannot decode image: {}", e)))?;
        if img.width() == 0 || img.height() == 0 {
            return Err(MonitorError::HashCompute("image has no pixels".into()));
        }

        let grid = image::imageops::resize(&img.to_luma8(), GRID, GRID, FilterType::Triangle);
        let cells = grid.into_raw();

        let mut bits = [0u8; HASH_LEN];
        let band_len = GRID as usize * BAND_ROWS;
        for (band_idx, band) in cells.chunks(band_len).enumerate() {
            let median = median(band);
            for (i, &value) in band.iter().enumerate() {
                if f64::from(value) > median {
                    let bit = band_idx * band_len + i;
                    bits[bit / 8] |= 0x80 >> (bit % 8);
                }
            }
        }

        Ok(Self { bits })
    }

    /// Number of differing bits.
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn similarity(&self, other: &PerceptualHash) -> f64 {
        similarity_from_distance(self.distance(other), (HASH_LEN * BITS_PER_UNIT) as u32)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bits)
    }
}

fn median(values: &[u8]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}

/// Similarity percentage for a Hamming distance, rounded to two decimals.
pub fn similarity_from_distance(distance: u32, total_bits: u32) -> f64 {
    if total_bits == 0 {
        return 100.0;
    }
    let distance = distance.min(total_bits);
    let raw = (1.0 - f64::from(distance) / f64::from(total_bits)) * 100.0;
    (raw * 100.0).round() / 100.0
}

pub fn is_match(similarity: f64, threshold: f64) -> bool {
    similarity >= threshold
}
