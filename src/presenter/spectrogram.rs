//! Synthetic frequency/intensity field
//!
//! This is a rendering stand-in, not a spectrogram: nothing here looks at
//! audio. Cells near a detection inside the bat call band are painted bright
//! over a layer of low random noise, so a viewer has something shaped like a
//! spectrogram to scrub through.

use crate::types::DetectionEvent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Upper edge of the frequency axis in kHz
pub const MAX_FREQUENCY_KHZ: f64 = 100.0;

/// Call band, exclusive on both ends
const CALL_BAND_KHZ: (f64, f64) = (20.0, 80.0);

/// Columns closer than this to a detection are painted, in seconds
const CALL_HALF_WIDTH_SECS: f64 = 0.5;

/// Baseline noise is drawn from [0, NOISE_CEILING)
const NOISE_CEILING: f32 = 0.3;

/// Call cells are drawn from [CALL_FLOOR, 1.0)
const CALL_FLOOR: f32 = 0.2;

/// Field dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrogramConfig {
    /// Time columns
    pub width: usize,
    /// Frequency rows, row 0 at the top
    pub height: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

/// Intensity grid in [0, 1), stored column by column
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityField {
    width: usize,
    height: usize,
    duration: f64,
    cells: Vec<f32>,
}

impl IntensityField {
    /// Generate the field for `detections` over `duration` seconds
    ///
    /// Every column draws from its own generator derived from `seed`, so the
    /// output does not depend on how rayon schedules the columns.
    pub fn generate(
        config: SpectrogramConfig,
        duration: f64,
        detections: &[DetectionEvent],
        seed: u64,
    ) -> Self {
        let SpectrogramConfig { width, height } = config;
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

        let cells: Vec<f32> = (0..width)
            .into_par_iter()
            .flat_map_iter(|x| {
                let time = column_time(x, width, duration);
                let near_call = detections
                    .iter()
                    .any(|d| (d.timestamp - time).abs() < CALL_HALF_WIDTH_SECS);
                let mut rng = StdRng::seed_from_u64(column_seed(seed, x));

                (0..height)
                    .map(|y| {
                        let frequency = row_frequency(y, height);
                        if near_call && frequency > CALL_BAND_KHZ.0 && frequency < CALL_BAND_KHZ.1 {
                            rng.random_range(CALL_FLOOR..1.0)
                        } else {
                            rng.random_range(0.0..NOISE_CEILING)
                        }
                    })
                    .collect::<Vec<f32>>()
            })
            .collect();

        Self {
            width,
            height,
            duration,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Intensity at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(x * self.height + y).copied()
    }

    /// One time column, top row first
    pub fn column(&self, x: usize) -> Option<&[f32]> {
        if x >= self.width {
            return None;
        }
        let start = x * self.height;
        self.cells.get(start..start + self.height)
    }

    /// Time in seconds at column `x`
    pub fn time_at(&self, x: usize) -> f64 {
        column_time(x, self.width, self.duration)
    }

    /// Frequency in kHz at row `y`
    pub fn frequency_at(&self, y: usize) -> f64 {
        row_frequency(y, self.height)
    }

    /// 8-bit grey levels in row-major order, top row first
    pub fn to_gray_rows(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let value = self.cells[x * self.height + y];
                out.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        out
    }
}

/// Horizontal position of time `t` on a track `width` units wide
///
/// Returns 0 for a zero-length (or invalid) duration.
pub fn marker_x(t: f64, duration: f64, width: f64) -> f64 {
    if duration > 0.0 && duration.is_finite() {
        t / duration * width
    } else {
        0.0
    }
}

fn column_time(x: usize, width: usize, duration: f64) -> f64 {
    if width == 0 {
        return 0.0;
    }
    x as f64 * duration / width as f64
}

fn row_frequency(y: usize, height: usize) -> f64 {
    if height == 0 {
        return 0.0;
    }
    (height as f64 - y as f64) / height as f64 * MAX_FREQUENCY_KHZ
}

/// SplitMix64 finalizer over seed and column index
fn column_seed(seed: u64, x: usize) -> u64 {
    let mut z = seed ^ (x as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SpectrogramConfig {
        SpectrogramConfig {
            width: 100,
            height: 50,
        }
    }

    #[test]
    fn test_axes() {
        let field = IntensityField::generate(small(), 10.0, &[], 1);
        assert_eq!(field.time_at(0), 0.0);
        assert!((field.time_at(50) - 5.0).abs() < 1e-9);
        assert_eq!(field.frequency_at(0), 100.0);
        assert_eq!(field.frequency_at(25), 50.0);
        assert_eq!(field.column(99).map(<[f32]>::len), Some(50));
        assert!(field.column(100).is_none());
        assert!(field.get(0, 50).is_none());
    }

    #[test]
    fn test_noise_only_without_detections() {
        let field = IntensityField::generate(small(), 10.0, &[], 7);
        for x in 0..field.width() {
            for &v in field.column(x).unwrap() {
                assert!((0.0..0.3).contains(&v));
            }
        }
    }

    #[test]
    fn test_call_band_painted_near_detection() {
        let detections = vec![DetectionEvent::new(5.0, 0.9, "Big Brown Bat")];
        let field = IntensityField::generate(small(), 10.0, &detections, 7);

        // Column 50 is at exactly 5.0 s
        for y in 0..field.height() {
            let freq = field.frequency_at(y);
            let v = field.get(50, y).unwrap();
            if freq > 20.0 && freq < 80.0 {
                assert!((0.2..1.0).contains(&v), "row {} ({} kHz) = {}", y, freq, v);
            } else {
                assert!(v < 0.3);
            }
        }

        // Column 45 is at 4.5 s, exactly on the strict window edge
        for &v in field.column(45).unwrap() {
            assert!(v < 0.3);
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let detections = vec![DetectionEvent::new(2.0, 0.7, "Little Brown Bat")];
        let a = IntensityField::generate(small(), 10.0, &detections, 42);
        let b = IntensityField::generate(small(), 10.0, &detections, 42);
        let c = IntensityField::generate(small(), 10.0, &detections, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_gray_rows_layout() {
        let field = IntensityField::generate(small(), 10.0, &[], 3);
        let gray = field.to_gray_rows();
        assert_eq!(gray.len(), 100 * 50);
        let expected = (field.get(3, 1).unwrap() * 255.0).round() as u8;
        assert_eq!(gray[100 + 3], expected);
    }

    #[test]
    fn test_marker_x() {
        assert_eq!(marker_x(6.25, 12.5, 800.0), 400.0);
        assert_eq!(marker_x(12.5, 12.5, 800.0), 800.0);
        assert_eq!(marker_x(3.0, 0.0, 800.0), 0.0);
    }
}
