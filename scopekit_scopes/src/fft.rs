// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windowed FFT of audio blocks, shared by the spectrum and spectrogram.

use std::sync::Mutex;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use scopekit_core::image::AudioBlock;

use crate::lock;

/// Selectable FFT window sizes; settings store an index into this table.
pub const WINDOW_SIZES: [usize; 4] = [256, 512, 1024, 2048];

/// Smallest window acceleration will shrink to.
pub const MIN_WINDOW: usize = 64;

/// Level reported for bins without energy, in dB.
pub const SILENCE_DB: f32 = -180.0;

/// Window actually used for a block.
///
/// Starts from `base`, halves it per doubling of `accel` (not below
/// [`MIN_WINDOW`]), limits it to the `available` samples and rounds down to
/// an even length.
#[must_use]
pub fn effective_window(base: usize, available: usize, accel: u32) -> usize {
    let mut window = base;
    let mut factor = accel.max(1);
    while factor > 1 && window > MIN_WINDOW {
        window /= 2;
        factor /= 2;
    }
    window.min(available) & !1
}

/// Plans and runs forward FFTs; plans are cached across renders.
pub struct SpectrumAnalyzer {
    planner: Mutex<FftPlanner<f32>>,
}

impl core::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpectrumAnalyzer").finish_non_exhaustive()
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    /// Creates an analyzer with an empty plan cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// Level of each frequency bin of the first channel of `block`, in dB
    /// relative to a full-scale sine.
    ///
    /// Uses the first `window` samples with a Hann window and returns
    /// `window / 2` bins. Returns an empty vector if the block is shorter
    /// than `window` or `window` is zero.
    pub fn power_db(&self, block: &AudioBlock, window: usize) -> Vec<f32> {
        if window == 0 || block.available_per_channel() < window {
            return Vec::new();
        }
        let n = window as f32;
        let mut buf: Vec<Complex<f32>> = block
            .channel(0)
            .take(window)
            .enumerate()
            .map(|(i, s)| {
                let hann = 0.5 * (1.0 - (core::f32::consts::TAU * i as f32 / n).cos());
                Complex::new(f32::from(s) / 32768.0 * hann, 0.0)
            })
            .collect();
        if buf.len() < window {
            return Vec::new();
        }
        lock(&self.planner).plan_fft_forward(window).process(&mut buf);
        buf.truncate(window / 2);
        buf.iter()
            .map(|c| {
                let amplitude = c.norm() * 4.0 / n;
                if amplitude > 0.0 {
                    (20.0 * amplitude.log10()).max(SILENCE_DB)
                } else {
                    SILENCE_DB
                }
            })
            .collect()
    }
}

/// Resamples `bins[..right]` onto `width` pixel columns, keeping the peak of
/// every group of bins that shares a column.
#[must_use]
pub fn columns(bins: &[f32], width: u32, right: usize) -> Vec<f32> {
    let right = right.min(bins.len());
    let width = width as usize;
    if right == 0 {
        return vec![SILENCE_DB; width];
    }
    (0..width)
        .map(|x| {
            let lo = x * right / width;
            let hi = ((x + 1) * right / width).max(lo + 1).min(right);
            bins[lo..hi].iter().copied().fold(SILENCE_DB, f32::max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[expect(
        clippy::cast_possible_truncation,
        reason = "amplitudes stay within the i16 range"
    )]
    fn sine(bin: usize, window: usize, amplitude: f64) -> AudioBlock {
        let samples = (0..window)
            .map(|i| {
                let t = core::f64::consts::TAU * (bin * i) as f64 / window as f64;
                (amplitude * 32767.0 * t.sin()).round() as i16
            })
            .collect();
        AudioBlock {
            samples,
            frequency: 48_000,
            channels: 1,
            samples_per_channel: window,
        }
    }

    #[test]
    fn window_shrinks_with_acceleration() {
        assert_eq!(effective_window(1024, 4096, 1), 1024);
        assert_eq!(effective_window(1024, 4096, 2), 512);
        assert_eq!(effective_window(1024, 4096, 3), 512);
        assert_eq!(effective_window(1024, 4096, 4), 256);
        assert_eq!(effective_window(256, 4096, 64), MIN_WINDOW);
        assert_eq!(effective_window(1024, 301, 1), 300, "odd counts round down");
    }

    #[test]
    fn sine_peaks_in_its_bin() {
        let analyzer = SpectrumAnalyzer::new();
        let db = analyzer.power_db(&sine(16, 256, 0.5), 256);
        assert_eq!(db.len(), 128);
        let (peak, level) = db
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        assert_eq!(peak, 16);
        assert!((level - -6.02).abs() < 0.1, "level {level}");
        assert!(db[64] < -60.0);
    }

    #[test]
    fn short_blocks_yield_nothing() {
        let analyzer = SpectrumAnalyzer::new();
        assert!(analyzer.power_db(&sine(1, 32, 1.0), 64).is_empty());
    }

    #[test]
    fn overstated_sample_count_yields_nothing() {
        let analyzer = SpectrumAnalyzer::new();
        let block = AudioBlock {
            samples: vec![0; 100],
            frequency: 48_000,
            channels: 1,
            samples_per_channel: 1024,
        };
        assert_eq!(block.available_per_channel(), 100);
        let window = effective_window(1024, block.available_per_channel(), 1);
        assert_eq!(window, 100);
        assert_eq!(analyzer.power_db(&block, window).len(), 50);
        assert!(analyzer.power_db(&block, 1024).is_empty());
    }

    #[test]
    fn columns_keep_peaks() {
        let bins = [-10.0, -3.0, -50.0, -40.0, -20.0, -90.0];
        assert_eq!(columns(&bins, 2, 4), vec![-3.0, -40.0]);
        assert_eq!(columns(&bins, 4, 2), vec![-10.0, -10.0, -3.0, -3.0]);
        assert_eq!(columns(&[], 2, 4), vec![SILENCE_DB; 2]);
    }
}
