//! FFT Utilities
//!
//! Thin wrapper around `rustfft` plus the helpers every spectrum in this
//! crate needs: magnitude/power conversion to dB, FFT shifting and the
//! matching frequency axis.
//!
//! ## Bin ordering
//!
//! A raw FFT of N samples returns DC first, then positive frequencies, then
//! negative frequencies:
//!
//! ```text
//! index:   0    1    2   ...  ceil(N/2)-1 | ceil(N/2) ...  N-1
//! freq:    0   +df  +2df ...              |   most negative ... -df
//! ```
//!
//! `fft_shift` rotates the buffer so the most negative frequency comes first
//! and the axis is strictly ascending. This matches `numpy.fft.fftshift` for
//! both even and odd N.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::types::{IQSample, DB_EPSILON};

/// Forward FFT processor for a fixed size
pub struct FftProcessor {
    size: usize,
    fft_forward: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl FftProcessor {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft_forward.get_inplace_scratch_len()];

        Self {
            size,
            fft_forward,
            scratch,
        }
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward FFT in-place.
    ///
    /// The buffer length must equal the processor size.
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        debug_assert_eq!(buffer.len(), self.size);
        self.fft_forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Compute the forward FFT, returning a new buffer (zero-padded or
    /// truncated to the processor size)
    pub fn fft(&mut self, input: &[IQSample]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input.iter().take(self.size).copied().collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.fft_inplace(&mut buffer);
        buffer
    }

    /// Magnitude spectrum in dB: `20·log10(|X| + ε)`
    pub fn magnitude_db(spectrum: &[Complex64]) -> Vec<f64> {
        spectrum
            .iter()
            .map(|c| 20.0 * (c.norm() + DB_EPSILON).log10())
            .collect()
    }

    /// Convert linear power values to dB: `10·log10(P + ε)`
    pub fn power_to_db(power: &[f64]) -> Vec<f64> {
        power
            .iter()
            .map(|&p| 10.0 * (p + DB_EPSILON).log10())
            .collect()
    }

    /// FFT shift - move zero frequency to the center.
    ///
    /// Equivalent to rolling the buffer right by `N / 2`.
    pub fn fft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
        let n = spectrum.len();
        let mid = (n + 1) / 2;
        let mut shifted = Vec::with_capacity(n);
        shifted.extend_from_slice(&spectrum[mid..]);
        shifted.extend_from_slice(&spectrum[..mid]);
        shifted
    }

    /// Unshifted FFT bin frequencies for `size` bins at `sample_rate`
    pub fn fft_frequencies(size: usize, sample_rate: f64) -> Vec<f64> {
        let resolution = sample_rate / size as f64;
        let positive = (size + 1) / 2;
        (0..size)
            .map(|i| {
                let idx = if i < positive {
                    i as f64
                } else {
                    i as f64 - size as f64
                };
                idx * resolution
            })
            .collect()
    }

    /// Ascending (FFT-shifted) frequency axis
    pub fn shifted_frequencies(size: usize, sample_rate: f64) -> Vec<f64> {
        Self::fft_shift(&Self::fft_frequencies(size, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_shift_matches_numpy() {
        let data = vec![0, 1, 2, -2, -1];
        assert_eq!(FftProcessor::fft_shift(&data), vec![-2, -1, 0, 1, 2]);

        let data = vec![0, 1, -2, -1];
        assert_eq!(FftProcessor::fft_shift(&data), vec![-2, -1, 0, 1]);
    }

    #[test]
    fn test_frequency_axis_even() {
        let freqs = FftProcessor::shifted_frequencies(8, 8000.0);
        assert_eq!(
            freqs,
            vec![-4000.0, -3000.0, -2000.0, -1000.0, 0.0, 1000.0, 2000.0, 3000.0]
        );
    }

    #[test]
    fn test_frequency_axis_odd() {
        let freqs = FftProcessor::shifted_frequencies(5, 5000.0);
        assert_eq!(freqs, vec![-2000.0, -1000.0, 0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn test_frequency_axis_single_bin() {
        assert_eq!(FftProcessor::shifted_frequencies(1, 1000.0), vec![0.0]);
    }

    #[test]
    fn test_fft_tone_bin() {
        let n = 64;
        let bin = 5;
        let samples: Vec<IQSample> = (0..n)
            .map(|i| {
                let phase = 2.0 * PI * bin as f64 * i as f64 / n as f64;
                IQSample::new(phase.cos(), phase.sin())
            })
            .collect();

        let mut fft = FftProcessor::new(n);
        let spectrum = fft.fft(&samples);
        let mags = FftProcessor::magnitude_db(&spectrum);

        let max_idx = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(max_idx, bin);
        // |X| = N for a unit tone
        assert!((mags[bin] - 20.0 * (n as f64).log10()).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude_db_floor() {
        let mags = FftProcessor::magnitude_db(&[Complex64::new(0.0, 0.0)]);
        assert!((mags[0] - (-200.0)).abs() < 1e-9);
    }
}
