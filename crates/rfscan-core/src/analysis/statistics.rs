//! Signal Statistics
//!
//! Time-domain statistics of an I/Q buffer (power, PAPR, DC offset,
//! magnitude distribution shape, phase spread, I/Q correlation) and
//! descriptive features of a power spectrum (centroid, spread, flatness,
//! rolloff).

use crate::analysis::anomaly::PowerMoments;
use crate::analysis::spectrum::Spectrum;
use crate::types::{DspError, DspResult, IQSample};
use serde::Serialize;
use std::f64::consts::PI;

/// Fraction of spectral energy below the rolloff frequency
pub const ROLLOFF_FRACTION: f64 = 0.85;

/// Variance below this fraction of the mean square is rounding noise
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-20;

fn to_dbfs(power: f64) -> f64 {
    if power > 1e-20 {
        10.0 * power.log10()
    } else {
        -200.0
    }
}

/// Time-domain statistics for an I/Q buffer
#[derive(Debug, Clone, Serialize)]
pub struct SignalStats {
    /// Number of samples analyzed
    pub num_samples: usize,
    /// Signal duration in seconds
    pub duration_sec: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Mean power in dBFS (full scale = 1.0)
    pub mean_power_dbfs: f64,
    /// Peak power in dBFS
    pub peak_power_dbfs: f64,
    /// Peak-to-Average Power Ratio in dB
    pub papr_db: f64,
    /// RMS amplitude
    pub rms_amplitude: f64,
    /// Peak amplitude
    pub peak_amplitude: f64,
    /// Crest factor (peak / RMS, linear)
    pub crest_factor: f64,
    /// DC offset, I component
    pub dc_offset_i: f64,
    /// DC offset, Q component
    pub dc_offset_q: f64,
    /// Mean of |x|
    pub magnitude_mean: f64,
    /// Population standard deviation of |x|
    pub magnitude_std: f64,
    /// Skewness of |x|
    pub magnitude_skewness: f64,
    /// Excess kurtosis of |x|
    pub magnitude_kurtosis: f64,
    /// Standard deviation of the unwrapped phase in radians
    pub phase_std: f64,
    /// Pearson correlation between I and Q
    pub iq_correlation: f64,
}

impl SignalStats {
    /// Compute statistics for the given samples
    pub fn compute(samples: &[IQSample], sample_rate: f64) -> DspResult<Self> {
        DspError::require_len(samples.len(), 1)?;
        DspError::require_sample_rate(sample_rate)?;

        let num_samples = samples.len();
        let n = num_samples as f64;

        let dc_offset: IQSample = samples.iter().sum::<IQSample>() / n;

        let powers: Vec<f64> = samples.iter().map(|s| s.norm_sqr()).collect();
        let mean_power = powers.iter().sum::<f64>() / n;
        let peak_power = powers.iter().copied().fold(0.0, f64::max);

        let mean_power_dbfs = to_dbfs(mean_power);
        let peak_power_dbfs = to_dbfs(peak_power);

        let rms_amplitude = mean_power.sqrt();
        let peak_amplitude = peak_power.sqrt();
        let crest_factor = if rms_amplitude > 0.0 {
            peak_amplitude / rms_amplitude
        } else {
            0.0
        };

        let magnitudes: Vec<f64> = samples.iter().map(|s| s.norm()).collect();
        let (magnitude_mean, magnitude_std, magnitude_skewness, magnitude_kurtosis) =
            distribution_shape(&magnitudes);

        let phases = unwrap_phase(samples.iter().map(|s| s.arg()));
        let (_, phase_std, _, _) = distribution_shape(&phases);

        let iq_correlation = pearson(
            samples.iter().map(|s| s.re),
            samples.iter().map(|s| s.im),
            num_samples,
        );

        Ok(Self {
            num_samples,
            duration_sec: n / sample_rate,
            sample_rate,
            mean_power_dbfs,
            peak_power_dbfs,
            papr_db: peak_power_dbfs - mean_power_dbfs,
            rms_amplitude,
            peak_amplitude,
            crest_factor,
            dc_offset_i: dc_offset.re,
            dc_offset_q: dc_offset.im,
            magnitude_mean,
            magnitude_std,
            magnitude_skewness,
            magnitude_kurtosis,
            phase_std,
            iq_correlation,
        })
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Signal Statistics\n");
        output.push_str(&"═".repeat(50));
        output.push('\n');

        output.push_str(&format!("Samples:           {}\n", self.num_samples));
        output.push_str(&format!("Duration:          {:.6} s\n", self.duration_sec));
        output.push_str(&format!("Sample Rate:       {:.0} Hz\n", self.sample_rate));

        output.push_str("\nPower Measurements\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!("Mean Power:        {:.2} dBFS\n", self.mean_power_dbfs));
        output.push_str(&format!("Peak Power:        {:.2} dBFS\n", self.peak_power_dbfs));
        output.push_str(&format!("PAPR:              {:.2} dB\n", self.papr_db));
        output.push_str(&format!("Crest Factor:      {:.3}\n", self.crest_factor));

        output.push_str("\nAmplitude\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!("RMS Amplitude:     {:.6}\n", self.rms_amplitude));
        output.push_str(&format!("Peak Amplitude:    {:.6}\n", self.peak_amplitude));
        output.push_str(&format!("Magnitude Mean:    {:.6}\n", self.magnitude_mean));
        output.push_str(&format!("Magnitude Std:     {:.6}\n", self.magnitude_std));
        output.push_str(&format!("Skewness:          {:.4}\n", self.magnitude_skewness));
        output.push_str(&format!("Excess Kurtosis:   {:.4}\n", self.magnitude_kurtosis));

        output.push_str("\nI/Q Analysis\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!(
            "DC Offset:         ({:.6}, {:.6})\n",
            self.dc_offset_i, self.dc_offset_q
        ));
        output.push_str(&format!("Phase Std:         {:.4} rad\n", self.phase_std));
        output.push_str(&format!("I/Q Correlation:   {:.4}\n", self.iq_correlation));

        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Descriptive features of a power spectrum
#[derive(Debug, Clone, Serialize)]
pub struct SpectralFeatures {
    pub power_mean_db: f64,
    pub power_std_db: f64,
    pub power_min_db: f64,
    pub power_max_db: f64,
    pub power_median_db: f64,
    /// Magnitude-weighted mean frequency in Hz
    pub centroid_hz: f64,
    /// Magnitude-weighted standard deviation around the centroid in Hz
    pub spread_hz: f64,
    /// Geometric over arithmetic mean of linear magnitude (0..=1)
    pub flatness: f64,
    /// Frequency below which `ROLLOFF_FRACTION` of the energy lies
    pub rolloff_hz: f64,
    /// Frequency of the strongest bin
    pub peak_frequency_hz: f64,
}

impl SpectralFeatures {
    /// Compute features of `spectrum`.
    ///
    /// Weighted features use linear magnitude `10^(dB/20)`; if every bin is
    /// at zero magnitude they are reported as 0.
    pub fn compute(spectrum: &Spectrum) -> DspResult<Self> {
        DspError::require_len(spectrum.len(), 1)?;

        let power = &spectrum.power_db;
        let freqs = &spectrum.frequencies;

        let moments = PowerMoments::compute(power).ok_or(DspError::InsufficientData {
            expected: 1,
            actual: 0,
        })?;

        let mut sorted = power.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let power_median_db = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let magnitude: Vec<f64> = power.iter().map(|&db| 10f64.powf(db / 20.0)).collect();
        let total: f64 = magnitude.iter().sum();

        let (centroid_hz, spread_hz, flatness) = if total > 0.0 {
            let centroid = freqs
                .iter()
                .zip(magnitude.iter())
                .map(|(f, m)| f * m)
                .sum::<f64>()
                / total;
            let spread = (freqs
                .iter()
                .zip(magnitude.iter())
                .map(|(f, m)| (f - centroid).powi(2) * m)
                .sum::<f64>()
                / total)
                .sqrt();

            let arithmetic = total / magnitude.len() as f64;
            let log_mean = magnitude
                .iter()
                .map(|&m| m.max(f64::MIN_POSITIVE).ln())
                .sum::<f64>()
                / magnitude.len() as f64;
            (centroid, spread, log_mean.exp() / arithmetic)
        } else {
            (0.0, 0.0, 0.0)
        };

        let energy_total: f64 = magnitude.iter().map(|m| m * m).sum();
        let mut cumulative = 0.0;
        let mut rolloff_hz = freqs[freqs.len() - 1];
        for (f, m) in freqs.iter().zip(magnitude.iter()) {
            cumulative += m * m;
            if cumulative >= ROLLOFF_FRACTION * energy_total {
                rolloff_hz = *f;
                break;
            }
        }

        let peak_frequency_hz = spectrum.find_peak().map(|(f, _)| f).unwrap_or(0.0);

        Ok(Self {
            power_mean_db: moments.mean,
            power_std_db: moments.std_dev,
            power_min_db: sorted[0],
            power_max_db: sorted[sorted.len() - 1],
            power_median_db,
            centroid_hz,
            spread_hz,
            flatness: flatness.clamp(0.0, 1.0),
            rolloff_hz,
            peak_frequency_hz,
        })
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Spectral Features\n");
        output.push_str(&"═".repeat(50));
        output.push('\n');
        output.push_str(&format!("Mean Power:        {:.2} dB\n", self.power_mean_db));
        output.push_str(&format!("Power Std:         {:.2} dB\n", self.power_std_db));
        output.push_str(&format!(
            "Power Range:       [{:.2}, {:.2}] dB\n",
            self.power_min_db, self.power_max_db
        ));
        output.push_str(&format!("Median Power:      {:.2} dB\n", self.power_median_db));
        output.push_str(&format!("Centroid:          {:.2} Hz\n", self.centroid_hz));
        output.push_str(&format!("Spread:            {:.2} Hz\n", self.spread_hz));
        output.push_str(&format!("Flatness:          {:.4}\n", self.flatness));
        output.push_str(&format!("Rolloff (85%):     {:.2} Hz\n", self.rolloff_hz));
        output.push_str(&format!("Peak Frequency:    {:.2} Hz\n", self.peak_frequency_hz));
        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Mean, population std, skewness and excess kurtosis
fn distribution_shape(values: &[f64]) -> (f64, f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let scale = values.iter().map(|v| v * v).sum::<f64>() / n;
    if m2 <= RELATIVE_VARIANCE_FLOOR * scale {
        return (mean, 0.0, 0.0, 0.0);
    }
    let std = m2.sqrt();
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    (mean, std, m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

/// Remove 2π jumps between consecutive phase values
fn unwrap_phase(phases: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out = Vec::new();
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;
    for phase in phases {
        if let Some(p) = prev {
            let delta = phase - p;
            if delta > PI {
                offset -= 2.0 * PI;
            } else if delta < -PI {
                offset += 2.0 * PI;
            }
        }
        prev = Some(phase);
        out.push(phase + offset);
    }
    out
}

/// Sum of squares reconstructed from mean and centered sum of squares
fn sum_of_squares(mean: f64, centered: f64, n: f64) -> f64 {
    centered + n * mean * mean
}

/// Pearson correlation; 0 when either side has no variance
fn pearson(
    xs: impl Iterator<Item = f64> + Clone,
    ys: impl Iterator<Item = f64> + Clone,
    n: usize,
) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = xs.clone().sum::<f64>() / nf;
    let mean_y = ys.clone().sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let scale_x = sum_of_squares(mean_x, sxx, nf);
    let scale_y = sum_of_squares(mean_y, syy, nf);
    if sxx <= RELATIVE_VARIANCE_FLOOR * scale_x || syy <= RELATIVE_VARIANCE_FLOOR * scale_y {
        0.0
    } else {
        sxy / (sxx * syy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpectrumBuilder;

    fn tone(n: usize, freq: f64, sample_rate: f64, amplitude: f64) -> Vec<IQSample> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * PI * freq * i as f64 / sample_rate;
                IQSample::new(amplitude * phase.cos(), amplitude * phase.sin())
            })
            .collect()
    }

    #[test]
    fn test_stats_empty() {
        assert!(matches!(
            SignalStats::compute(&[], 48000.0),
            Err(DspError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_stats_single_tone() {
        let sample_rate = 48000.0;
        let amplitude = 0.5;
        let samples = tone(1000, 1000.0, sample_rate, amplitude);

        let stats = SignalStats::compute(&samples, sample_rate).unwrap();

        // Constant envelope: RMS equals amplitude, crest factor is 1
        assert!((stats.rms_amplitude - amplitude).abs() < 1e-9);
        assert!((stats.crest_factor - 1.0).abs() < 1e-9);
        assert!(stats.papr_db.abs() < 1e-9);
        assert!(stats.magnitude_std < 1e-9);
        assert!((stats.duration_sec - 1000.0 / 48000.0).abs() < 1e-12);

        // ~21 cycles average out to almost no DC
        assert!(stats.dc_offset_i.abs() < 0.01);
        assert!(stats.dc_offset_q.abs() < 0.01);
    }

    #[test]
    fn test_stats_dc_offset() {
        let samples = vec![IQSample::new(0.1, -0.2); 1000];
        let stats = SignalStats::compute(&samples, 48000.0).unwrap();

        assert!((stats.dc_offset_i - 0.1).abs() < 1e-9);
        assert!((stats.dc_offset_q + 0.2).abs() < 1e-9);
        assert_eq!(stats.iq_correlation, 0.0);
        assert_eq!(stats.phase_std, 0.0);
        assert_eq!(stats.magnitude_skewness, 0.0);
    }

    #[test]
    fn test_iq_correlation_in_phase() {
        // Real-valued ramp mirrored onto Q: perfectly correlated
        let samples: Vec<IQSample> = (0..100)
            .map(|i| {
                let v = i as f64 / 100.0;
                IQSample::new(v, 2.0 * v)
            })
            .collect();
        let stats = SignalStats::compute(&samples, 1000.0).unwrap();
        assert!((stats.iq_correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unwrap_phase_continuous() {
        // A rotating phasor steps +0.5 rad per sample; unwrapped phase is linear
        let raw = (0..40).map(|i| {
            let p = 0.5 * i as f64;
            p.sin().atan2(p.cos())
        });
        let unwrapped = unwrap_phase(raw);
        for (i, w) in unwrapped.windows(2).enumerate() {
            assert!((w[1] - w[0] - 0.5).abs() < 1e-9, "step {} jumped", i);
        }
    }

    #[test]
    fn test_spectral_features_tone() {
        let sample_rate = 8000.0;
        let samples = tone(256, 1000.0, sample_rate, 1.0);
        let spectrum = SpectrumBuilder::new().build(&samples, sample_rate).unwrap();

        let features = SpectralFeatures::compute(&spectrum).unwrap();
        assert_eq!(features.peak_frequency_hz, 1000.0);
        // Energy is concentrated in one bin, so centroid and rolloff land on it
        assert!((features.centroid_hz - 1000.0).abs() < 1.0);
        assert_eq!(features.rolloff_hz, 1000.0);
        assert!(features.flatness < 0.01);
    }

    #[test]
    fn test_spectral_features_flat() {
        let spectrum =
            Spectrum::from_parts(vec![-2.0, -1.0, 0.0, 1.0], vec![-20.0; 4], 4.0).unwrap();
        let features = SpectralFeatures::compute(&spectrum).unwrap();

        assert!((features.flatness - 1.0).abs() < 1e-9);
        assert!((features.centroid_hz + 0.5).abs() < 1e-9);
        assert_eq!(features.power_std_db, 0.0);
        assert_eq!(features.power_median_db, -20.0);
    }

    #[test]
    fn test_distribution_shape_symmetric() {
        let (mean, std, skew, _) = distribution_shape(&[1.0, 2.0, 3.0]);
        assert_eq!(mean, 2.0);
        assert!((std - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(skew.abs() < 1e-12);
    }
}
