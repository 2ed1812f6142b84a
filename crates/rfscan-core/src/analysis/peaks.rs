//! Spectral Peak Detection
//!
//! Find local maxima in a power spectrum above an absolute power floor,
//! keep them a minimum number of bins apart, and measure each one's
//! half-power bandwidth.

use crate::analysis::spectrum::Spectrum;
use crate::types::{DspError, DspResult};
use serde::{Deserialize, Serialize};

/// Default power floor in dB
pub const DEFAULT_THRESHOLD_DB: f64 = -50.0;
/// Default minimum bin distance between reported peaks
pub const DEFAULT_MIN_SEPARATION: usize = 10;
/// Default drop below peak power that bounds the bandwidth (half power)
pub const DEFAULT_BANDWIDTH_DROP_DB: f64 = 3.0;

/// A detected spectral peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Frequency in Hz
    pub frequency: f64,
    /// Power in dB
    pub power: f64,
    /// Bandwidth in Hz where power stays above `power - drop`
    pub bandwidth: f64,
    /// Bin index in the spectrum
    pub bin_index: usize,
}

/// Estimate the bandwidth of the peak at `peak_index`.
///
/// Walks outward while power stays above `peak_power - threshold_db_drop`,
/// stopping at the spectrum edge or the first bin at or below that level.
/// The result is `(right - left) * bin_width`, never less than one bin.
pub fn estimate_bandwidth(
    spectrum: &Spectrum,
    peak_index: usize,
    threshold_db_drop: f64,
) -> DspResult<f64> {
    let power = &spectrum.power_db;
    if peak_index >= power.len() {
        return Err(DspError::InvalidParameter(format!(
            "peak index {} out of range for {} bins",
            peak_index,
            power.len()
        )));
    }

    Ok(bandwidth_at(
        power,
        peak_index,
        threshold_db_drop,
        spectrum.bin_width(),
    ))
}

/// Bandwidth walk for an index known to be inside `power`
fn bandwidth_at(power: &[f64], peak_index: usize, drop_db: f64, bin_width: f64) -> f64 {
    let threshold = power[peak_index] - drop_db;

    let mut left = peak_index;
    while left > 0 && power[left] > threshold {
        left -= 1;
    }

    let mut right = peak_index;
    while right < power.len() - 1 && power[right] > threshold {
        right += 1;
    }

    (right - left).max(1) as f64 * bin_width
}

/// Peak detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetector {
    /// Absolute power floor in dB; peaks must exceed it
    threshold_db: f64,
    /// Minimum distance between peaks in bins
    min_separation: usize,
    /// dB drop used for bandwidth estimation
    bandwidth_drop_db: f64,
    /// Keep only the strongest N peaks
    max_peaks: Option<usize>,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            min_separation: DEFAULT_MIN_SEPARATION,
            bandwidth_drop_db: DEFAULT_BANDWIDTH_DROP_DB,
            max_peaks: None,
        }
    }
}

impl PeakDetector {
    /// Create a new peak detector with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the power floor in dB
    pub fn with_threshold(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    /// Set minimum distance between peaks
    pub fn with_min_separation(mut self, min_separation: usize) -> Self {
        self.min_separation = min_separation;
        self
    }

    /// Set the dB drop used for bandwidth estimation
    pub fn with_bandwidth_drop(mut self, drop_db: f64) -> Self {
        self.bandwidth_drop_db = drop_db;
        self
    }

    /// Set the maximum number of peaks to report
    pub fn with_max_peaks(mut self, max_peaks: usize) -> Self {
        self.max_peaks = Some(max_peaks);
        self
    }

    pub fn threshold_db(&self) -> f64 {
        self.threshold_db
    }

    pub fn min_separation(&self) -> usize {
        self.min_separation
    }

    pub fn bandwidth_drop_db(&self) -> f64 {
        self.bandwidth_drop_db
    }

    pub fn max_peaks(&self) -> Option<usize> {
        self.max_peaks
    }

    /// Find peaks in a spectrum, ascending by frequency
    pub fn find_peaks(&self, spectrum: &Spectrum) -> Vec<Peak> {
        let power = &spectrum.power_db;
        let mut candidates = local_maxima(power, self.threshold_db);

        // Strongest first; equal power resolves to the lower bin
        candidates.sort_by(|&a, &b| power[b].total_cmp(&power[a]).then(a.cmp(&b)));

        let limit = self.max_peaks.unwrap_or(usize::MAX);
        let mut accepted: Vec<usize> = Vec::new();
        for idx in candidates {
            if accepted.len() >= limit {
                break;
            }
            let too_close = accepted
                .iter()
                .any(|&kept| kept.abs_diff(idx) < self.min_separation);
            if !too_close {
                accepted.push(idx);
            }
        }

        accepted.sort_unstable();

        let peaks: Vec<Peak> = accepted
            .into_iter()
            .map(|idx| Peak {
                frequency: spectrum.frequencies[idx],
                power: power[idx],
                bandwidth: bandwidth_at(
                    power,
                    idx,
                    self.bandwidth_drop_db,
                    spectrum.bin_width(),
                ),
                bin_index: idx,
            })
            .collect();

        tracing::debug!(
            threshold_db = self.threshold_db,
            min_separation = self.min_separation,
            found = peaks.len(),
            "Peak search complete"
        );

        peaks
    }

    /// Format peaks as text table
    pub fn format_text(peaks: &[Peak]) -> String {
        let mut output = String::new();
        output.push_str("Spectral Peaks\n");
        output.push_str(&"═".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:>14}  {:>10}  {:>16}\n",
            "#", "Frequency (Hz)", "Power (dB)", "Bandwidth (Hz)"
        ));
        output.push_str(&"─".repeat(60));
        output.push('\n');

        for (i, peak) in peaks.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:>14.2}  {:>10.2}  {:>16.2}\n",
                i + 1,
                peak.frequency,
                peak.power,
                peak.bandwidth
            ));
        }

        if peaks.is_empty() {
            output.push_str("  No peaks found above threshold\n");
        }

        output
    }

    /// Format peaks as JSON
    pub fn format_json(peaks: &[Peak]) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "num_peaks": peaks.len(),
            "peaks": peaks,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    /// Format peaks as CSV
    pub fn format_csv(peaks: &[Peak]) -> String {
        let mut output = String::from("frequency_hz,power_db,bandwidth_hz,bin_index\n");
        for peak in peaks {
            output.push_str(&format!(
                "{},{},{},{}\n",
                peak.frequency, peak.power, peak.bandwidth, peak.bin_index
            ));
        }
        output
    }
}

/// Indices of local maxima above `threshold`.
///
/// A maximum is a run of equal bins strictly higher than the bins on either
/// side of the run; it is reported at the run's first bin. Runs touching a
/// spectrum edge have no neighbour there and are skipped.
fn local_maxima(power: &[f64], threshold: f64) -> Vec<usize> {
    let n = power.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }

    let mut i = 1;
    while i < n - 1 {
        if power[i] > power[i - 1] {
            let start = i;
            while i + 1 < n - 1 && power[i + 1] == power[start] {
                i += 1;
            }
            if power[i + 1] < power[start] && power[start] > threshold {
                maxima.push(start);
            }
        }
        i += 1;
    }

    maxima
}
