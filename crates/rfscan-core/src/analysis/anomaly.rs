//! Statistical Anomaly Scoring
//!
//! Flags spectrum bins whose power lies more than `k` standard deviations
//! from the spectrum's own mean. Each call is independent; nothing is
//! remembered between spectra.

use crate::analysis::spectrum::Spectrum;
use serde::{Deserialize, Serialize};

/// Default deviation, in standard deviations, before a bin is flagged
pub const DEFAULT_SIGMA_MULTIPLE: f64 = 3.0;

/// A bin that deviates from the spectrum mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    /// Frequency in Hz
    pub frequency: f64,
    /// Power in dB
    pub power: f64,
    /// Distance from the mean in multiples of sigma, always non-negative.
    /// Compare `power` with the spectrum mean for the direction.
    pub deviation: f64,
    /// Bin index in the spectrum
    pub bin_index: usize,
}

/// Mean and population standard deviation of a spectrum's power values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerMoments {
    pub mean: f64,
    pub std_dev: f64,
}

impl PowerMoments {
    pub fn compute(power_db: &[f64]) -> Option<Self> {
        if power_db.is_empty() {
            return None;
        }
        let n = power_db.len() as f64;
        let mean = power_db.iter().sum::<f64>() / n;
        let variance = power_db.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// k-sigma outlier detector over spectrum power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyScorer {
    sigma_multiple: f64,
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self {
            sigma_multiple: DEFAULT_SIGMA_MULTIPLE,
        }
    }
}

impl AnomalyScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many standard deviations a bin must exceed to be flagged
    pub fn with_sigma_multiple(mut self, sigma_multiple: f64) -> Self {
        self.sigma_multiple = sigma_multiple;
        self
    }

    pub fn sigma_multiple(&self) -> f64 {
        self.sigma_multiple
    }

    /// Flag every bin with `|power - mean| > k * sigma`, ascending by
    /// frequency.
    ///
    /// A zero-variance spectrum is valid input and yields no flags.
    pub fn score(&self, spectrum: &Spectrum) -> Vec<AnomalyFlag> {
        let Some(moments) = PowerMoments::compute(&spectrum.power_db) else {
            return Vec::new();
        };

        if !(moments.std_dev.is_finite() && moments.std_dev > 0.0) {
            tracing::debug!(
                mean = moments.mean,
                "Degenerate spectrum (zero variance), no anomalies scored"
            );
            return Vec::new();
        }

        let limit = self.sigma_multiple * moments.std_dev;
        let flags: Vec<AnomalyFlag> = spectrum
            .points()
            .enumerate()
            .filter(|(_, point)| (point.power - moments.mean).abs() > limit)
            .map(|(bin_index, point)| AnomalyFlag {
                frequency: point.frequency,
                power: point.power,
                deviation: (point.power - moments.mean).abs() / moments.std_dev,
                bin_index,
            })
            .collect();

        tracing::debug!(
            mean = moments.mean,
            std_dev = moments.std_dev,
            sigma_multiple = self.sigma_multiple,
            flagged = flags.len(),
            "Anomaly scoring complete"
        );

        flags
    }

    /// Format anomalies as text table
    pub fn format_text(flags: &[AnomalyFlag]) -> String {
        let mut output = String::new();
        output.push_str("Spectral Anomalies\n");
        output.push_str(&"═".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:>14}  {:>10}  {:>12}\n",
            "#", "Frequency (Hz)", "Power (dB)", "Deviation"
        ));
        output.push_str(&"─".repeat(60));
        output.push('\n');

        for (i, flag) in flags.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:>14.2}  {:>10.2}  {:>10.2} σ\n",
                i + 1,
                flag.frequency,
                flag.power,
                flag.deviation
            ));
        }

        if flags.is_empty() {
            output.push_str("  No anomalous bins\n");
        }

        output
    }

    /// Format anomalies as JSON
    pub fn format_json(flags: &[AnomalyFlag]) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "num_anomalies": flags.len(),
            "anomalies": flags,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    /// Format anomalies as CSV
    pub fn format_csv(flags: &[AnomalyFlag]) -> String {
        let mut output = String::from("frequency_hz,power_db,deviation_sigma,bin_index\n");
        for flag in flags {
            output.push_str(&format!(
                "{},{},{},{}\n",
                flag.frequency, flag.power, flag.deviation, flag.bin_index
            ));
        }
        output
    }
}
