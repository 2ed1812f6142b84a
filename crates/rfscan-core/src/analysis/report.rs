//! Analysis Pipeline
//!
//! Wires the spectrum builder, peak detector, anomaly scorer and optional
//! Welch estimator into one call that produces a serializable report.
//! Every component is passed in through [`AnalysisConfig`]; nothing is
//! looked up globally.

use crate::analysis::anomaly::{AnomalyFlag, AnomalyScorer, DEFAULT_SIGMA_MULTIPLE};
use crate::analysis::peaks::{
    Peak, PeakDetector, DEFAULT_BANDWIDTH_DROP_DB, DEFAULT_MIN_SEPARATION, DEFAULT_THRESHOLD_DB,
};
use crate::analysis::spectrum::{Spectrum, SpectrumBuilder, WelchConfig, WelchEstimator, WindowFunction};
use crate::types::{DspResult, IQSample};
use serde::{Deserialize, Serialize};

/// Tunables for a full analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Window applied before the spectrum FFT
    pub window: WindowFunction,
    /// Peak power floor in dB
    pub threshold_db: f64,
    /// Minimum bin distance between peaks
    pub min_separation: usize,
    /// dB drop bounding each peak's bandwidth
    pub bandwidth_drop_db: f64,
    /// Keep only the strongest N peaks
    pub max_peaks: Option<usize>,
    /// Anomaly threshold in standard deviations
    pub sigma_multiple: f64,
    /// Also compute a Welch PSD when set
    pub welch: Option<WelchConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: WindowFunction::None,
            threshold_db: DEFAULT_THRESHOLD_DB,
            min_separation: DEFAULT_MIN_SEPARATION,
            bandwidth_drop_db: DEFAULT_BANDWIDTH_DROP_DB,
            max_peaks: None,
            sigma_multiple: DEFAULT_SIGMA_MULTIPLE,
            welch: None,
        }
    }
}

/// Everything derived from one capture buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// RFC 3339 time the report was produced
    pub timestamp: String,
    pub sample_rate: f64,
    pub fft_size: usize,
    pub spectrum: Spectrum,
    pub psd: Option<Spectrum>,
    pub peaks: Vec<Peak>,
    pub anomalies: Vec<AnomalyFlag>,
}

impl AnalysisReport {
    /// Highest-power peak, if any
    pub fn strongest_peak(&self) -> Option<&Peak> {
        self.peaks.iter().max_by(|a, b| a.power.total_cmp(&b.power))
    }

    /// Format a short text summary
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Analysis Report ({})\n", self.timestamp));
        output.push_str(&"═".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "Sample rate: {:.0} Hz, FFT size: {}, Resolution: {:.2} Hz\n",
            self.sample_rate,
            self.fft_size,
            self.spectrum.bin_width()
        ));
        output.push_str(&format!(
            "Mean power: {:.2} dB\n",
            self.spectrum.mean_power_db()
        ));
        if let Some(psd) = &self.psd {
            output.push_str(&format!(
                "Welch PSD: {} bins, {} segments\n",
                psd.len(),
                psd.num_averages
            ));
        }
        output.push('\n');
        output.push_str(&PeakDetector::format_text(&self.peaks));
        output.push('\n');
        output.push_str(&AnomalyScorer::format_text(&self.anomalies));
        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Configured analysis pipeline
#[derive(Debug, Clone)]
pub struct SpectrumAnalysis {
    builder: SpectrumBuilder,
    detector: PeakDetector,
    scorer: AnomalyScorer,
    welch: Option<WelchEstimator>,
}

impl Default for SpectrumAnalysis {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl SpectrumAnalysis {
    /// Build the pipeline from a configuration
    pub fn new(config: &AnalysisConfig) -> Self {
        let mut detector = PeakDetector::new()
            .with_threshold(config.threshold_db)
            .with_min_separation(config.min_separation)
            .with_bandwidth_drop(config.bandwidth_drop_db);
        if let Some(max) = config.max_peaks {
            detector = detector.with_max_peaks(max);
        }

        Self {
            builder: SpectrumBuilder::new().with_window(config.window),
            detector,
            scorer: AnomalyScorer::new().with_sigma_multiple(config.sigma_multiple),
            welch: config.welch.map(WelchEstimator::from_config),
        }
    }

    /// Assemble a pipeline from already configured components
    pub fn from_components(
        builder: SpectrumBuilder,
        detector: PeakDetector,
        scorer: AnomalyScorer,
        welch: Option<WelchEstimator>,
    ) -> Self {
        Self {
            builder,
            detector,
            scorer,
            welch,
        }
    }

    pub fn builder(&self) -> &SpectrumBuilder {
        &self.builder
    }

    pub fn detector(&self) -> &PeakDetector {
        &self.detector
    }

    pub fn scorer(&self) -> &AnomalyScorer {
        &self.scorer
    }

    /// Build only the spectrum
    pub fn spectrum(&self, samples: &[IQSample], sample_rate: f64) -> DspResult<Spectrum> {
        self.builder.build(samples, sample_rate)
    }

    /// Run the full pipeline on one buffer
    pub fn run(&self, samples: &[IQSample], sample_rate: f64) -> DspResult<AnalysisReport> {
        let spectrum = self.builder.build(samples, sample_rate)?;
        let psd = self
            .welch
            .as_ref()
            .map(|w| w.estimate(samples, sample_rate))
            .transpose()?;

        let peaks = self.detector.find_peaks(&spectrum);
        let anomalies = self.scorer.score(&spectrum);

        tracing::info!(
            samples = samples.len(),
            peaks = peaks.len(),
            anomalies = anomalies.len(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            sample_rate,
            fft_size: spectrum.fft_size,
            spectrum,
            psd,
            peaks,
            anomalies,
        })
    }
}
