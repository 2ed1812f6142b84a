//! Spectrum Analysis Module
//!
//! Turns a buffer of I/Q samples into a shifted power spectrum and scores
//! it: spectral peaks, statistical anomalies, and summary statistics.
//!
//! ## Features
//!
//! - **Spectrum**: FFT power spectrum in dB with an optional window
//! - **Welch PSD**: Averaged, detrended periodogram over overlapping segments
//! - **Peak Detection**: Thresholded local maxima with separation and bandwidth
//! - **Anomaly Scoring**: k-sigma outlier bins against the spectrum mean
//! - **Statistics**: Time-domain signal stats and spectral shape features
//!
//! ## Example
//!
//! ```rust,no_run
//! use rfscan_core::analysis::{AnomalyScorer, PeakDetector, SpectrumBuilder};
//! use rfscan_core::types::IQSample;
//!
//! let samples: Vec<IQSample> = vec![IQSample::new(1.0, 0.0); 1024];
//! let sample_rate = 1_000_000.0;
//!
//! let spectrum = SpectrumBuilder::new().build(&samples, sample_rate).unwrap();
//! let peaks = PeakDetector::new().with_threshold(-20.0).find_peaks(&spectrum);
//! let anomalies = AnomalyScorer::new().score(&spectrum);
//! println!("{} peaks, {} anomalies", peaks.len(), anomalies.len());
//! ```

pub mod anomaly;
pub mod peaks;
pub mod report;
pub mod spectrum;
pub mod statistics;

pub use anomaly::{AnomalyFlag, AnomalyScorer, PowerMoments};
pub use peaks::{estimate_bandwidth, Peak, PeakDetector};
pub use report::{AnalysisConfig, AnalysisReport, SpectrumAnalysis};
pub use spectrum::{
    Spectrum, SpectrumBuilder, SpectrumPoint, WelchConfig, WelchEstimator, WindowFunction,
};
pub use statistics::{SignalStats, SpectralFeatures};
