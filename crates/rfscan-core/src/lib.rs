//! # rfscan Core Library
//!
//! Spectral peak detection and statistical anomaly scoring over complex
//! baseband (I/Q) sample buffers.
//!
//! ## Overview
//!
//! A capture buffer is transformed into a power spectrum with its zero
//! frequency centered, then scored two ways:
//!
//! - **Peak Detection**: local maxima above a power threshold, kept apart by
//!   a minimum bin separation, each with a bandwidth estimate
//! - **Anomaly Scoring**: bins whose power deviates from the spectrum mean by
//!   more than `k` standard deviations
//!
//! Supporting pieces include a Welch PSD estimator, time-domain signal
//! statistics, spectral shape features, and typed watch rules.
//!
//! ## Signal Flow
//!
//! ```text
//! I/Q → [window] → FFT → shift → 20·log10|X| → Spectrum ─┬→ PeakDetector → peaks
//!                                                        └→ AnomalyScorer → anomalies
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use rfscan_core::prelude::*;
//!
//! let samples: Vec<IQSample> = vec![IQSample::new(1.0, 0.0); 1024];
//! let report = SpectrumAnalysis::new(&AnalysisConfig::default())
//!     .run(&samples, 1_000_000.0)
//!     .unwrap();
//! println!("{}", report.to_text());
//! ```

pub mod analysis;
pub mod fft_utils;
pub mod rules;
pub mod types;

pub use analysis::{
    estimate_bandwidth, AnalysisConfig, AnalysisReport, AnomalyFlag, AnomalyScorer, Peak,
    PeakDetector, SignalStats, SpectralFeatures, Spectrum, SpectrumAnalysis, SpectrumBuilder,
    WelchConfig, WelchEstimator, WindowFunction,
};
pub use fft_utils::FftProcessor;
pub use rules::{evaluate_rules, Condition, RuleMatch, WatchRule};
pub use types::{Complex, DspError, DspResult, IQBuffer, IQSample};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        AnalysisConfig, AnalysisReport, AnomalyScorer, PeakDetector, Spectrum,
        SpectrumAnalysis, SpectrumBuilder, WindowFunction,
    };
    pub use crate::rules::{Condition, WatchRule};
    pub use crate::types::{DspError, DspResult, IQSample};
}
