//! Sample Source Abstraction
//!
//! This module defines the common interface for anything that delivers
//! I/Q capture buffers: simulated receivers and recorded files.

use rfscan_core::types::{DspError, IQSample};
use serde::{Deserialize, Serialize};

/// Capture configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Center frequency in Hz
    pub center_frequency: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Receive gain in dB
    pub gain_db: f64,
    /// Buffer size in samples
    pub buffer_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            center_frequency: 100.0e6,
            sample_rate: 1_000_000.0,
            gain_db: 0.0,
            buffer_size: 4096,
        }
    }
}

impl SourceConfig {
    /// Default capture tuned to `center_frequency`
    pub fn tuned(center_frequency: f64) -> Self {
        Self {
            center_frequency,
            ..Default::default()
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Linear amplitude factor for the configured gain
    pub fn gain_linear(&self) -> f64 {
        10.0_f64.powf(self.gain_db / 20.0)
    }

    pub fn validate(&self) -> SourceResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !self.center_frequency.is_finite() || !self.gain_db.is_finite() {
            return Err(SourceError::InvalidConfig(
                "center frequency and gain must be finite".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(SourceError::InvalidConfig(
                "buffer size must be at least one sample".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while reading or analyzing captures
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("End of stream")]
    EndOfStream,

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] DspError),
}

/// Common interface for capture sources
pub trait SampleSource: Send {
    /// Get source name/description
    fn name(&self) -> &str;

    /// Sample rate in Hz
    fn sample_rate(&self) -> f64;

    /// Frequency that baseband 0 Hz corresponds to
    fn center_frequency(&self) -> f64;

    /// Read the next `num_samples` samples.
    ///
    /// A source may return fewer samples on its final read.
    fn read_buffer(&mut self, num_samples: usize) -> SourceResult<Vec<IQSample>>;

    /// Retune the source
    fn tune(&mut self, frequency: f64) -> SourceResult<()> {
        let _ = frequency;
        Err(SourceError::Unsupported(format!(
            "{} cannot be retuned",
            self.name()
        )))
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn sample_rate(&self) -> f64 {
        (**self).sample_rate()
    }

    fn center_frequency(&self) -> f64 {
        (**self).center_frequency()
    }

    fn read_buffer(&mut self, num_samples: usize) -> SourceResult<Vec<IQSample>> {
        (**self).read_buffer(num_samples)
    }

    fn tune(&mut self, frequency: f64) -> SourceResult<()> {
        (**self).tune(frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl SampleSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn sample_rate(&self) -> f64 {
            1000.0
        }
        fn center_frequency(&self) -> f64 {
            0.0
        }
        fn read_buffer(&mut self, num_samples: usize) -> SourceResult<Vec<IQSample>> {
            Ok(vec![IQSample::new(0.0, 0.0); num_samples])
        }
    }

    #[test]
    fn test_default_tune_is_unsupported() {
        let mut source = Fixed;
        let err = source.tune(1e6).unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));
        assert!(err.to_string().contains("fixed"));
    }

    #[test]
    fn test_boxed_source_delegates() {
        let mut source: Box<dyn SampleSource> = Box::new(Fixed);
        assert_eq!(source.read_buffer(8).unwrap().len(), 8);
        assert_eq!(source.sample_rate(), 1000.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(SourceConfig::default().validate().is_ok());
        assert!(SourceConfig::default().with_sample_rate(0.0).validate().is_err());
        assert!(SourceConfig::default().with_buffer_size(0).validate().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SourceConfig =
            serde_json::from_str(r#"{ "center_frequency": 433.92e6 }"#).unwrap();
        assert_eq!(config.center_frequency, 433.92e6);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.gain_linear(), 1.0);
    }

    #[test]
    fn test_dsp_error_converts() {
        let err: SourceError = DspError::InvalidSampleRate(0.0).into();
        assert!(err.to_string().starts_with("Analysis failed"));
    }
}
