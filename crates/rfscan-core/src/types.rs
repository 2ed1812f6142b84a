//! Core types for spectrum analysis
//!
//! Signals enter the library as complex baseband I/Q samples:
//! - **I (In-phase)**: the real component, aligned with the reference carrier
//! - **Q (Quadrature)**: the imaginary component, 90° out of phase
//!
//! Keeping both components lets the FFT distinguish positive from negative
//! frequency offsets around the tuned center frequency, which is why every
//! spectrum produced here spans `-fs/2..fs/2`.

use rustfft::num_complex::Complex64;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A single I/Q sample point
pub type IQSample = Complex64;

/// A buffer of I/Q samples
pub type IQBuffer = Vec<IQSample>;

/// Offset added to linear magnitudes before taking a logarithm so that an
/// exactly-zero bin maps to a finite floor instead of `-inf`.
pub const DB_EPSILON: f64 = 1e-10;

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;

/// Errors that can occur during spectrum analysis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Invalid sample rate: {0} Hz. Must be finite and greater than zero")]
    InvalidSampleRate(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid spectrum: {0}")]
    InvalidSpectrum(String),
}

impl DspError {
    /// Reject empty (or too short) inputs
    pub(crate) fn require_len(actual: usize, expected: usize) -> DspResult<()> {
        if actual < expected {
            Err(DspError::InsufficientData { expected, actual })
        } else {
            Ok(())
        }
    }

    /// Reject zero, negative or non-finite sample rates
    pub(crate) fn require_sample_rate(sample_rate: f64) -> DspResult<()> {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            Ok(())
        } else {
            Err(DspError::InvalidSampleRate(sample_rate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_len() {
        assert!(DspError::require_len(1, 1).is_ok());
        assert_eq!(
            DspError::require_len(0, 1),
            Err(DspError::InsufficientData {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_require_sample_rate() {
        assert!(DspError::require_sample_rate(48_000.0).is_ok());
        assert!(DspError::require_sample_rate(0.0).is_err());
        assert!(DspError::require_sample_rate(-1.0).is_err());
        assert!(DspError::require_sample_rate(f64::NAN).is_err());
        assert!(DspError::require_sample_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = DspError::InsufficientData {
            expected: 1,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: expected at least 1 samples, got 0"
        );
    }
}
