//! Channel Model for Simulated Captures
//!
//! Applies receiver-side impairments to clean baseband samples:
//!
//! 1. **Path Loss**: Fixed attenuation of the incoming signal
//! 2. **Frequency Offset**: Carrier offset between transmitter and receiver
//! 3. **AWGN (Additive White Gaussian Noise)**: Thermal noise floor
//!
//! The noise floor is absolute (a per-component standard deviation), so an
//! empty band still shows noise and a strong tone still stands above it.
//!
//! ## Usage
//!
//! ```rust
//! use rfscan_sim::channel::{Channel, ChannelConfig};
//! use rfscan_core::types::IQSample;
//!
//! let config = ChannelConfig::with_noise(0.1).seeded(7);
//! let mut channel = Channel::new(config).unwrap();
//!
//! let clean: Vec<IQSample> = vec![IQSample::new(1.0, 0.0); 100];
//! let noisy = channel.apply(&clean);
//! assert_eq!(noisy.len(), clean.len());
//! ```

use crate::device::{SourceError, SourceResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rfscan_core::types::IQSample;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Channel model type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelModel {
    /// Perfect channel (no impairments)
    Ideal,
    /// Additive White Gaussian Noise only
    #[default]
    Awgn,
    /// AWGN + frequency offset
    AwgnWithCfo,
}

/// Channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel model to use
    pub model: ChannelModel,
    /// Noise standard deviation per I/Q component
    pub noise_std: f64,
    /// Carrier frequency offset in Hz
    pub cfo_hz: f64,
    /// Path loss in dB
    pub path_loss_db: f64,
    /// Sample rate (needed for the frequency offset)
    pub sample_rate: f64,
    /// Fixed RNG seed for reproducible noise
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            model: ChannelModel::Awgn,
            noise_std: 0.1,
            cfo_hz: 0.0,
            path_loss_db: 0.0,
            sample_rate: 1_000_000.0,
            seed: None,
        }
    }
}

impl ChannelConfig {
    /// A channel that passes samples through untouched
    pub fn ideal() -> Self {
        Self {
            model: ChannelModel::Ideal,
            ..Default::default()
        }
    }

    /// AWGN with the given per-component standard deviation
    pub fn with_noise(noise_std: f64) -> Self {
        Self {
            noise_std,
            ..Default::default()
        }
    }

    /// AWGN plus a carrier offset
    pub fn with_cfo(noise_std: f64, cfo_hz: f64) -> Self {
        Self {
            model: ChannelModel::AwgnWithCfo,
            noise_std,
            cfo_hz,
            ..Default::default()
        }
    }

    /// Fix the noise seed
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Total noise power across I and Q
    pub fn noise_power(&self) -> f64 {
        match self.model {
            ChannelModel::Ideal => 0.0,
            _ => 2.0 * self.noise_std * self.noise_std,
        }
    }

    pub fn validate(&self) -> SourceResult<()> {
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "noise standard deviation must be finite and non-negative, got {}",
                self.noise_std
            )));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "channel sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !self.cfo_hz.is_finite() || !self.path_loss_db.is_finite() {
            return Err(SourceError::InvalidConfig(
                "frequency offset and path loss must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Channel simulator
#[derive(Debug)]
pub struct Channel {
    config: ChannelConfig,
    rng: StdRng,
    noise: Normal<f64>,
    /// Phase accumulator for CFO simulation
    cfo_phase: f64,
}

impl Channel {
    /// Create a new channel with the given configuration
    pub fn new(config: ChannelConfig) -> SourceResult<Self> {
        config.validate()?;
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| SourceError::InvalidConfig(format!("noise distribution: {}", e)))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            noise,
            cfo_phase: 0.0,
        })
    }

    /// Reset channel state
    pub fn reset(&mut self) {
        self.cfo_phase = 0.0;
        if let Some(seed) = self.config.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Change the sample rate used for the frequency offset
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> SourceResult<()> {
        let config = ChannelConfig {
            sample_rate,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Apply channel effects to samples
    pub fn apply(&mut self, samples: &[IQSample]) -> Vec<IQSample> {
        match self.config.model {
            ChannelModel::Ideal => samples.to_vec(),
            ChannelModel::Awgn => self.apply_awgn(samples),
            ChannelModel::AwgnWithCfo => {
                let with_cfo = self.apply_cfo(samples);
                self.apply_awgn(&with_cfo)
            }
        }
    }

    fn apply_awgn(&mut self, samples: &[IQSample]) -> Vec<IQSample> {
        let path_loss_linear = 10.0_f64.powf(-self.config.path_loss_db / 20.0);

        samples
            .iter()
            .map(|&s| {
                let noise = IQSample::new(
                    self.noise.sample(&mut self.rng),
                    self.noise.sample(&mut self.rng),
                );
                s * path_loss_linear + noise
            })
            .collect()
    }

    fn apply_cfo(&mut self, samples: &[IQSample]) -> Vec<IQSample> {
        let cfo_rad_per_sample = 2.0 * PI * self.config.cfo_hz / self.config.sample_rate;

        samples
            .iter()
            .map(|&s| {
                let rotation = IQSample::from_polar(1.0, self.cfo_phase);
                self.cfo_phase = (self.cfo_phase + cfo_rad_per_sample).rem_euclid(2.0 * PI);
                s * rotation
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(n: usize) -> Vec<IQSample> {
        vec![IQSample::new(1.0, 0.0); n]
    }

    #[test]
    fn test_ideal_channel() {
        let mut channel = Channel::new(ChannelConfig::ideal()).unwrap();
        let samples: Vec<IQSample> = (0..100).map(|i| IQSample::new(i as f64, 0.0)).collect();
        assert_eq!(channel.apply(&samples), samples);
    }

    #[test]
    fn test_awgn_power_matches_config() {
        let config = ChannelConfig::with_noise(0.2).seeded(11);
        let mut channel = Channel::new(config.clone()).unwrap();

        let silent = vec![IQSample::new(0.0, 0.0); 20_000];
        let noise = channel.apply(&silent);
        let measured = noise.iter().map(|s| s.norm_sqr()).sum::<f64>() / noise.len() as f64;

        let expected = config.noise_power();
        assert!(
            (measured - expected).abs() / expected < 0.05,
            "measured {} expected {}",
            measured,
            expected
        );
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = ChannelConfig::with_noise(0.1).seeded(99);
        let a = Channel::new(config.clone()).unwrap().apply(&ones(64));
        let b = Channel::new(config).unwrap().apply(&ones(64));
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_replays_seed() {
        let mut channel = Channel::new(ChannelConfig::with_noise(0.1).seeded(5)).unwrap();
        let first = channel.apply(&ones(32));
        channel.reset();
        assert_eq!(channel.apply(&ones(32)), first);
    }

    #[test]
    fn test_cfo_rotates_phase() {
        let config = ChannelConfig {
            sample_rate: 125_000.0,
            ..ChannelConfig::with_cfo(0.0, 1000.0)
        };
        let mut channel = Channel::new(config).unwrap();
        let output = channel.apply(&ones(1000));

        // 2π * 1000 / 125000 ≈ 0.05 rad/sample
        let step = (output[1] * output[0].conj()).arg();
        assert!((step - 2.0 * PI * 1000.0 / 125_000.0).abs() < 1e-9);
        for sample in &output {
            assert!((sample.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_path_loss() {
        let config = ChannelConfig {
            path_loss_db: 20.0,
            ..ChannelConfig::with_noise(0.0)
        };
        let output = Channel::new(config).unwrap().apply(&ones(4));
        assert!((output[0].re - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_noise() {
        let result = Channel::new(ChannelConfig::with_noise(-1.0));
        assert!(matches!(result, Err(SourceError::InvalidConfig(_))));
    }
}
