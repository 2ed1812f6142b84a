//! Simulated Receiver
//!
//! Synthesizes captures containing continuous-wave emitters at absolute RF
//! frequencies. Each tone appears at its offset from the tuned center
//! frequency; tones outside `±fs/2` fall outside the capture and are not
//! generated. Noise and other impairments come from a [`Channel`].

use crate::channel::{Channel, ChannelConfig};
use crate::device::{SampleSource, SourceConfig, SourceError, SourceResult};
use rfscan_core::types::IQSample;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// A continuous-wave emitter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Absolute frequency in Hz
    pub frequency: f64,
    /// Linear amplitude
    pub amplitude: f64,
}

impl Tone {
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

impl FromStr for Tone {
    type Err = SourceError;

    /// Parse `HZ` or `HZ:AMPLITUDE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SourceError::InvalidConfig(format!("invalid tone '{}', expected HZ[:AMP]", s));
        let (freq, amp) = match s.split_once(':') {
            Some((freq, amp)) => (freq, Some(amp)),
            None => (s, None),
        };
        let frequency: f64 = freq.trim().parse().map_err(|_| invalid())?;
        let amplitude: f64 = match amp {
            Some(amp) => amp.trim().parse().map_err(|_| invalid())?,
            None => 1.0,
        };
        if !frequency.is_finite() || !amplitude.is_finite() {
            return Err(invalid());
        }
        Ok(Self::new(frequency, amplitude))
    }
}

/// Software receiver producing synthetic captures
#[derive(Debug)]
pub struct SimulatedSource {
    name: String,
    config: SourceConfig,
    tones: Vec<Tone>,
    /// Per-tone phase accumulators, kept across reads
    phases: Vec<f64>,
    channel: Channel,
    samples_generated: u64,
}

impl SimulatedSource {
    /// Create a source with no emitters
    pub fn new(config: SourceConfig, channel: ChannelConfig) -> SourceResult<Self> {
        config.validate()?;
        let channel = Channel::new(ChannelConfig {
            sample_rate: config.sample_rate,
            ..channel
        })?;

        tracing::debug!(
            center_frequency = config.center_frequency,
            sample_rate = config.sample_rate,
            "Created simulated source"
        );

        Ok(Self {
            name: "Simulated receiver".to_string(),
            config,
            tones: Vec::new(),
            phases: Vec::new(),
            channel,
            samples_generated: 0,
        })
    }

    /// Add an emitter
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tones.push(tone);
        self.phases.push(0.0);
        self
    }

    /// Add several emitters
    pub fn with_tones(mut self, tones: impl IntoIterator<Item = Tone>) -> Self {
        for tone in tones {
            self = self.with_tone(tone);
        }
        self
    }

    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Total samples produced so far
    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    /// Tones that fall inside the current capture band, as (offset, tone index)
    fn visible_offsets(&self) -> Vec<(f64, usize)> {
        let nyquist = self.config.sample_rate / 2.0;
        self.tones
            .iter()
            .enumerate()
            .map(|(i, tone)| (tone.frequency - self.config.center_frequency, i))
            .filter(|(offset, _)| offset.abs() < nyquist)
            .collect()
    }
}

impl SampleSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    fn center_frequency(&self) -> f64 {
        self.config.center_frequency
    }

    fn read_buffer(&mut self, num_samples: usize) -> SourceResult<Vec<IQSample>> {
        let visible = self.visible_offsets();
        let increments: Vec<(f64, usize)> = visible
            .iter()
            .map(|&(offset, i)| (2.0 * PI * offset / self.config.sample_rate, i))
            .collect();

        let mut clean = vec![IQSample::new(0.0, 0.0); num_samples];
        for &(step, i) in &increments {
            let amplitude = self.tones[i].amplitude;
            let mut phase = self.phases[i];
            for sample in clean.iter_mut() {
                *sample += IQSample::from_polar(amplitude, phase);
                phase = (phase + step).rem_euclid(2.0 * PI);
            }
            self.phases[i] = phase;
        }

        let gain = self.config.gain_linear();
        let samples: Vec<IQSample> = self
            .channel
            .apply(&clean)
            .into_iter()
            .map(|s| s * gain)
            .collect();

        self.samples_generated += num_samples as u64;
        tracing::trace!(
            num_samples,
            visible_tones = visible.len(),
            "Generated simulated buffer"
        );
        Ok(samples)
    }

    fn tune(&mut self, frequency: f64) -> SourceResult<()> {
        if !frequency.is_finite() {
            return Err(SourceError::InvalidConfig(format!(
                "cannot tune to {} Hz",
                frequency
            )));
        }
        self.config.center_frequency = frequency;
        tracing::debug!(frequency, "Tuned simulated source");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfscan_core::analysis::{PeakDetector, SpectrumBuilder};

    fn quiet_source(center: f64) -> SimulatedSource {
        SimulatedSource::new(
            SourceConfig::tuned(center),
            ChannelConfig::with_noise(0.01).seeded(1),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_tone() {
        assert_eq!("1e6:0.5".parse::<Tone>().unwrap(), Tone::new(1e6, 0.5));
        assert_eq!("2500".parse::<Tone>().unwrap(), Tone::new(2500.0, 1.0));
        assert!("abc".parse::<Tone>().is_err());
        assert!("100:x".parse::<Tone>().is_err());
    }

    #[test]
    fn test_tone_appears_at_offset() {
        let mut source = quiet_source(100.0e6).with_tone(Tone::new(100.25e6, 1.0));
        let samples = source.read_buffer(1024).unwrap();
        let spectrum = SpectrumBuilder::new().build(&samples, source.sample_rate()).unwrap();

        let (freq, _) = spectrum.find_peak().unwrap();
        assert!((freq - 250_000.0).abs() <= spectrum.bin_width());
    }

    #[test]
    fn test_out_of_band_tone_is_invisible() {
        let mut source = quiet_source(100.0e6).with_tone(Tone::new(105.0e6, 1.0));
        let samples = source.read_buffer(1024).unwrap();
        let spectrum = SpectrumBuilder::new().build(&samples, source.sample_rate()).unwrap();
        assert!(PeakDetector::new().with_threshold(20.0).find_peaks(&spectrum).is_empty());
    }

    #[test]
    fn test_phase_continuous_across_reads() {
        let config = SourceConfig::tuned(0.0);
        let make = || {
            SimulatedSource::new(config.clone(), ChannelConfig::ideal())
                .unwrap()
                .with_tone(Tone::new(12_345.0, 1.0))
        };

        let whole = make().read_buffer(200).unwrap();
        let mut split = make();
        let mut pieces = split.read_buffer(77).unwrap();
        pieces.extend(split.read_buffer(123).unwrap());

        for (a, b) in whole.iter().zip(pieces.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
        assert_eq!(split.samples_generated(), 200);
    }

    #[test]
    fn test_tune_moves_tone() {
        let mut source = quiet_source(100.0e6).with_tone(Tone::new(100.1e6, 1.0));
        source.tune(100.2e6).unwrap();
        assert_eq!(source.center_frequency(), 100.2e6);

        let samples = source.read_buffer(1000).unwrap();
        let spectrum = SpectrumBuilder::new().build(&samples, source.sample_rate()).unwrap();
        let (freq, _) = spectrum.find_peak().unwrap();
        assert!((freq + 100_000.0).abs() <= spectrum.bin_width());
    }

    #[test]
    fn test_gain_scales_output() {
        let config = SourceConfig {
            gain_db: 20.0,
            ..SourceConfig::tuned(0.0)
        };
        let mut source = SimulatedSource::new(config, ChannelConfig::ideal())
            .unwrap()
            .with_tone(Tone::new(0.0, 1.0));
        let samples = source.read_buffer(4).unwrap();
        assert!((samples[0].norm() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config() {
        let result = SimulatedSource::new(
            SourceConfig::default().with_sample_rate(-1.0),
            ChannelConfig::default(),
        );
        assert!(matches!(result, Err(SourceError::InvalidConfig(_))));
    }
}
